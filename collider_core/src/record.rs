use std::fmt;

/// Total serialized size of the configuration record.
pub const RECORD_SIZE: usize = 232;

/// Length of the file-name field, including its NUL terminator byte.
pub const FILE_NAME_LEN: usize = 201;

const RESERVED_A_OFFSET: usize = 0;
const RESERVED_B_OFFSET: usize = 4;
pub const BUS_SPEED_OFFSET: usize = 8;
pub const NODE_ID_OFFSET: usize = 12;
pub const FW_SERVER_ID_OFFSET: usize = 13;
pub const FILE_NAME_OFFSET: usize = 14;
pub const STAY_IN_BOOTLOADER_OFFSET: usize = 215;
const RESERVED_C_OFFSET: usize = 216;
const RESERVED_D_OFFSET: usize = 224;

/// Width of the search nonce embedded in the file-name field.
const NONCE_SIZE: usize = size_of::<u64>();

/// Record-relative offset of the search nonce: the last naturally aligned
/// 8-byte window that fits in the file-name field ahead of its terminator.
/// The legacy tool located this window with pointer arithmetic at run time;
/// the layout is fixed, so the offset is a constant here.
pub const NONCE_OFFSET: usize =
    (FILE_NAME_OFFSET + FILE_NAME_LEN - NONCE_SIZE - 1) & !(NONCE_SIZE - 1);

/// The fixed-layout configuration record exchanged between the application
/// and bootloader firmware.
///
/// The byte layout (field offsets, integer endianness, reserved padding) is
/// pinned by the legacy consumer and must be reproduced exactly: both search
/// engines operate on specific byte offsets inside the serialized form. All
/// multi-byte integers are little-endian. The reserved fields exist only to
/// hold the total size at [`RECORD_SIZE`] and are zero in every record this
/// crate produces, but their values survive a parse round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRecord {
    pub reserved_a: u32,
    pub reserved_b: u32,
    pub bus_speed: u32,
    pub node_id: u8,
    pub fw_server_id: u8,
    pub file_name: [u8; FILE_NAME_LEN],
    pub stay_in_bootloader: bool,
    pub reserved_c: u64,
    pub reserved_d: u64,
}

impl ConfigRecord {
    /// A record with the given seed fields, a zeroed file name and the
    /// stay-in-bootloader flag raised.
    pub fn new(bus_speed: u32, node_id: u8, fw_server_id: u8) -> Self {
        Self {
            bus_speed,
            node_id,
            fw_server_id,
            ..Self::default()
        }
    }

    /// Serializes the record into its fixed 232-byte layout.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[RESERVED_A_OFFSET..RESERVED_A_OFFSET + 4].copy_from_slice(&self.reserved_a.to_le_bytes());
        buf[RESERVED_B_OFFSET..RESERVED_B_OFFSET + 4].copy_from_slice(&self.reserved_b.to_le_bytes());
        buf[BUS_SPEED_OFFSET..BUS_SPEED_OFFSET + 4].copy_from_slice(&self.bus_speed.to_le_bytes());
        buf[NODE_ID_OFFSET] = self.node_id;
        buf[FW_SERVER_ID_OFFSET] = self.fw_server_id;
        buf[FILE_NAME_OFFSET..FILE_NAME_OFFSET + FILE_NAME_LEN].copy_from_slice(&self.file_name);
        buf[STAY_IN_BOOTLOADER_OFFSET] = u8::from(self.stay_in_bootloader);
        buf[RESERVED_C_OFFSET..RESERVED_C_OFFSET + 8].copy_from_slice(&self.reserved_c.to_le_bytes());
        buf[RESERVED_D_OFFSET..RESERVED_D_OFFSET + 8].copy_from_slice(&self.reserved_d.to_le_bytes());
        buf
    }

    /// Reconstructs a record from its serialized layout.
    ///
    /// Any 232 bytes form a structurally valid record; integrity is the
    /// framing codec's concern, not the layout's.
    pub fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        let mut file_name = [0u8; FILE_NAME_LEN];
        file_name.copy_from_slice(&buf[FILE_NAME_OFFSET..FILE_NAME_OFFSET + FILE_NAME_LEN]);
        Self {
            reserved_a: u32::from_le_bytes(buf[RESERVED_A_OFFSET..RESERVED_A_OFFSET + 4].try_into().unwrap()),
            reserved_b: u32::from_le_bytes(buf[RESERVED_B_OFFSET..RESERVED_B_OFFSET + 4].try_into().unwrap()),
            bus_speed: u32::from_le_bytes(buf[BUS_SPEED_OFFSET..BUS_SPEED_OFFSET + 4].try_into().unwrap()),
            node_id: buf[NODE_ID_OFFSET],
            fw_server_id: buf[FW_SERVER_ID_OFFSET],
            file_name,
            stay_in_bootloader: buf[STAY_IN_BOOTLOADER_OFFSET] != 0,
            reserved_c: u64::from_le_bytes(buf[RESERVED_C_OFFSET..RESERVED_C_OFFSET + 8].try_into().unwrap()),
            reserved_d: u64::from_le_bytes(buf[RESERVED_D_OFFSET..RESERVED_D_OFFSET + 8].try_into().unwrap()),
        }
    }

    /// The search nonce: a little-endian u64 read from the aligned window
    /// inside the file-name field (see [`NONCE_OFFSET`]).
    pub fn nonce(&self) -> u64 {
        let start = NONCE_OFFSET - FILE_NAME_OFFSET;
        u64::from_le_bytes(self.file_name[start..start + NONCE_SIZE].try_into().unwrap())
    }

    /// Overwrites the search nonce window.
    pub fn set_nonce(&mut self, nonce: u64) {
        let start = NONCE_OFFSET - FILE_NAME_OFFSET;
        self.file_name[start..start + NONCE_SIZE].copy_from_slice(&nonce.to_le_bytes());
    }
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            reserved_a: 0,
            reserved_b: 0,
            bus_speed: 0,
            node_id: 0,
            fw_server_id: 0,
            file_name: [0u8; FILE_NAME_LEN],
            stay_in_bootloader: true,
            reserved_c: 0,
            reserved_d: 0,
        }
    }
}

/// Human-readable dump for diagnostics; the file name is printed as hex
/// bytes since it routinely carries non-printable search material.
impl fmt::Display for ConfigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bus_speed: {}", self.bus_speed)?;
        writeln!(f, "node_id: {}", self.node_id)?;
        writeln!(f, "fw_server_id: {}", self.fw_server_id)?;
        write!(f, "file_name: {{")?;
        for byte in &self.file_name {
            write!(f, "{byte:02x},")?;
        }
        writeln!(f, "}}")?;
        writeln!(f, "stay_in_bootloader: {}", self.stay_in_bootloader)
    }
}
