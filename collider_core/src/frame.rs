use crate::crc::Crc64We;
use crate::record::{ConfigRecord, RECORD_SIZE};

/// Size of a framed record: checksum plus record payload.
pub const FRAME_SIZE: usize = Crc64We::SIZE + RECORD_SIZE;

/// A framed record buffer.
pub type Frame = [u8; FRAME_SIZE];

/// Frames `record` under the application convention: the checksum of the
/// serialized record bytes, big-endian, followed by the record bytes.
///
/// Pure function of the record; identical inputs yield identical frames.
pub fn compose_with_leading_crc(record: &ConfigRecord) -> Frame {
    let record_bytes = record.to_bytes();
    let mut crc = Crc64We::new();
    crc.update(&record_bytes);
    let mut frame = [0u8; FRAME_SIZE];
    frame[..Crc64We::SIZE].copy_from_slice(&crc.bytes());
    frame[Crc64We::SIZE..].copy_from_slice(&record_bytes);
    frame
}

/// Validates `buffer` under the bootloader convention: the FIRST
/// [`RECORD_SIZE`] bytes are taken as the record and the LAST eight bytes as
/// its expected checksum. Returns the record only when the recomputed
/// checksum matches; `None` is the sole failure signal.
///
/// The two conventions read record bytes shifted by eight relative to one
/// another, so a frame produced by [`compose_with_leading_crc`] fails here
/// for all but roughly one in 2^64 records. Both search engines exist to
/// manufacture that coincidence.
pub fn parse_with_trailing_crc(buffer: &Frame) -> Option<ConfigRecord> {
    let record_bytes: &[u8; RECORD_SIZE] = buffer[..RECORD_SIZE].try_into().unwrap();
    let mut crc = Crc64We::new();
    crc.update(record_bytes);
    if crc.bytes() == buffer[RECORD_SIZE..] {
        Some(ConfigRecord::from_bytes(record_bytes))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_frame_leads_with_the_record_checksum() {
        let record = ConfigRecord::new(1_000_000, 50, 127);
        let frame = compose_with_leading_crc(&record);
        let expected = Crc64We::digest(&record.to_bytes()).to_be_bytes();
        assert_eq!(&frame[..8], &expected);
        assert_eq!(&frame[8..], &record.to_bytes());
    }

    #[test]
    fn compose_is_a_pure_function_of_the_record() {
        let record = ConfigRecord::new(125_000, 3, 9);
        assert_eq!(
            compose_with_leading_crc(&record),
            compose_with_leading_crc(&record),
            "composing the same record twice must yield identical bytes"
        );
    }

    #[test]
    fn composed_frame_is_invalid_under_the_trailing_convention() {
        let mut record = ConfigRecord::new(1_000_000, 50, 127);
        record.file_name[..9].copy_from_slice(b"app.uf2\0\0");
        let frame = compose_with_leading_crc(&record);
        assert!(
            parse_with_trailing_crc(&frame).is_none(),
            "the two framings disagree about the checksum window by construction"
        );
    }

    #[test]
    fn trailing_parse_accepts_a_checksum_after_its_record() {
        let mut record = ConfigRecord::new(250_000, 11, 126);
        record.set_nonce(0x4242);
        let record_bytes = record.to_bytes();
        let mut frame = [0u8; FRAME_SIZE];
        frame[..RECORD_SIZE].copy_from_slice(&record_bytes);
        frame[RECORD_SIZE..].copy_from_slice(&Crc64We::digest(&record_bytes).to_be_bytes());
        assert_eq!(parse_with_trailing_crc(&frame), Some(record));
    }

    #[test]
    fn trailing_parse_rejects_a_single_corrupted_byte() {
        let record = ConfigRecord::new(250_000, 11, 126);
        let record_bytes = record.to_bytes();
        let mut frame = [0u8; FRAME_SIZE];
        frame[..RECORD_SIZE].copy_from_slice(&record_bytes);
        frame[RECORD_SIZE..].copy_from_slice(&Crc64We::digest(&record_bytes).to_be_bytes());
        frame[20] ^= 0x01;
        assert!(parse_with_trailing_crc(&frame).is_none());
    }

    #[test]
    fn residue_self_check_holds_for_the_trailing_layout() {
        // Feeding record bytes and then their checksum through one streaming
        // state is exactly the verification the residue constant encodes.
        let record = ConfigRecord::new(1_000_000, 50, 127);
        let record_bytes = record.to_bytes();
        let mut crc = Crc64We::new();
        crc.update(&record_bytes);
        let checksum = crc.bytes();
        crc.update(&checksum);
        assert!(crc.residue_ok());
    }
}
