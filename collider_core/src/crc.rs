/// Generator polynomial of the CRC-64/WE variant shared by the application
/// and bootloader firmware images.
const POLY: u64 = 0x42F0_E1EB_A9EA_3693;

/// Top-bit mask driving the single-bit division steps.
const MASK: u64 = 1 << 63;

/// Initial accumulator state and final output XOR.
const XOR: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Accumulator state (pre-XOR) observed after a correct checksum has been
/// appended to its own input.
const RESIDUE: u64 = 0xFCAC_BEBD_5931_A992;

/// Input bytes are folded into the most significant byte of the accumulator.
const INPUT_SHIFT: u32 = 56;

/// Streaming CRC-64/WE engine.
///
/// One fixed polynomial, MSB-first bit order, all-ones init and final XOR.
/// The convention must not be altered: both forgery engines rely on this
/// exact variant being linear over GF(2), i.e. for equal-length inputs
/// `crc(a ^ b) == crc(a) ^ crc(b) ^ crc(0)`, and a single mismatched
/// parameter silently invalidates every search result.
#[derive(Debug, Clone)]
pub struct Crc64We {
    crc: u64,
}

impl Crc64We {
    /// Width of the checksum in bytes.
    pub const SIZE: usize = 8;

    pub fn new() -> Self {
        Self { crc: XOR }
    }

    /// Extends the running checksum over `data`.
    ///
    /// Streaming calls are equivalent to a single call over the
    /// concatenation of all bytes passed so far; empty slices are no-ops.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.crc ^= u64::from(byte) << INPUT_SHIFT;
            for _ in 0..8 {
                self.crc = if self.crc & MASK != 0 {
                    (self.crc << 1) ^ POLY
                } else {
                    self.crc << 1
                };
            }
        }
    }

    /// The current checksum value.
    pub fn value(&self) -> u64 {
        self.crc ^ XOR
    }

    /// The current checksum as bytes, most significant first.
    ///
    /// This is the exact byte sequence the framing codec stores next to the
    /// record, and the sequence that must be fed back into the stream for
    /// `residue_ok` to become true.
    pub fn bytes(&self) -> [u8; Self::SIZE] {
        self.value().to_be_bytes()
    }

    /// True iff the bytes consumed so far are some `data` followed by
    /// `bytes()` of the checksum of that `data`.
    pub fn residue_ok(&self) -> bool {
        self.crc == RESIDUE
    }

    /// One-shot checksum of `data`.
    pub fn digest(data: &[u8]) -> u64 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }
}

impl Default for Crc64We {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK_VALUE: u64 = 0x62EC_59E3_F1A4_F00A;

    #[test]
    fn check_vector_streamed_in_pieces() {
        let mut crc = Crc64We::new();
        crc.update(b"12345");
        crc.update(&[]);
        crc.update(b"6789");
        assert_eq!(
            crc.value(),
            CHECK_VALUE,
            "CRC of \"123456789\" must match the published check value"
        );
        assert_eq!(
            crc.bytes(),
            [0x62, 0xEC, 0x59, 0xE3, 0xF1, 0xA4, 0xF0, 0x0A],
            "byte serialization must be big-endian"
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for split in [0, 1, 7, 8, 9, data.len()] {
            let mut crc = Crc64We::new();
            crc.update(&data[..split]);
            crc.update(&data[split..]);
            assert_eq!(
                crc.value(),
                Crc64We::digest(data),
                "split at {split} must not change the checksum"
            );
        }
    }

    #[test]
    fn residue_becomes_correct_after_consuming_own_checksum() {
        let mut crc = Crc64We::new();
        crc.update(b"123456789");
        assert!(
            !crc.residue_ok(),
            "residue must not be correct before the checksum bytes are consumed"
        );
        let checksum_bytes = crc.bytes();
        crc.update(&checksum_bytes);
        assert!(
            crc.residue_ok(),
            "residue must be correct once the checksum follows its own input"
        );
        assert_eq!(!crc.value(), RESIDUE);
    }

    #[test]
    fn empty_update_leaves_state_untouched() {
        let mut crc = Crc64We::new();
        crc.update(&[]);
        assert_eq!(crc.value(), Crc64We::digest(&[]));
    }

    #[test]
    fn checksum_is_linear_over_gf2() {
        let a = [0x13u8, 0x57, 0x9B, 0xDF, 0x24, 0x68, 0xAC, 0xE0, 0x55];
        let b = [0xFEu8, 0xDC, 0xBA, 0x98, 0x76, 0x54, 0x32, 0x10, 0xAA];
        let xored: Vec<u8> = a.iter().zip(&b).map(|(x, y)| x ^ y).collect();
        let zero = Crc64We::digest(&[0u8; 9]);
        assert_eq!(
            Crc64We::digest(&xored),
            Crc64We::digest(&a) ^ Crc64We::digest(&b) ^ zero,
            "flipping a fixed bit subset must shift the checksum independently of content"
        );
    }

    #[test]
    fn single_bit_flip_effect_is_content_independent() {
        // The delta a given bit flip induces must be the same no matter what
        // the rest of the buffer holds.
        let mut a = [0u8; 32];
        let mut b = [0x5Au8; 32];
        let base_a = Crc64We::digest(&a);
        let base_b = Crc64We::digest(&b);
        a[17] ^= 0x04;
        b[17] ^= 0x04;
        assert_eq!(Crc64We::digest(&a) ^ base_a, Crc64We::digest(&b) ^ base_b);
    }
}
