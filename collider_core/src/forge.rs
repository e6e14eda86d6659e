use crate::crc::Crc64We;
use crate::frame::{Frame, compose_with_leading_crc, parse_with_trailing_crc};
use crate::record::{ConfigRecord, FILE_NAME_OFFSET, RECORD_SIZE};
use crate::solver::SolverError;
use thiserror::Error;

/// Bits in the shifted view: the frame prefix the trailing validator
/// checksums, i.e. the leading checksum plus all but the last eight record
/// bytes.
const SHIFTED_BITS: usize = RECORD_SIZE * 8;

/// Errors from the bit-flip forge engine.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// The solver proved the target unreachable with the given candidates.
    /// An expected outcome for over-constrained candidate sets.
    #[error("no flip set reaches the target checksum: {0}")]
    NoSolution(#[from] SolverError),
    /// A returned flip set did not survive end-to-end re-validation. This is
    /// a defect in the candidate/bit-index mapping, not a search miss, and
    /// must never be conflated with [`ForgeError::NoSolution`].
    #[error("forged frame failed trailing-frame re-validation")]
    SelfCheckFailed,
}

/// Contract of the external GF(2) linear-system collaborator.
///
/// `effect(i)` returns the checksum of the message with bit `i` alone
/// flipped (bits are LSB-first within each byte); any index at or beyond
/// `bit_length` leaves the message untouched, which is how a solver obtains
/// the baseline checksum. Checksum values travel as big-endian byte strings
/// so the contract stays agnostic of the checksum width.
///
/// A solver returns the flip set driving the checksum to `target` — possibly
/// one of several minimal sets, with ties broken by its internal ordering —
/// or [`SolverError::Infeasible`] when no subset of `candidates` works.
pub trait LinearSolver {
    fn solve(
        &self,
        bit_length: usize,
        target: &[u8],
        effect: &dyn Fn(usize) -> Vec<u8>,
        candidates: &[usize],
    ) -> Result<Vec<usize>, SolverError>;
}

/// A frame whose shifted view checksums to the requested target.
#[derive(Debug, Clone)]
pub struct ForgedFrame {
    pub frame: Frame,
    pub flipped_bits: Vec<usize>,
}

/// The canonical candidate window: the first eight bytes of the file-name
/// field, addressed as bit indices into the shifted view.
pub fn file_name_bit_window() -> Vec<usize> {
    let first_bit = (Crc64We::SIZE + FILE_NAME_OFFSET) * 8;
    (first_bit..first_bit + 64).collect()
}

/// Asks `solver` for a flip set inside `candidates` that drives the checksum
/// of the seed frame's shifted view to `target`, applies it, and re-validates
/// the result end to end before reporting it.
///
/// The seed is never mutated while the solver runs; every single-bit effect
/// is computed against a fresh copy of the composed frame. Candidate indices
/// outside the shifted view are programming errors and abort.
pub fn forge(
    seed: &ConfigRecord,
    candidates: &[usize],
    target: u64,
    solver: &dyn LinearSolver,
) -> Result<ForgedFrame, ForgeError> {
    for &bit in candidates {
        assert!(
            bit < SHIFTED_BITS,
            "candidate bit {bit} lies outside the {SHIFTED_BITS}-bit shifted view"
        );
    }

    let base = compose_with_leading_crc(seed);
    let shifted: [u8; RECORD_SIZE] = base[..RECORD_SIZE].try_into().unwrap();
    let effect = move |bit: usize| -> Vec<u8> {
        let mut message = shifted;
        if bit < SHIFTED_BITS {
            message[bit / 8] ^= 1 << (bit % 8);
        }
        Crc64We::digest(&message).to_be_bytes().to_vec()
    };

    let flipped_bits = solver.solve(SHIFTED_BITS, &target.to_be_bytes(), &effect, candidates)?;

    let mut frame = base;
    for &bit in &flipped_bits {
        assert!(
            candidates.contains(&bit),
            "solver returned bit {bit} outside the candidate set"
        );
        frame[bit / 8] ^= 1 << (bit % 8);
    }

    if Crc64We::digest(&frame[..RECORD_SIZE]) != target {
        return Err(ForgeError::SelfCheckFailed);
    }
    if parse_with_trailing_crc(&frame).is_none() {
        return Err(ForgeError::SelfCheckFailed);
    }
    Ok(ForgedFrame {
        frame,
        flipped_bits,
    })
}
