use crate::forge::LinearSolver;
use thiserror::Error;

/// Failures of the linear-system collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// No subset of the candidate bits reaches the target checksum.
    #[error("target checksum is not reachable with the given candidate bits")]
    Infeasible,
    /// The single-bit-effect function produced a value of the wrong width.
    #[error("effect value width {got} differs from target width {expected}")]
    WidthMismatch { expected: usize, got: usize },
}

/// Gaussian elimination over GF(2).
///
/// The checksum is linear, so the effect of flipping any bit subset is the
/// XOR of the individual single-bit effects. Each candidate contributes one
/// delta column (flipped checksum XOR baseline); the columns are reduced
/// into a pivot-indexed basis that remembers which candidates combine into
/// each basis vector, and the target delta is then reduced against that
/// basis. Ties between equally feasible flip sets fall out of the candidate
/// insertion order.
#[derive(Debug, Default)]
pub struct GaussianSolver;

impl GaussianSolver {
    pub fn new() -> Self {
        GaussianSolver
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Index of the highest set bit of a big-endian byte string, or `None` for
/// the zero vector.
fn pivot(value: &[u8]) -> Option<usize> {
    for (byte_index, &byte) in value.iter().enumerate() {
        if byte != 0 {
            return Some((value.len() - byte_index) * 8 - 1 - byte.leading_zeros() as usize);
        }
    }
    None
}

impl LinearSolver for GaussianSolver {
    fn solve(
        &self,
        bit_length: usize,
        target: &[u8],
        effect: &dyn Fn(usize) -> Vec<u8>,
        candidates: &[usize],
    ) -> Result<Vec<usize>, SolverError> {
        let width = target.len();
        let baseline = effect(bit_length);
        if baseline.len() != width {
            return Err(SolverError::WidthMismatch {
                expected: width,
                got: baseline.len(),
            });
        }

        let combo_len = candidates.len().div_ceil(8);
        let mut basis: Vec<Option<(Vec<u8>, Vec<u8>)>> = vec![None; width * 8];

        for (slot, &bit) in candidates.iter().enumerate() {
            let flipped = effect(bit);
            if flipped.len() != width {
                return Err(SolverError::WidthMismatch {
                    expected: width,
                    got: flipped.len(),
                });
            }
            let mut value = flipped;
            xor_into(&mut value, &baseline);
            let mut combo = vec![0u8; combo_len];
            combo[slot / 8] |= 1 << (slot % 8);

            // Reduce against the basis; a vector that survives with a fresh
            // pivot extends it, a vector reduced to zero is linearly
            // dependent and contributes nothing new.
            while let Some(p) = pivot(&value) {
                match &basis[p] {
                    Some((basis_value, basis_combo)) => {
                        xor_into(&mut value, basis_value);
                        xor_into(&mut combo, basis_combo);
                    }
                    None => {
                        basis[p] = Some((value, combo));
                        break;
                    }
                }
            }
        }

        let mut residual = target.to_vec();
        xor_into(&mut residual, &baseline);
        let mut chosen = vec![0u8; combo_len];
        while let Some(p) = pivot(&residual) {
            match &basis[p] {
                Some((basis_value, basis_combo)) => {
                    xor_into(&mut residual, basis_value);
                    xor_into(&mut chosen, basis_combo);
                }
                None => return Err(SolverError::Infeasible),
            }
        }

        Ok(candidates
            .iter()
            .enumerate()
            .filter(|(slot, _)| chosen[slot / 8] & (1 << (slot % 8)) != 0)
            .map(|(_, &bit)| bit)
            .collect())
    }
}
