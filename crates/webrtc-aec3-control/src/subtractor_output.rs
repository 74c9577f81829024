//! Per-channel energies produced by the external echo subtractor.

use crate::common::energy;

/// Capture and residual energies of one capture channel for one block.
///
/// The subtractor runs two linear filters: a refined one used for the
/// output and a faster coarse one used as a reference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubtractorOutput {
    /// Capture energy.
    pub y2: f32,
    /// Residual energy after the refined filter.
    pub e2_refined: f32,
    /// Residual energy after the coarse filter.
    pub e2_coarse: f32,
}

impl SubtractorOutput {
    pub fn new(y2: f32, e2_refined: f32, e2_coarse: f32) -> Self {
        Self {
            y2,
            e2_refined,
            e2_coarse,
        }
    }

    /// Computes the energies from the capture block and the two residuals.
    pub fn from_signals(y: &[f32], e_refined: &[f32], e_coarse: &[f32]) -> Self {
        debug_assert_eq!(y.len(), e_refined.len());
        debug_assert_eq!(y.len(), e_coarse.len());
        Self {
            y2: energy(y),
            e2_refined: energy(e_refined),
            e2_coarse: energy(e_coarse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BLOCK_SIZE;

    #[test]
    fn energies_are_sums_of_squares() {
        let y = [4.0f32; BLOCK_SIZE];
        let mut e_refined = [1.0f32; BLOCK_SIZE];
        e_refined[0] = -1.0;
        let e_coarse = [0.5f32; BLOCK_SIZE];

        let out = SubtractorOutput::from_signals(&y, &e_refined, &e_coarse);
        assert_eq!(out.y2, 16.0 * BLOCK_SIZE as f32);
        assert_eq!(out.e2_refined, BLOCK_SIZE as f32);
        assert_eq!(out.e2_coarse, 0.25 * BLOCK_SIZE as f32);
    }
}
