//! Constants shared by the echo control components.

/// Number of 64-sample blocks in one second of 16 kHz audio.
pub const NUM_BLOCKS_PER_SECOND: usize = 250;

pub(crate) const FFT_LENGTH_BY_2: usize = 64;

/// Number of samples per band and channel in a [`Block`](crate::Block).
pub const BLOCK_SIZE: usize = FFT_LENGTH_BY_2;

/// Largest render or capture channel count accepted by the control plane.
pub const MAX_NUM_CHANNELS: usize = 32;

/// Down-sampling factors accepted by the [`Decimator`](crate::Decimator).
pub const SUPPORTED_DOWN_SAMPLING_FACTORS: [usize; 4] = [2, 4, 8, 16];

/// Returns whether `factor` is one of the supported down-sampling factors.
pub const fn valid_down_sampling_factor(factor: usize) -> bool {
    matches!(factor, 2 | 4 | 8 | 16)
}

/// Converts a duration in seconds into a number of blocks.
pub(crate) const fn seconds_to_blocks(seconds: usize) -> usize {
    seconds * NUM_BLOCKS_PER_SECOND
}

/// Sum of squares of a block of samples.
pub(crate) fn energy(x: &[f32]) -> f32 {
    x.iter().map(|&v| v * v).sum()
}
