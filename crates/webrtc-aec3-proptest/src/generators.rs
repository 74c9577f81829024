//! Block and energy generators for property-based testing.
//!
//! Provides both strategy functions (for use with `#[strategy(...)]`) and
//! `Arbitrary`-deriving structs for the inputs of the echo control
//! components.

use proptest::prelude::*;
use test_strategy::Arbitrary;

/// Samples per band and channel in a 4 ms block at 16 kHz.
pub const BLOCK_SIZE: usize = 64;

/// Largest channel count generated for multi-channel blocks.
pub const MAX_CHANNELS: usize = 7;

/// A supported decimator down-sampling factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum DownSamplingFactor {
    #[weight(1)]
    By2,
    #[weight(1)]
    By4,
    #[weight(1)]
    By8,
    #[weight(1)]
    By16,
}

impl DownSamplingFactor {
    pub fn value(self) -> usize {
        match self {
            Self::By2 => 2,
            Self::By4 => 4,
            Self::By8 => 8,
            Self::By16 => 16,
        }
    }
}

/// A multi-channel block with between 1 and [`MAX_CHANNELS`] channels.
#[derive(Debug, Clone, Arbitrary)]
pub struct MultiChannelBlock {
    #[strategy(1..=MAX_CHANNELS)]
    pub num_channels: usize,
    #[strategy(multichannel_block(#num_channels, 32768.0))]
    pub samples: Vec<f32>,
}

impl MultiChannelBlock {
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Samples of channel `ch`, stored channel after channel.
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.samples[ch * BLOCK_SIZE..(ch + 1) * BLOCK_SIZE]
    }
}

/// Per-channel residual and capture energies of the linear echo filters.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct FilterEnergies {
    #[strategy(0.0f32..1.0e9)]
    pub y2: f32,
    #[strategy(0.0f32..2.0e9)]
    pub e2_refined: f32,
    #[strategy(0.0f32..2.0e9)]
    pub e2_coarse: f32,
}

/// Deterministic white noise for tests that need long signals.
///
/// A 32-bit linear congruential generator; only the upper 16 bits of the
/// state are used as output.
#[derive(Debug, Clone)]
pub struct TestNoise {
    state: u32,
}

impl TestNoise {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Uniform sample in `[-1, 1)`.
    pub fn next_unit(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12345);
        ((self.state >> 16) as i32 - 32768) as f32 / 32768.0
    }

    /// Fills `buf` with uniform noise of the given peak amplitude.
    pub fn fill(&mut self, buf: &mut [f32], amplitude: f32) {
        for v in buf.iter_mut() {
            *v = amplitude * self.next_unit();
        }
    }
}

/// Generate one channel of a block with samples in `[-max_amplitude, max_amplitude]`.
pub fn render_block(max_amplitude: f32) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-max_amplitude..=max_amplitude, BLOCK_SIZE..=BLOCK_SIZE)
}

/// Generate `channels` channels of a block, stored channel after channel.
pub fn multichannel_block(channels: usize, max_amplitude: f32) -> impl Strategy<Value = Vec<f32>> {
    let len = BLOCK_SIZE * channels;
    proptest::collection::vec(-max_amplitude..=max_amplitude, len..=len)
}

/// Generate a sequence of per-block saturation flags.
pub fn saturation_pattern(max_blocks: usize) -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), 1..=max_blocks)
}

/// Generate per-channel filter energies for `1..=max_channels` channels.
pub fn filter_energies(max_channels: usize) -> impl Strategy<Value = Vec<FilterEnergies>> {
    proptest::collection::vec(any::<FilterEnergies>(), 1..=max_channels)
}
