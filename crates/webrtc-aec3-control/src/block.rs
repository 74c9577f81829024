//! Multi-band, multi-channel audio block.

use crate::common::BLOCK_SIZE;

/// Contains one or more channels of 4 ms of audio data.
///
/// The audio is split into one or more frequency bands, each with a sampling
/// rate of 16 kHz. Each band/channel combination holds `BLOCK_SIZE` (64)
/// samples. The channel count is fixed when the block is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    num_bands: usize,
    num_channels: usize,
    data: Vec<f32>,
}

impl Block {
    pub fn new(num_bands: usize, num_channels: usize) -> Self {
        Self::new_with_value(num_bands, num_channels, 0.0)
    }

    pub fn new_with_value(num_bands: usize, num_channels: usize, value: f32) -> Self {
        debug_assert!(num_bands > 0);
        debug_assert!(num_channels > 0);
        Self {
            num_bands,
            num_channels,
            data: vec![value; num_bands * num_channels * BLOCK_SIZE],
        }
    }

    /// Builds a single-band block from per-channel sample slices.
    pub fn from_channels(channels: &[&[f32]]) -> Self {
        let mut block = Self::new(1, channels.len());
        for (ch, samples) in channels.iter().enumerate() {
            block.view_mut(0, ch).copy_from_slice(samples);
        }
        block
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Returns a slice of `BLOCK_SIZE` samples for the given band and channel.
    pub fn view(&self, band: usize, channel: usize) -> &[f32] {
        let idx = self.get_index(band, channel);
        &self.data[idx..idx + BLOCK_SIZE]
    }

    /// Returns a mutable slice of `BLOCK_SIZE` samples for the given band and channel.
    pub fn view_mut(&mut self, band: usize, channel: usize) -> &mut [f32] {
        let idx = self.get_index(band, channel);
        &mut self.data[idx..idx + BLOCK_SIZE]
    }

    /// Sets every sample in every band and channel to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    fn get_index(&self, band: usize, channel: usize) -> usize {
        debug_assert!(band < self.num_bands);
        debug_assert!(channel < self.num_channels);
        (band * self.num_channels + channel) * BLOCK_SIZE
    }
}
