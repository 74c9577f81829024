//! Multi-channel to mono alignment mixer.
//!
//! Reduces a multi-channel block to the single representative channel that
//! the delay estimation and render activity analysis run on.

use crate::block::Block;
use crate::common::{BLOCK_SIZE, NUM_BLOCKS_PER_SECOND, energy};
use crate::config::AlignmentMixing;

/// How the mixer reduces the channels of a block to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixingVariant {
    /// Averages all channels.
    Downmix,
    /// Picks the channel with the most energy, with hysteresis.
    Adaptive,
    /// Always uses the first channel.
    Fixed,
}

/// Blocks the first two channels must be strong for before the adaptive
/// search is restricted to them.
const LEFT_OR_RIGHT_STRONG_BLOCKS: usize = NUM_BLOCKS_PER_SECOND / 2;
/// Blocks over which energies are accumulated before they are normalized
/// and smoothed (60 s).
const ACCUMULATION_BLOCKS: usize = 60 * NUM_BLOCKS_PER_SECOND;
/// Smoothing factor of the per-block channel energies (10 s time constant).
const ENERGY_SMOOTHING: f32 = 1.0 / (10 * NUM_BLOCKS_PER_SECOND) as f32;
/// Energy ratio a channel needs over the selected one to take over.
const SWITCH_RATIO: f32 = 2.0;

fn choose_mixing_variant(
    downmix: bool,
    adaptive_selection: bool,
    num_channels: usize,
) -> MixingVariant {
    debug_assert!(!(adaptive_selection && downmix));
    debug_assert!(num_channels > 0);

    match (num_channels, downmix, adaptive_selection) {
        (1, _, _) => MixingVariant::Fixed,
        (_, true, _) => MixingVariant::Downmix,
        (_, false, true) => MixingVariant::Adaptive,
        _ => MixingVariant::Fixed,
    }
}

/// Mixes multi-channel audio down to mono for delay estimation.
#[derive(Debug)]
pub struct AlignmentMixer {
    num_channels: usize,
    one_by_num_channels: f32,
    excitation_energy_threshold: f32,
    prefer_first_two_channels: bool,
    selection_variant: MixingVariant,
    strong_block_counters: [usize; 2],
    cumulative_energies: Vec<f32>,
    selected_channel: usize,
    block_counter: usize,
}

impl AlignmentMixer {
    pub fn new(num_channels: usize, config: &AlignmentMixing) -> Self {
        Self::new_with_params(
            num_channels,
            config.downmix,
            config.adaptive_selection,
            config.excitation_limit,
            config.prefer_first_two_channels,
        )
    }

    pub fn new_with_params(
        num_channels: usize,
        downmix: bool,
        adaptive_selection: bool,
        excitation_limit: f32,
        prefer_first_two_channels: bool,
    ) -> Self {
        let selection_variant = choose_mixing_variant(downmix, adaptive_selection, num_channels);
        let cumulative_energies = if selection_variant == MixingVariant::Adaptive {
            vec![0.0f32; num_channels]
        } else {
            Vec::new()
        };

        Self {
            num_channels,
            one_by_num_channels: 1.0 / num_channels as f32,
            excitation_energy_threshold: BLOCK_SIZE as f32 * excitation_limit * excitation_limit,
            prefer_first_two_channels,
            selection_variant,
            strong_block_counters: [0; 2],
            cumulative_energies,
            selected_channel: 0,
            block_counter: 0,
        }
    }

    pub fn variant(&self) -> MixingVariant {
        self.selection_variant
    }

    /// Channel copied to the output by the most recent adaptive selection.
    pub fn selected_channel(&self) -> usize {
        self.selected_channel
    }

    /// Produces mono output from multi-channel input.
    pub fn produce_output(&mut self, x: &Block, y: &mut [f32; BLOCK_SIZE]) {
        debug_assert_eq!(x.num_channels(), self.num_channels);

        match self.selection_variant {
            MixingVariant::Downmix => self.downmix(x, y),
            MixingVariant::Fixed => y.copy_from_slice(x.view(0, 0)),
            MixingVariant::Adaptive => {
                let ch = self.select_channel(x);
                y.copy_from_slice(x.view(0, ch));
            }
        }
    }

    fn downmix(&self, x: &Block, y: &mut [f32; BLOCK_SIZE]) {
        debug_assert!(self.num_channels >= 2);

        y.fill(0.0);
        for ch in 0..self.num_channels {
            for (out, &v) in y.iter_mut().zip(x.view(0, ch)) {
                *out += v;
            }
        }
        y.iter_mut().for_each(|v| *v *= self.one_by_num_channels);
    }

    /// Updates the channel energies with `x` and returns the channel to use.
    fn select_channel(&mut self, x: &Block) -> usize {
        debug_assert!(self.num_channels >= 2);
        debug_assert_eq!(self.cumulative_energies.len(), self.num_channels);

        let first_two_only = self.prefer_first_two_channels
            && self
                .strong_block_counters
                .iter()
                .any(|&blocks| blocks > LEFT_OR_RIGHT_STRONG_BLOCKS);
        let num_analyzed = if first_two_only { 2 } else { self.num_channels };

        self.block_counter += 1;
        let smoothing = self.block_counter > ACCUMULATION_BLOCKS;
        for (ch, cumulative) in self.cumulative_energies[..num_analyzed].iter_mut().enumerate() {
            let block_energy = energy(x.view(0, ch));
            if let Some(strong_blocks) = self.strong_block_counters.get_mut(ch) {
                if block_energy > self.excitation_energy_threshold {
                    *strong_blocks += 1;
                }
            }
            if smoothing {
                *cumulative += ENERGY_SMOOTHING * (block_energy - *cumulative);
            } else {
                *cumulative += block_energy;
            }
        }

        // Sums become per-block means once smoothing takes over.
        if self.block_counter == ACCUMULATION_BLOCKS {
            let scale = 1.0 / ACCUMULATION_BLOCKS as f32;
            self.cumulative_energies[..num_analyzed]
                .iter_mut()
                .for_each(|e| *e *= scale);
        }

        let energies = &self.cumulative_energies;
        let strongest = (1..num_analyzed).fold(0, |best, ch| {
            if energies[ch] > energies[best] { ch } else { best }
        });

        let leave_other_channel = first_two_only && self.selected_channel > 1;
        let clearly_stronger = energies[strongest] > SWITCH_RATIO * energies[self.selected_channel];
        if (leave_other_channel || clearly_stronger) && strongest != self.selected_channel {
            tracing::debug!(
                from = self.selected_channel,
                to = strongest,
                "alignment mixer switched channel"
            );
            self.selected_channel = strongest;
        }

        self.selected_channel
    }
}
