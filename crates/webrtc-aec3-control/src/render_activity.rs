//! Render activity detection on the delay-aligned render block.

use crate::common::{FFT_LENGTH_BY_2, energy};
use crate::config::RenderLevels;

/// Classifies aligned render blocks as active and counts active blocks.
///
/// The counters are history: they only grow, and are cleared by
/// [`reset`](Self::reset) on an echo path change, never by silence.
#[derive(Debug)]
pub struct RenderActivity {
    active_render_limit: f32,
    active_render: bool,
    active_render_blocks: usize,
    active_render_blocks_without_saturation: usize,
}

impl RenderActivity {
    pub fn new(config: &RenderLevels) -> Self {
        Self {
            active_render_limit: config.active_render_limit
                * config.active_render_limit
                * FFT_LENGTH_BY_2 as f32,
            active_render: false,
            active_render_blocks: 0,
            active_render_blocks_without_saturation: 0,
        }
    }

    pub fn update(&mut self, x_aligned: &[f32], saturated_capture: bool) {
        self.active_render = energy(x_aligned) > self.active_render_limit;
        if self.active_render {
            self.active_render_blocks += 1;
            if !saturated_capture {
                self.active_render_blocks_without_saturation += 1;
            }
        }
    }

    pub fn active_block(&self) -> bool {
        self.active_render
    }

    pub fn num_active_blocks(&self) -> usize {
        self.active_render_blocks
    }

    pub fn num_active_blocks_without_saturation(&self) -> usize {
        self.active_render_blocks_without_saturation
    }

    pub fn reset(&mut self) {
        self.active_render = false;
        self.active_render_blocks = 0;
        self.active_render_blocks_without_saturation = 0;
    }
}
