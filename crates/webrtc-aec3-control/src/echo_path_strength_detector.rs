//! Classifies whether there is any echo path to cancel.

use crate::common::seconds_to_blocks;
use crate::delay_estimate::DelayEstimate;

/// Blocks without a consistent filter before a missing echo path is assumed.
const NO_CONSISTENT_FILTER_BLOCKS: usize = seconds_to_blocks(10);
/// Active render blocks required before a missing echo path is assumed.
const MIN_RENDER_ACTIVITY_BLOCKS: usize = seconds_to_blocks(5);

/// Strength of the echo path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EchoPathStrength {
    #[default]
    Normal,
    /// No echo has been found despite sustained render activity.
    Zero,
}

#[derive(Debug)]
pub struct EchoPathStrengthDetector {
    render_activity_counter: usize,
    blocks_since_consistent_filter_estimate: usize,
    echo_path_strength: EchoPathStrength,
}

impl Default for EchoPathStrengthDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoPathStrengthDetector {
    pub fn new() -> Self {
        Self {
            render_activity_counter: 0,
            blocks_since_consistent_filter_estimate: 0,
            echo_path_strength: EchoPathStrength::Normal,
        }
    }

    pub fn update(
        &mut self,
        delay_estimate: Option<&DelayEstimate>,
        active_render: bool,
        consistent_filter_estimate: bool,
    ) {
        if consistent_filter_estimate {
            self.blocks_since_consistent_filter_estimate = 0;
        } else {
            self.blocks_since_consistent_filter_estimate += 1;
        }
        if active_render {
            self.render_activity_counter += 1;
        }

        let strength = if delay_estimate.is_none()
            && self.blocks_since_consistent_filter_estimate > NO_CONSISTENT_FILTER_BLOCKS
            && self.render_activity_counter > MIN_RENDER_ACTIVITY_BLOCKS
        {
            EchoPathStrength::Zero
        } else {
            EchoPathStrength::Normal
        };

        if strength != self.echo_path_strength {
            tracing::debug!(?strength, "echo path strength changed");
        }
        self.echo_path_strength = strength;
    }

    pub fn strength(&self) -> EchoPathStrength {
        self.echo_path_strength
    }

    /// Returns the classification to `Normal`. A hard reset also forgets
    /// the activity and consistency history.
    pub fn reset(&mut self, soft_reset: bool) {
        self.echo_path_strength = EchoPathStrength::Normal;
        if !soft_reset {
            self.render_activity_counter = 0;
            self.blocks_since_consistent_filter_estimate = 0;
        }
    }
}
