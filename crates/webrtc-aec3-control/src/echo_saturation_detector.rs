//! Detects whether the echo in the capture signal may be saturated.

use crate::config::EpStrength;

/// Margin applied to the predicted peak echo amplitude.
const PEAK_ECHO_MARGIN: f32 = 10.0;
/// Peak echo amplitude above which a saturated capture block is blamed on
/// the echo.
const SATURATION_AMPLITUDE: f32 = 32000.0;
/// Number of blocks the saturation flag stays raised after the last
/// saturating block.
const SATURATION_HOLD_BLOCKS: usize = 20;
/// Counter value at construction, far outside the hold window.
const INITIAL_BLOCKS_SINCE_SATURATION: usize = 1000;

/// Flags echo saturation from the aligned render peak and the echo path gain.
#[derive(Debug)]
pub struct EchoSaturationDetector {
    echo_can_saturate: bool,
    echo_path_gain: f32,
    blocks_since_last_saturation: usize,
    echo_saturation: bool,
}

impl EchoSaturationDetector {
    pub fn new(config: &EpStrength) -> Self {
        Self {
            echo_can_saturate: config.echo_can_saturate,
            echo_path_gain: config.default_gain,
            blocks_since_last_saturation: INITIAL_BLOCKS_SINCE_SATURATION,
            echo_saturation: false,
        }
    }

    /// Updates the detector with the delay-aligned render block.
    ///
    /// `echo_path_gain` replaces the stored gain only when the filter
    /// estimate is good.
    pub fn update(
        &mut self,
        x_aligned: &[f32],
        saturated_capture: bool,
        echo_path_gain: Option<f32>,
        good_filter_estimate: bool,
    ) {
        if !self.echo_can_saturate {
            self.echo_saturation = false;
            return;
        }

        debug_assert!(!x_aligned.is_empty());
        let x_max = x_aligned.iter().fold(0.0f32, |m, &v| m.max(v.abs()));

        if let Some(gain) = echo_path_gain.filter(|_| good_filter_estimate) {
            self.echo_path_gain = gain;
        }

        let peak_echo_amplitude = x_max * self.echo_path_gain * PEAK_ECHO_MARGIN;
        if saturated_capture && peak_echo_amplitude > SATURATION_AMPLITUDE {
            self.blocks_since_last_saturation = 0;
        } else {
            self.blocks_since_last_saturation = self.blocks_since_last_saturation.saturating_add(1);
        }

        self.echo_saturation = self.blocks_since_last_saturation < SATURATION_HOLD_BLOCKS;
    }

    pub fn saturation_detected(&self) -> bool {
        self.echo_saturation
    }

    /// Echo path gain used for the last prediction.
    pub fn echo_path_gain(&self) -> f32 {
        self.echo_path_gain
    }

    /// Restarts the detector after an echo path change.
    ///
    /// The counter is zeroed, so the next blocks are treated as inside the
    /// hold window until the new path has produced unsaturated blocks.
    pub fn reset(&mut self) {
        self.blocks_since_last_saturation = 0;
    }
}
