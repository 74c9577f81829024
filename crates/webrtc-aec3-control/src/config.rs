//! Echo control configuration.
//!
//! The structure mirrors the `aec3` section of the WebRTC echo canceller
//! JSON configuration, restricted to the parameters consumed by the
//! control plane. Every section is `#[serde(default)]`, so a JSON document
//! only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::common::valid_down_sampling_factor;
use crate::error::{Error, Result};

/// Configuration for the echo control pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoControlConfig {
    pub delay: Delay,
    pub filter: Filter,
    pub ep_strength: EpStrength,
    pub render_levels: RenderLevels,
}

impl EchoControlConfig {
    /// Validates and clamps config parameters to reasonable ranges.
    /// Returns `true` if no changes were needed.
    pub fn validate(&mut self) -> bool {
        let mut ok = true;

        if !valid_down_sampling_factor(self.delay.down_sampling_factor) {
            tracing::warn!(
                factor = self.delay.down_sampling_factor,
                "unsupported down-sampling factor, using 4"
            );
            self.delay.down_sampling_factor = 4;
            ok = false;
        }

        ok &= validate_mixing(&mut self.delay.render_alignment_mixing, "render");
        ok &= validate_mixing(&mut self.delay.capture_alignment_mixing, "capture");

        ok &= limit_usize(
            &mut self.filter.refined_delay.length_blocks,
            1,
            MAX_REFINED_DELAY_LENGTH_BLOCKS,
        );
        ok &= limit_f32(&mut self.filter.refined_delay.step_size, 0.0, 1.0);
        ok &= limit_f32(&mut self.filter.refined_delay.regularization, 0.0, 1.0e12);

        ok &= limit_f32(&mut self.ep_strength.default_gain, 0.0, 1_000_000.0);
        ok &= limit_f32(&mut self.render_levels.active_render_limit, 0.0, 32768.0);

        if !ok {
            tracing::warn!("echo control config contained out-of-range values and was adjusted");
        }
        ok
    }

    /// Parses a configuration from a JSON document of the form
    /// `{"aec3": {...}}`.
    ///
    /// Values missing from the document keep their defaults and unknown keys
    /// are ignored. A `delay.alignment_mixing` section configures both the
    /// render and the capture mixer, except where a
    /// `render_alignment_mixing` or `capture_alignment_mixing` section is
    /// also given. The parsed configuration is validated before it is
    /// returned.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut root: serde_json::Value = serde_json::from_str(json)?;
        let mut section = root
            .get_mut("aec3")
            .filter(|v| v.is_object())
            .map(serde_json::Value::take)
            .ok_or(Error::MissingAec3Section)?;
        expand_shared_alignment_mixing(&mut section);
        let mut config: Self = serde_json::from_value(section)?;
        config.validate();
        Ok(config)
    }

    /// Serializes the configuration as `{"aec3": {...}}`.
    pub fn to_json(&self) -> Result<String> {
        let root = serde_json::json!({ "aec3": serde_json::to_value(self)? });
        Ok(root.to_string())
    }
}

/// Longest adaptive filter, in blocks, accepted for the refined delay search.
pub const MAX_REFINED_DELAY_LENGTH_BLOCKS: usize = 64;

fn expand_shared_alignment_mixing(section: &mut serde_json::Value) {
    let Some(delay) = section
        .get_mut("delay")
        .and_then(serde_json::Value::as_object_mut)
    else {
        return;
    };
    let Some(shared) = delay.remove("alignment_mixing") else {
        return;
    };
    for key in ["render_alignment_mixing", "capture_alignment_mixing"] {
        delay.entry(key).or_insert_with(|| shared.clone());
    }
}

fn validate_mixing(mixing: &mut AlignmentMixing, kind: &'static str) -> bool {
    let mut ok = true;
    if mixing.downmix && mixing.adaptive_selection {
        tracing::warn!(kind, "downmix and adaptive selection both requested, keeping downmix");
        mixing.adaptive_selection = false;
        ok = false;
    }
    ok &= limit_f32(&mut mixing.excitation_limit, 0.0, 32768.0);
    ok
}

fn limit_f32(value: &mut f32, min: f32, max: f32) -> bool {
    let clamped = value.clamp(min, max);
    let clamped = if clamped.is_finite() { clamped } else { min };
    let unchanged = *value == clamped;
    *value = clamped;
    unchanged
}

fn limit_usize(value: &mut usize, min: usize, max: usize) -> bool {
    let clamped = (*value).clamp(min, max);
    let unchanged = *value == clamped;
    *value = clamped;
    unchanged
}

/// How a multi-channel signal is reduced to mono for delay estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentMixing {
    pub downmix: bool,
    pub adaptive_selection: bool,
    /// Amplitude above which a block counts as strongly excited.
    pub excitation_limit: f32,
    pub prefer_first_two_channels: bool,
}

impl Default for AlignmentMixing {
    fn default() -> Self {
        Self {
            downmix: false,
            adaptive_selection: true,
            excitation_limit: 100.0,
            prefer_first_two_channels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delay {
    pub down_sampling_factor: usize,
    pub render_alignment_mixing: AlignmentMixing,
    pub capture_alignment_mixing: AlignmentMixing,
}

impl Default for Delay {
    fn default() -> Self {
        Self {
            down_sampling_factor: 4,
            render_alignment_mixing: AlignmentMixing::default(),
            capture_alignment_mixing: AlignmentMixing {
                prefer_first_two_channels: false,
                ..AlignmentMixing::default()
            },
        }
    }
}

/// Parameters of the adaptive filter used for refined delay estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinedDelay {
    /// Filter length in full-rate blocks; also the largest detectable delay.
    pub length_blocks: usize,
    /// NLMS step size.
    pub step_size: f32,
    /// Added to the render power before normalizing the update.
    pub regularization: f32,
}

impl Default for RefinedDelay {
    fn default() -> Self {
        Self {
            length_blocks: 12,
            step_size: 0.5,
            regularization: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub refined_delay: RefinedDelay,
    /// Smooth the subtractor energies before the convergence checks.
    pub smooth_subtractor_energies: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpStrength {
    /// Echo path gain assumed before a filter estimate is available.
    pub default_gain: f32,
    pub echo_can_saturate: bool,
}

impl Default for EpStrength {
    fn default() -> Self {
        Self {
            default_gain: 1.0,
            echo_can_saturate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLevels {
    pub active_render_limit: f32,
}

impl Default for RenderLevels {
    fn default() -> Self {
        Self {
            active_render_limit: 100.0,
        }
    }
}
