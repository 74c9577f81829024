//! Echo control plane of the WebRTC echo canceller (AEC3).
//!
//! Decides, block by block, whether the linear echo filter can be trusted,
//! whether the echo may be saturated, whether there is an echo path at all,
//! and what the render-to-capture delay is. Echo subtraction and
//! suppression themselves are done elsewhere; their residual energies come
//! in as [`SubtractorOutput`].
//!
//! [`EchoControl`] wires the components together. Each component is also
//! usable on its own.

#![deny(unsafe_code)]

pub mod adaptive_filter;
pub mod alignment_mixer;
pub mod block;
pub(crate) mod cascaded_biquad_filter;
pub(crate) mod circular_buffer;
pub mod common;
pub mod config;
pub mod data_dumper;
pub mod decimator;
pub mod delay_estimate;
pub mod echo_control;
pub mod echo_model_selector;
pub mod echo_path_strength_detector;
pub mod echo_path_variability;
pub mod echo_saturation_detector;
pub mod error;
pub mod refined_delay_estimator;
pub mod render_activity;
pub mod render_history;
pub mod subtractor_output;
pub mod subtractor_output_analyzer;

pub use adaptive_filter::{AdaptiveFilter, NlmsFilter};
pub use alignment_mixer::{AlignmentMixer, MixingVariant};
pub use block::Block;
pub use config::EchoControlConfig;
pub use data_dumper::{DataDumper, NullDataDumper, TracingDataDumper};
pub use decimator::Decimator;
pub use delay_estimate::{DelayEstimate, DelayEstimateQuality};
pub use echo_control::{EchoControl, EchoControlOutput};
pub use echo_model_selector::EchoModelSelector;
pub use echo_path_strength_detector::{EchoPathStrength, EchoPathStrengthDetector};
pub use echo_path_variability::{DelayAdjustment, EchoPathVariability};
pub use echo_saturation_detector::EchoSaturationDetector;
pub use error::{Error, Result};
pub use refined_delay_estimator::RefinedDelayEstimator;
pub use render_activity::RenderActivity;
pub use render_history::RenderHistory;
pub use subtractor_output::SubtractorOutput;
pub use subtractor_output_analyzer::{SubtractorAnalysis, SubtractorOutputAnalyzer};
