//! Per-block echo control decision pipeline.
//!
//! Render and capture are mixed to mono and decimated; the decimated
//! signals drive the refined delay search. The render block aligned at the
//! estimated delay feeds the activity and saturation detectors, and the
//! externally computed subtractor energies feed the convergence analysis.
//! The results are fused into an [`EchoControlOutput`] per block.

use crate::alignment_mixer::AlignmentMixer;
use crate::block::Block;
use crate::common::{BLOCK_SIZE, MAX_NUM_CHANNELS, valid_down_sampling_factor};
use crate::config::{AlignmentMixing, EchoControlConfig};
use crate::data_dumper::{DataDumper, NullDataDumper};
use crate::decimator::Decimator;
use crate::echo_model_selector::EchoModelSelector;
use crate::echo_path_strength_detector::{EchoPathStrength, EchoPathStrengthDetector};
use crate::echo_path_variability::{DelayAdjustment, EchoPathVariability};
use crate::echo_saturation_detector::EchoSaturationDetector;
use crate::error::{Error, Result};
use crate::refined_delay_estimator::RefinedDelayEstimator;
use crate::render_activity::RenderActivity;
use crate::render_history::RenderHistory;
use crate::subtractor_output::SubtractorOutput;
use crate::subtractor_output_analyzer::SubtractorOutputAnalyzer;

/// Decision produced for every block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoControlOutput {
    /// The linear echo filter output can be trusted.
    pub linear_model_selected: bool,
    pub echo_saturation: bool,
    pub echo_path_strength: EchoPathStrength,
    /// Render-to-capture delay, once a consistent estimate exists.
    pub delay_blocks: Option<usize>,
}

fn check_channels(kind: &'static str, count: usize) -> Result<()> {
    if count == 0 || count > MAX_NUM_CHANNELS {
        return Err(Error::BadNumberChannels { kind, count });
    }
    Ok(())
}

fn check_mixing(kind: &'static str, mixing: &AlignmentMixing) -> Result<()> {
    if mixing.downmix && mixing.adaptive_selection {
        return Err(Error::InvalidAlignmentMixing { kind });
    }
    Ok(())
}

/// Echo control pipeline for one render/capture stream pair.
#[derive(derive_more::Debug)]
pub struct EchoControl {
    config: EchoControlConfig,
    num_render_channels: usize,
    num_capture_channels: usize,
    render_mixer: AlignmentMixer,
    capture_mixer: AlignmentMixer,
    render_decimator: Decimator,
    capture_decimator: Decimator,
    render_history: RenderHistory,
    delay_estimator: RefinedDelayEstimator,
    render_activity: RenderActivity,
    saturation_detector: EchoSaturationDetector,
    strength_detector: EchoPathStrengthDetector,
    subtractor_analyzer: SubtractorOutputAnalyzer,
    model_selector: EchoModelSelector,
    #[debug(skip)]
    data_dumper: Box<dyn DataDumper>,
    #[debug(skip)]
    mixed_render: [f32; BLOCK_SIZE],
    #[debug(skip)]
    mixed_capture: [f32; BLOCK_SIZE],
    #[debug(skip)]
    decimated_render: Vec<f32>,
    #[debug(skip)]
    decimated_capture: Vec<f32>,
    output: EchoControlOutput,
}

impl EchoControl {
    pub fn new(
        config: &EchoControlConfig,
        num_render_channels: usize,
        num_capture_channels: usize,
    ) -> Result<Self> {
        check_channels("render", num_render_channels)?;
        check_channels("capture", num_capture_channels)?;
        let factor = config.delay.down_sampling_factor;
        if !valid_down_sampling_factor(factor) {
            return Err(Error::BadDownSamplingFactor { factor });
        }
        check_mixing("render", &config.delay.render_alignment_mixing)?;
        check_mixing("capture", &config.delay.capture_alignment_mixing)?;

        let mut config = config.clone();
        config.validate();

        let sub_block_size = BLOCK_SIZE / factor;
        let delay_estimator = RefinedDelayEstimator::new(&config.filter.refined_delay, sub_block_size);
        let history_blocks = delay_estimator
            .history_blocks()
            .max(config.filter.refined_delay.length_blocks);

        tracing::debug!(
            num_render_channels,
            num_capture_channels,
            down_sampling_factor = factor,
            "creating echo control"
        );

        Ok(Self {
            render_mixer: AlignmentMixer::new(
                num_render_channels,
                &config.delay.render_alignment_mixing,
            ),
            capture_mixer: AlignmentMixer::new(
                num_capture_channels,
                &config.delay.capture_alignment_mixing,
            ),
            render_decimator: Decimator::new(factor),
            capture_decimator: Decimator::new(factor),
            render_history: RenderHistory::new(history_blocks, sub_block_size),
            delay_estimator,
            render_activity: RenderActivity::new(&config.render_levels),
            saturation_detector: EchoSaturationDetector::new(&config.ep_strength),
            strength_detector: EchoPathStrengthDetector::new(),
            subtractor_analyzer: SubtractorOutputAnalyzer::new(
                num_capture_channels,
                config.filter.smooth_subtractor_energies,
            ),
            model_selector: EchoModelSelector::new(),
            data_dumper: Box::new(NullDataDumper),
            mixed_render: [0.0; BLOCK_SIZE],
            mixed_capture: [0.0; BLOCK_SIZE],
            decimated_render: vec![0.0; sub_block_size],
            decimated_capture: vec![0.0; sub_block_size],
            output: EchoControlOutput::default(),
            num_render_channels,
            num_capture_channels,
            config,
        })
    }

    /// Routes per-block diagnostics to `data_dumper`.
    pub fn with_data_dumper(mut self, data_dumper: Box<dyn DataDumper>) -> Self {
        self.data_dumper = data_dumper;
        self
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &EchoControlConfig {
        &self.config
    }

    pub fn num_render_channels(&self) -> usize {
        self.num_render_channels
    }

    pub fn num_capture_channels(&self) -> usize {
        self.num_capture_channels
    }

    /// Processes one block of render and capture audio.
    ///
    /// `subtractor_output` holds the energies of the linear echo filters,
    /// one entry per capture channel.
    pub fn process_block(
        &mut self,
        render: &Block,
        capture: &Block,
        saturated_capture: bool,
        subtractor_output: &[SubtractorOutput],
    ) -> EchoControlOutput {
        debug_assert_eq!(render.num_channels(), self.num_render_channels);
        debug_assert_eq!(capture.num_channels(), self.num_capture_channels);
        debug_assert_eq!(subtractor_output.len(), self.num_capture_channels);

        self.data_dumper.begin_block();

        self.render_mixer.produce_output(render, &mut self.mixed_render);
        self.capture_mixer.produce_output(capture, &mut self.mixed_capture);
        self.render_decimator
            .decimate(&self.mixed_render, &mut self.decimated_render);
        self.capture_decimator
            .decimate(&self.mixed_capture, &mut self.decimated_capture);
        self.render_history
            .insert(&self.mixed_render, &self.decimated_render);

        let delay = self.delay_estimator.delay_blocks().unwrap_or(0);
        let x_aligned = self.render_history.block(delay);
        self.render_activity.update(x_aligned, saturated_capture);
        let active_render = self.render_activity.active_block();

        self.delay_estimator.update(
            &self.render_history,
            &self.decimated_capture,
            active_render,
            saturated_capture,
        );
        let consistent_filter = self.delay_estimator.consistent_filter_estimate();

        self.saturation_detector.update(
            x_aligned,
            saturated_capture,
            self.delay_estimator.echo_path_gain(),
            consistent_filter,
        );
        let echo_saturation = self.saturation_detector.saturation_detected();

        let analysis = self.subtractor_analyzer.update(subtractor_output);

        let delay_estimate = self.delay_estimator.delay_estimate();
        self.strength_detector
            .update(delay_estimate.as_ref(), active_render, consistent_filter);

        self.model_selector.update(
            echo_saturation,
            active_render,
            analysis.any_filter_converged,
            analysis.all_filters_diverged,
        );

        self.output = EchoControlOutput {
            linear_model_selected: self.model_selector.linear_model_selected(),
            echo_saturation,
            echo_path_strength: self.strength_detector.strength(),
            delay_blocks: delay_estimate.map(|e| e.delay),
        };

        let dumper = self.data_dumper.as_mut();
        dumper.dump_bool("aec3_active_render", active_render);
        dumper.dump_bool("aec3_capture_saturation", saturated_capture);
        dumper.dump_bool("aec3_echo_saturation", echo_saturation);
        dumper.dump_bool("aec3_consistent_filter", consistent_filter);
        dumper.dump_bool("aec3_any_filter_converged", analysis.any_filter_converged);
        dumper.dump_bool(
            "aec3_any_coarse_filter_converged",
            analysis.any_coarse_filter_converged,
        );
        dumper.dump_bool("aec3_all_filters_diverged", analysis.all_filters_diverged);
        dumper.dump_bool("aec3_linear_model_selected", self.output.linear_model_selected);
        dumper.dump_bool(
            "aec3_zero_echo_path",
            self.output.echo_path_strength == EchoPathStrength::Zero,
        );
        dumper.dump(
            "aec3_delay_blocks",
            &[self.output.delay_blocks.map_or(-1.0, |d| d as f32)],
        );
        dumper.dump(
            "aec3_echo_path_gain",
            &[self.saturation_detector.echo_path_gain()],
        );
        dumper.dump(
            "aec3_refined_delay_residual",
            self.delay_estimator.residual(),
        );

        self.output
    }

    /// Decision of the most recent block.
    pub fn output(&self) -> EchoControlOutput {
        self.output
    }

    /// Active, unsaturated render blocks since the last delay change.
    pub fn blocks_with_proper_filter_adaptation(&self) -> usize {
        self.model_selector.blocks_with_proper_filter_adaptation()
    }

    /// Adjusts the state to a change in the echo path.
    ///
    /// A delay change restarts every detector and the delay search. A gain
    /// change alone only returns the echo path strength to normal. The
    /// filter convergence flags are cleared in all cases.
    pub fn handle_echo_path_change(&mut self, echo_path_variability: &EchoPathVariability) {
        tracing::debug!(?echo_path_variability, "echo path change");

        if echo_path_variability.delay_changed() {
            self.render_activity.reset();
            self.saturation_detector.reset();
            self.strength_detector.reset(false);
            self.model_selector.reset();
            self.delay_estimator.reset();
            if echo_path_variability.delay_change == DelayAdjustment::BufferFlush {
                self.render_history.reset();
                self.render_decimator.reset();
                self.capture_decimator.reset();
            }
            self.output = EchoControlOutput::default();
        } else if echo_path_variability.gain_change {
            self.strength_detector.reset(true);
            self.output.echo_path_strength = EchoPathStrength::Normal;
        }

        self.subtractor_analyzer.handle_echo_path_change();
    }
}
