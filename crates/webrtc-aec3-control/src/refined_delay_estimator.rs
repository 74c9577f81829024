//! Delay estimation from the impulse response of an adaptive filter run on
//! the decimated render and capture signals.

use crate::adaptive_filter::{AdaptiveFilter, NlmsFilter};
use crate::common::NUM_BLOCKS_PER_SECOND;
use crate::config::RefinedDelay;
use crate::delay_estimate::{DelayEstimate, DelayEstimateQuality};
use crate::render_history::RenderHistory;

/// Active render blocks the peak must stay at the same lag before the
/// estimate is consistent (1.5 s).
const CONSISTENT_ACTIVE_BLOCKS: usize = NUM_BLOCKS_PER_SECOND * 3 / 2;
/// Required ratio between the peak and the mean of the filter floor.
const PEAK_TO_FLOOR: f32 = 10.0;
/// Required ratio between the peak and the largest coefficient of the floor.
const PEAK_TO_SECONDARY_PEAK: f32 = 2.0;

/// Tracks whether the impulse response peak has been significant and
/// stable for long enough.
#[derive(Debug, Default)]
struct ConsistentFilterDetector {
    significant_peak: bool,
    consistent_estimate_counter: usize,
    consistent_delay_reference: Option<usize>,
}

impl ConsistentFilterDetector {
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// The floor covers every coefficient outside the band from one
    /// sub-block before to two sub-blocks after the peak.
    fn detect(
        &mut self,
        h: &[f32],
        peak_index: usize,
        sub_block_size: usize,
        delay_blocks: usize,
        active_render: bool,
    ) -> bool {
        let low_limit = peak_index.saturating_sub(sub_block_size);
        let high_limit = (peak_index + 2 * sub_block_size).min(h.len());

        let floor = h[..low_limit].iter().chain(&h[high_limit..]);
        let (floor_accum, secondary_peak) =
            floor.fold((0.0f32, 0.0f32), |(sum, max), &v| (sum + v.abs(), max.max(v.abs())));
        let floor_len = low_limit + h.len() - high_limit;
        let filter_floor = if floor_len > 0 {
            floor_accum / floor_len as f32
        } else {
            0.0
        };

        let abs_peak = h[peak_index].abs();
        self.significant_peak = abs_peak > PEAK_TO_FLOOR * filter_floor
            && abs_peak > PEAK_TO_SECONDARY_PEAK * secondary_peak;

        if self.significant_peak {
            if self.consistent_delay_reference == Some(delay_blocks) {
                if active_render {
                    self.consistent_estimate_counter += 1;
                }
            } else {
                self.consistent_estimate_counter = 0;
                self.consistent_delay_reference = Some(delay_blocks);
            }
        }

        self.consistent_estimate_counter > CONSISTENT_ACTIVE_BLOCKS
    }
}

/// Index of the coefficient with the largest magnitude.
fn find_peak_index(h: &[f32]) -> usize {
    let mut peak_index = 0;
    let mut max_h2 = 0.0f32;
    for (k, &v) in h.iter().enumerate() {
        if v * v > max_h2 {
            max_h2 = v * v;
            peak_index = k;
        }
    }
    peak_index
}

/// Estimates the echo path delay from an adaptive filter that predicts the
/// decimated capture signal from the decimated render history.
///
/// The filter only adapts on active, unsaturated render. A delay is
/// reported once the impulse response has a significant peak that has
/// stayed at the same block lag for 1.5 s of active render.
#[derive(Debug)]
pub struct RefinedDelayEstimator<F = NlmsFilter> {
    filter: F,
    sub_block_size: usize,
    x: Vec<f32>,
    y_hat: Vec<f32>,
    e: Vec<f32>,
    detector: ConsistentFilterDetector,
    consistent_filter: bool,
    echo_path_gain: Option<f32>,
    estimate: Option<DelayEstimate>,
}

impl RefinedDelayEstimator<NlmsFilter> {
    pub fn new(config: &RefinedDelay, sub_block_size: usize) -> Self {
        let filter = NlmsFilter::new(
            config.length_blocks * sub_block_size,
            config.step_size,
            config.regularization,
        );
        Self::with_filter(filter, sub_block_size)
    }
}

impl<F: AdaptiveFilter> RefinedDelayEstimator<F> {
    /// Uses `filter` for the echo path model. Its length must be a whole
    /// number of sub-blocks.
    pub fn with_filter(filter: F, sub_block_size: usize) -> Self {
        debug_assert!(sub_block_size > 0);
        debug_assert!(!filter.is_empty());
        debug_assert_eq!(filter.len() % sub_block_size, 0);
        let window = filter.len() + sub_block_size - 1;
        Self {
            filter,
            sub_block_size,
            x: vec![0.0; window],
            y_hat: vec![0.0; sub_block_size],
            e: vec![0.0; sub_block_size],
            detector: ConsistentFilterDetector::default(),
            consistent_filter: false,
            echo_path_gain: None,
            estimate: None,
        }
    }

    /// Largest delay, in blocks, the filter can represent.
    pub fn max_delay_blocks(&self) -> usize {
        self.filter.len() / self.sub_block_size - 1
    }

    /// Number of full-rate blocks of render history the estimator reads.
    pub fn history_blocks(&self) -> usize {
        self.x.len().div_ceil(self.sub_block_size)
    }

    /// Processes one decimated capture sub-block against the render history,
    /// whose newest entry must be aligned with `capture`.
    pub fn update(
        &mut self,
        render: &RenderHistory,
        capture: &[f32],
        active_render: bool,
        saturated_capture: bool,
    ) {
        debug_assert_eq!(capture.len(), self.sub_block_size);
        debug_assert_eq!(render.sub_block_size(), self.sub_block_size);

        render.copy_recent(&mut self.x);
        self.filter.filter(&self.x, &mut self.y_hat);
        for ((e, &y), &y_hat) in self.e.iter_mut().zip(capture).zip(&self.y_hat) {
            *e = y - y_hat;
        }

        let adapted = active_render && !saturated_capture;
        if adapted {
            self.filter.adapt(&self.x, &self.e);
        }

        let h = self.filter.impulse_response();
        let peak_index = find_peak_index(h);
        let delay_blocks = peak_index / self.sub_block_size;
        self.consistent_filter =
            self.detector
                .detect(h, peak_index, self.sub_block_size, delay_blocks, active_render);
        self.echo_path_gain = self.detector.significant_peak.then(|| h[peak_index].abs());

        if self.consistent_filter {
            match self.estimate.as_mut() {
                Some(estimate) if adapted => estimate.observe(delay_blocks),
                Some(estimate) => estimate.age(),
                None => {
                    tracing::debug!(delay_blocks, "refined delay estimate found");
                    self.estimate = Some(DelayEstimate::new(DelayEstimateQuality::Refined, delay_blocks));
                }
            }
        } else {
            self.estimate = None;
        }
    }

    /// Prediction error of the last update.
    pub fn residual(&self) -> &[f32] {
        &self.e
    }

    pub fn delay_blocks(&self) -> Option<usize> {
        self.estimate.map(|e| e.delay)
    }

    pub fn delay_estimate(&self) -> Option<DelayEstimate> {
        self.estimate
    }

    pub fn consistent_filter_estimate(&self) -> bool {
        self.consistent_filter
    }

    /// Magnitude of the impulse response peak while the peak is significant.
    pub fn echo_path_gain(&self) -> Option<f32> {
        self.echo_path_gain
    }

    pub fn impulse_response(&self) -> &[f32] {
        self.filter.impulse_response()
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.detector.reset();
        self.y_hat.fill(0.0);
        self.e.fill(0.0);
        self.consistent_filter = false;
        self.echo_path_gain = None;
        self.estimate = None;
    }
}
