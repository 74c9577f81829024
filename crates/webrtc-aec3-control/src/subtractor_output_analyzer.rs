//! Convergence and divergence analysis of the subtractor's linear filters.

use crate::common::BLOCK_SIZE;
use crate::subtractor_output::SubtractorOutput;

/// Capture energy above which the convergence ratios are trusted.
const CONVERGENCE_THRESHOLD: f32 = 2500.0 * BLOCK_SIZE as f32;
/// Lower capture energy limit for the relaxed coarse filter test.
const CONVERGENCE_THRESHOLD_LOW_LEVEL: f32 = 400.0 * BLOCK_SIZE as f32;
/// Capture energy above which divergence is trusted.
const DIVERGENCE_THRESHOLD: f32 = 900.0 * BLOCK_SIZE as f32;
const SMOOTHING: f32 = 0.4;

/// Aggregated convergence flags for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtractorAnalysis {
    pub any_filter_converged: bool,
    pub any_coarse_filter_converged: bool,
    pub all_filters_diverged: bool,
}

#[derive(Debug)]
pub struct SubtractorOutputAnalyzer {
    smooth_energies: bool,
    filters_converged: Vec<bool>,
    smoothed_y2: Vec<f32>,
    smoothed_e2_refined: Vec<f32>,
    smoothed_e2_coarse: Vec<f32>,
}

impl SubtractorOutputAnalyzer {
    pub fn new(num_capture_channels: usize, smooth_energies: bool) -> Self {
        debug_assert!(num_capture_channels > 0);
        Self {
            smooth_energies,
            filters_converged: vec![false; num_capture_channels],
            smoothed_y2: vec![0.0; num_capture_channels],
            smoothed_e2_refined: vec![0.0; num_capture_channels],
            smoothed_e2_coarse: vec![0.0; num_capture_channels],
        }
    }

    /// Analyzes one block of subtractor output, one entry per capture channel.
    pub fn update(&mut self, subtractor_output: &[SubtractorOutput]) -> SubtractorAnalysis {
        debug_assert_eq!(subtractor_output.len(), self.filters_converged.len());

        let mut analysis = SubtractorAnalysis {
            all_filters_diverged: true,
            ..SubtractorAnalysis::default()
        };

        for (ch, output) in subtractor_output.iter().enumerate() {
            let (y2, e2_refined, e2_coarse) = (output.y2, output.e2_refined, output.e2_coarse);

            if self.smooth_energies {
                self.smoothed_y2[ch] += SMOOTHING * (y2 - self.smoothed_y2[ch]);
                self.smoothed_e2_refined[ch] += SMOOTHING * (e2_refined - self.smoothed_e2_refined[ch]);
                self.smoothed_e2_coarse[ch] += SMOOTHING * (e2_coarse - self.smoothed_e2_coarse[ch]);
            } else {
                self.smoothed_y2[ch] = y2;
                self.smoothed_e2_refined[ch] = e2_refined;
                self.smoothed_e2_coarse[ch] = e2_coarse;
            }
            let s_y2 = self.smoothed_y2[ch];

            let refined_filter_converged =
                self.smoothed_e2_refined[ch] < 0.5 * s_y2 && s_y2 > CONVERGENCE_THRESHOLD;
            let coarse_filter_converged_strict =
                self.smoothed_e2_coarse[ch] < 0.05 * s_y2 && s_y2 > CONVERGENCE_THRESHOLD;
            let coarse_filter_converged_relaxed =
                e2_coarse < 0.2 * y2 && y2 > CONVERGENCE_THRESHOLD_LOW_LEVEL;
            let filter_diverged =
                e2_refined.min(e2_coarse) > 1.5 * y2 && y2 > DIVERGENCE_THRESHOLD;

            self.filters_converged[ch] = refined_filter_converged || coarse_filter_converged_strict;

            analysis.any_filter_converged |= self.filters_converged[ch];
            analysis.any_coarse_filter_converged |= coarse_filter_converged_relaxed;
            analysis.all_filters_diverged &= filter_diverged;
        }

        analysis
    }

    pub fn converged_filters(&self) -> &[bool] {
        &self.filters_converged
    }

    /// Forgets the convergence flags. The smoothed energies are kept.
    pub fn handle_echo_path_change(&mut self) {
        self.filters_converged.fill(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;
    use webrtc_aec3_proptest::generators::{FilterEnergies, filter_energies};

    const CONVERGED: SubtractorOutput = SubtractorOutput {
        y2: 200_000.0,
        e2_refined: 10_000.0,
        e2_coarse: 200_000.0,
    };
    const SILENT: SubtractorOutput = SubtractorOutput {
        y2: 0.0,
        e2_refined: 0.0,
        e2_coarse: 0.0,
    };

    fn to_outputs(energies: &[FilterEnergies]) -> Vec<SubtractorOutput> {
        energies
            .iter()
            .map(|e| SubtractorOutput::new(e.y2, e.e2_refined, e.e2_coarse))
            .collect()
    }

    #[test]
    fn initial_state_not_converged() {
        let analyzer = SubtractorOutputAnalyzer::new(2, false);
        assert!(analyzer.converged_filters().iter().all(|&c| !c));
    }

    #[test]
    fn refined_convergence() {
        let mut analyzer = SubtractorOutputAnalyzer::new(1, false);
        let analysis = analyzer.update(&[CONVERGED]);
        assert!(analysis.any_filter_converged);
        assert!(!analysis.any_coarse_filter_converged);
        assert!(!analysis.all_filters_diverged);
        assert!(analyzer.converged_filters()[0]);
    }

    #[test]
    fn low_capture_level_is_not_converged() {
        let mut analyzer = SubtractorOutputAnalyzer::new(1, false);
        let analysis = analyzer.update(&[SubtractorOutput::new(CONVERGENCE_THRESHOLD, 0.0, 0.0)]);
        assert!(!analysis.any_filter_converged);
        // The relaxed coarse test uses the lower threshold.
        assert!(analysis.any_coarse_filter_converged);
    }

    #[test]
    fn strict_and_relaxed_coarse_convergence() {
        let mut analyzer = SubtractorOutputAnalyzer::new(1, false);
        // 0.1 * y2 passes the relaxed ratio but not the strict one.
        let analysis = analyzer.update(&[SubtractorOutput::new(200_000.0, 200_000.0, 20_000.0)]);
        assert!(!analysis.any_filter_converged);
        assert!(analysis.any_coarse_filter_converged);

        let analysis = analyzer.update(&[SubtractorOutput::new(200_000.0, 200_000.0, 9_000.0)]);
        assert!(analysis.any_filter_converged);
    }

    #[test]
    fn divergence_detection() {
        let mut analyzer = SubtractorOutputAnalyzer::new(1, false);
        let analysis = analyzer.update(&[SubtractorOutput::new(100_000.0, 200_000.0, 200_000.0)]);
        assert!(analysis.all_filters_diverged);

        // One good filter is enough to not be diverged.
        let analysis = analyzer.update(&[SubtractorOutput::new(100_000.0, 200_000.0, 100_000.0)]);
        assert!(!analysis.all_filters_diverged);
    }

    #[test]
    fn divergence_requires_all_channels() {
        let mut analyzer = SubtractorOutputAnalyzer::new(2, false);
        let diverged = SubtractorOutput::new(100_000.0, 200_000.0, 200_000.0);
        assert!(analyzer.update(&[diverged, diverged]).all_filters_diverged);
        assert!(!analyzer.update(&[diverged, SILENT]).all_filters_diverged);
    }

    #[test]
    fn smoothing_delays_convergence() {
        let mut analyzer = SubtractorOutputAnalyzer::new(1, true);
        // 0.4 * y2 is below the convergence threshold on the first block.
        assert!(!analyzer.update(&[CONVERGED]).any_filter_converged);
        let mut converged = false;
        for _ in 0..10 {
            converged = analyzer.update(&[CONVERGED]).any_filter_converged;
        }
        assert!(converged);
    }

    #[test]
    fn echo_path_change_matches_fresh_instance_without_smoothing() {
        let mut analyzer = SubtractorOutputAnalyzer::new(2, false);
        analyzer.update(&[CONVERGED, SILENT]);
        assert!(analyzer.converged_filters()[0]);

        analyzer.handle_echo_path_change();
        assert!(analyzer.converged_filters().iter().all(|&c| !c));

        let mut fresh = SubtractorOutputAnalyzer::new(2, false);
        for outputs in [[SILENT, CONVERGED], [CONVERGED, CONVERGED]] {
            assert_eq!(analyzer.update(&outputs), fresh.update(&outputs));
            assert_eq!(analyzer.converged_filters(), fresh.converged_filters());
        }
    }

    #[test]
    fn echo_path_change_keeps_smoothing_state() {
        let mut analyzer = SubtractorOutputAnalyzer::new(1, true);
        for _ in 0..20 {
            analyzer.update(&[CONVERGED]);
        }
        analyzer.handle_echo_path_change();
        assert!(!analyzer.converged_filters()[0]);

        let mut fresh = SubtractorOutputAnalyzer::new(1, true);
        assert!(analyzer.update(&[CONVERGED]).any_filter_converged);
        assert!(!fresh.update(&[CONVERGED]).any_filter_converged);
    }

    #[proptest]
    fn unsmoothed_flags_follow_raw_energies(
        #[strategy(filter_energies(4))] energies: Vec<FilterEnergies>,
    ) {
        let outputs = to_outputs(&energies);
        let mut analyzer = SubtractorOutputAnalyzer::new(outputs.len(), false);
        let analysis = analyzer.update(&outputs);

        let converged: Vec<bool> = outputs
            .iter()
            .map(|o| {
                o.y2 > CONVERGENCE_THRESHOLD
                    && (o.e2_refined < 0.5 * o.y2 || o.e2_coarse < 0.05 * o.y2)
            })
            .collect();
        assert_eq!(analyzer.converged_filters(), converged.as_slice());
        assert_eq!(analysis.any_filter_converged, converged.iter().any(|&c| c));
        assert_eq!(
            analysis.all_filters_diverged,
            outputs
                .iter()
                .all(|o| o.e2_refined.min(o.e2_coarse) > 1.5 * o.y2 && o.y2 > DIVERGENCE_THRESHOLD)
        );
    }
}
