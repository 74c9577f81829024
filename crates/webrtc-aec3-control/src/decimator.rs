//! Signal decimator with anti-aliasing and noise reduction filtering.
//!
//! Produces the reduced-rate view of a 64-sample block that the delay search
//! runs on. The band-pass configurations rely on band-pass sampling: the
//! selected band folds down into the baseband of the decimated signal.

use crate::cascaded_biquad_filter::{BiQuadCoefficients, CascadedBiQuadFilter};
use crate::common::{BLOCK_SIZE, valid_down_sampling_factor};

// signal.butter(2, 3400/8000.0, 'lowpass', output='sos'), repeated 3 times.
const LOW_PASS_FILTER_DS2: [BiQuadCoefficients; 3] = [BiQuadCoefficients {
    b: [0.227_117_96, 0.454_235_93, 0.227_117_96],
    a: [-0.276_664_62, 0.185_136_47],
}; 3];

// signal.ellip(6, 1, 40, 1800/8000, 'lowpass', output='sos')
const LOW_PASS_FILTER_DS4: [BiQuadCoefficients; 3] = [
    BiQuadCoefficients {
        b: [0.018_091_987_7, 0.003_209_613_63, 0.018_091_987_7],
        a: [-1.518_319_5, 0.633_165_865],
    },
    BiQuadCoefficients {
        b: [1.0, -1.245_504_59, 1.0],
        a: [-1.497_842_54, 0.853_586_692],
    },
    BiQuadCoefficients {
        b: [1.0, -1.422_168_1, 1.0],
        a: [-1.497_912_82, 0.969_572_384],
    },
];

// signal.cheby1(1, 6, [1000/8000, 2000/8000], 'bandpass', output='sos')
// repeated 5 times.
const BAND_PASS_FILTER_DS8: [BiQuadCoefficients; 5] = [BiQuadCoefficients {
    b: [0.103_304_783, 0.0, -0.103_304_783],
    a: [-1.520_363, 0.793_390_435],
}; 5];

// Constant peak gain band-pass centred at sqrt(1000 * 1500) Hz with a 500 Hz
// bandwidth, repeated 5 times. The band lies in a single 500 Hz alias zone
// above the high-pass cutoff.
const BAND_PASS_FILTER_DS16: [BiQuadCoefficients; 5] = [BiQuadCoefficients {
    b: [0.086_285_16, 0.0, -0.086_285_16],
    a: [-1.620_113_2, 0.827_429_7],
}; 5];

// signal.butter(2, 1000/8000.0, 'highpass', output='sos')
const HIGH_PASS_FILTER: [BiQuadCoefficients; 1] = [BiQuadCoefficients {
    b: [0.757_076_375, -1.514_152_75, 0.757_076_375],
    a: [-1.454_243_59, 0.574_061_915],
}];

/// Downsamples a 64-sample block by a factor of 2, 4, 8 or 16.
#[derive(Debug)]
pub struct Decimator {
    down_sampling_factor: usize,
    anti_aliasing_filter: CascadedBiQuadFilter,
    noise_reduction_filter: CascadedBiQuadFilter,
}

impl Decimator {
    pub fn new(down_sampling_factor: usize) -> Self {
        debug_assert!(
            valid_down_sampling_factor(down_sampling_factor),
            "unsupported down-sampling factor {down_sampling_factor}"
        );
        let anti_aliasing: &[BiQuadCoefficients] = match down_sampling_factor {
            2 => &LOW_PASS_FILTER_DS2,
            8 => &BAND_PASS_FILTER_DS8,
            16 => &BAND_PASS_FILTER_DS16,
            _ => &LOW_PASS_FILTER_DS4,
        };
        // The factor 8 band-pass already removes the low-frequency noise.
        let noise_reduction: &[BiQuadCoefficients] = match down_sampling_factor {
            8 => &[],
            _ => &HIGH_PASS_FILTER,
        };
        Self {
            down_sampling_factor,
            anti_aliasing_filter: CascadedBiQuadFilter::new(anti_aliasing),
            noise_reduction_filter: CascadedBiQuadFilter::new(noise_reduction),
        }
    }

    pub fn down_sampling_factor(&self) -> usize {
        self.down_sampling_factor
    }

    /// Number of samples produced per call.
    pub fn sub_block_size(&self) -> usize {
        BLOCK_SIZE / self.down_sampling_factor
    }

    /// Decimates a `BLOCK_SIZE`-sample input into an output of
    /// `BLOCK_SIZE / down_sampling_factor` samples.
    pub fn decimate(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(BLOCK_SIZE, input.len());
        debug_assert_eq!(self.sub_block_size(), output.len());

        let mut x = [0.0f32; BLOCK_SIZE];
        self.anti_aliasing_filter.process(input, &mut x);
        self.noise_reduction_filter.process_in_place(&mut x);

        for (out, sample) in output
            .iter_mut()
            .zip(x.iter().step_by(self.down_sampling_factor))
        {
            *out = *sample;
        }
    }

    /// Clears the filter states.
    pub fn reset(&mut self) {
        self.anti_aliasing_filter.reset();
        self.noise_reduction_filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SUPPORTED_DOWN_SAMPLING_FACTORS;
    use std::f32::consts::PI;
    use test_strategy::proptest;
    use webrtc_aec3_proptest::generators::{DownSamplingFactor, render_block};

    const NUM_STARTUP_BLOCKS: usize = 50;
    const NUM_BLOCKS: usize = 1000;

    fn produce_decimated_sinusoidal_output_power(
        sample_rate_hz: f32,
        down_sampling_factor: usize,
        sinusoidal_frequency_hz: f32,
    ) -> (f32, f32) {
        let total_samples = BLOCK_SIZE * NUM_BLOCKS;
        let sub_block_size = BLOCK_SIZE / down_sampling_factor;

        let input: Vec<f32> = (0..total_samples)
            .map(|k| {
                32767.0 * (2.0 * PI * sinusoidal_frequency_hz * k as f32 / sample_rate_hz).sin()
            })
            .collect();

        let mut decimator = Decimator::new(down_sampling_factor);
        let mut output = vec![0.0f32; sub_block_size * NUM_BLOCKS];

        for (k, sub_block) in output.chunks_exact_mut(sub_block_size).enumerate() {
            decimator.decimate(&input[k * BLOCK_SIZE..(k + 1) * BLOCK_SIZE], sub_block);
        }

        let input_eval = &input[NUM_STARTUP_BLOCKS * BLOCK_SIZE..];
        let output_eval = &output[NUM_STARTUP_BLOCKS * sub_block_size..];

        let input_power: f32 =
            input_eval.iter().map(|x| x * x).sum::<f32>() / input_eval.len() as f32;
        let output_power: f32 =
            output_eval.iter().map(|x| x * x).sum::<f32>() / output_eval.len() as f32;

        (input_power, output_power)
    }

    #[test]
    fn no_leakage_from_upper_frequencies() {
        for &rate in &[16000, 32000, 48000] {
            for dsf in SUPPORTED_DOWN_SAMPLING_FACTORS {
                let freq = 3.0 / 8.0 * rate as f32;
                let (input_power, output_power) =
                    produce_decimated_sinusoidal_output_power(rate as f32, dsf, freq);
                assert!(
                    output_power < 0.0001 * input_power,
                    "rate={rate}, dsf={dsf}: output_power={output_power}, \
                     input_power={input_power}, ratio={}",
                    output_power / input_power
                );
            }
        }
    }

    #[test]
    fn passband_tone_is_retained() {
        for (dsf, freq) in [(2, 2000.0), (4, 1500.0), (8, 1414.0), (16, 1225.0)] {
            let (input_power, output_power) =
                produce_decimated_sinusoidal_output_power(16000.0, dsf, freq);
            assert!(
                output_power > 0.5 * input_power,
                "dsf={dsf}: output_power={output_power}, input_power={input_power}"
            );
        }
    }

    #[test]
    fn noise_reduction_skipped_only_for_factor_8() {
        for dsf in SUPPORTED_DOWN_SAMPLING_FACTORS {
            let decimator = Decimator::new(dsf);
            assert_eq!(
                decimator.noise_reduction_filter.is_pass_through(),
                dsf == 8,
                "dsf={dsf}"
            );
        }
    }

    #[test]
    fn factor_16_rejects_low_band() {
        // Below the high-pass cutoff and outside the band-pass.
        for freq in [300.0, 750.0] {
            let (input_power, output_power) =
                produce_decimated_sinusoidal_output_power(16000.0, 16, freq);
            assert!(
                output_power < 0.001 * input_power,
                "freq={freq}: ratio={}",
                output_power / input_power
            );
        }
    }

    #[proptest]
    fn output_length_matches_factor(
        factor: DownSamplingFactor,
        #[strategy(render_block(32000.0))] block: Vec<f32>,
    ) {
        let mut decimator = Decimator::new(factor.value());
        let mut out = vec![0.0f32; BLOCK_SIZE / factor.value()];
        decimator.decimate(&block, &mut out);
        assert_eq!(out.len(), decimator.sub_block_size());
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn reset_restores_initial_response() {
        let input: Vec<f32> = (0..BLOCK_SIZE).map(|k| (k as f32 * 0.7).sin() * 1000.0).collect();
        let mut decimator = Decimator::new(4);
        let mut first = [0.0f32; BLOCK_SIZE / 4];
        decimator.decimate(&input, &mut first);
        let mut scratch = [0.0f32; BLOCK_SIZE / 4];
        decimator.decimate(&input, &mut scratch);
        decimator.reset();
        let mut again = [0.0f32; BLOCK_SIZE / 4];
        decimator.decimate(&input, &mut again);
        assert_eq!(first, again);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn wrong_output_size_is_a_contract_violation() {
        let mut decimator = Decimator::new(4);
        let input = [0.0f32; BLOCK_SIZE];
        let mut out = [0.0f32; BLOCK_SIZE / 4 - 1];
        decimator.decimate(&input, &mut out);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn wrong_input_size_is_a_contract_violation() {
        let mut decimator = Decimator::new(8);
        let input = [0.0f32; BLOCK_SIZE - 1];
        let mut out = [0.0f32; BLOCK_SIZE / 8];
        decimator.decimate(&input, &mut out);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn unsupported_factor_is_a_contract_violation() {
        let _ = Decimator::new(3);
    }
}
