//! Adaptive echo path filter used by the refined delay search.
//!
//! The filter works on a chronological window of render samples: for an
//! output of `n` samples and a filter of `l` taps the window holds
//! `l + n - 1` samples and ends with the sample aligned to the last output.

/// Capability of a linear adaptive filter over a render history window.
pub trait AdaptiveFilter: Send {
    /// Number of taps.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Predicts `y_hat` from the render window `x`.
    fn filter(&self, x: &[f32], y_hat: &mut [f32]);

    /// Adapts the coefficients towards reducing the prediction error `e`,
    /// which was obtained by filtering the same window `x`.
    fn adapt(&mut self, x: &[f32], e: &[f32]);

    /// Current time-domain impulse response.
    fn impulse_response(&self) -> &[f32];

    fn reset(&mut self);
}

/// Block normalized least-mean-squares filter.
///
/// `h[k] += mu * sum_n(e[n] * x[n - k]) / (|x|^2 + regularization)`,
/// where `|x|^2` is the energy of the whole render window.
#[derive(Debug, Clone)]
pub struct NlmsFilter {
    h: Vec<f32>,
    step_size: f32,
    regularization: f32,
}

impl NlmsFilter {
    pub fn new(num_taps: usize, step_size: f32, regularization: f32) -> Self {
        debug_assert!(num_taps > 0);
        Self {
            h: vec![0.0; num_taps],
            step_size,
            regularization,
        }
    }
}

impl AdaptiveFilter for NlmsFilter {
    fn len(&self) -> usize {
        self.h.len()
    }

    fn filter(&self, x: &[f32], y_hat: &mut [f32]) {
        let taps = self.h.len();
        debug_assert_eq!(x.len(), taps + y_hat.len() - 1);
        for (n, y) in y_hat.iter_mut().enumerate() {
            // x[n + taps - 1] is aligned with y[n]; h[k] pairs with x[n + taps - 1 - k].
            let window = &x[n..n + taps];
            *y = self
                .h
                .iter()
                .zip(window.iter().rev())
                .map(|(&h, &x)| h * x)
                .sum();
        }
    }

    fn adapt(&mut self, x: &[f32], e: &[f32]) {
        let taps = self.h.len();
        debug_assert_eq!(x.len(), taps + e.len() - 1);

        let x2: f32 = x.iter().map(|&v| v * v).sum();
        let gain = self.step_size / (x2 + self.regularization);
        for (n, &e_n) in e.iter().enumerate() {
            let scaled = gain * e_n;
            let window = &x[n..n + taps];
            for (h, &x) in self.h.iter_mut().zip(window.iter().rev()) {
                *h += scaled * x;
            }
        }
    }

    fn impulse_response(&self) -> &[f32] {
        &self.h
    }

    fn reset(&mut self) {
        self.h.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc_aec3_proptest::generators::TestNoise;

    /// Runs the filter against an echo path that is a pure delay with gain.
    fn identify_delay(taps: usize, block: usize, delay: usize, gain: f32) -> NlmsFilter {
        let mut filter = NlmsFilter::new(taps, 0.5, 1.0);
        let mut noise = TestNoise::new(7);
        let total = taps + block - 1;
        let mut signal = vec![0.0f32; total];
        let mut y_hat = vec![0.0f32; block];
        let mut e = vec![0.0f32; block];

        for _ in 0..400 {
            signal.copy_within(block.., 0);
            noise.fill(&mut signal[total - block..], 1000.0);
            filter.filter(&signal, &mut y_hat);
            for n in 0..block {
                let y = gain * signal[taps - 1 + n - delay];
                e[n] = y - y_hat[n];
            }
            filter.adapt(&signal, &e);
        }
        filter
    }

    #[test]
    fn filter_applies_impulse_response() {
        let mut filter = NlmsFilter::new(3, 0.5, 1.0);
        filter.h = vec![0.0, 2.0, 0.0];
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y_hat = [0.0; 2];
        filter.filter(&x, &mut y_hat);
        // Output n sees x[n + 2 - 1].
        assert_eq!(y_hat, [4.0, 6.0]);
    }

    #[test]
    fn converges_to_delayed_echo_path() {
        let filter = identify_delay(48, 16, 21, 0.5);
        let h = filter.impulse_response();
        let peak = h
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(21));
        assert!((h[21] - 0.5).abs() < 0.05, "h[21] = {}", h[21]);
    }

    #[test]
    fn silent_render_does_not_adapt() {
        let mut filter = NlmsFilter::new(8, 0.5, 1.0);
        filter.adapt(&[0.0; 11], &[100.0; 4]);
        assert!(filter.impulse_response().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn reset_clears_coefficients() {
        let mut filter = identify_delay(16, 4, 3, 1.0);
        assert!(filter.impulse_response().iter().any(|&h| h != 0.0));
        filter.reset();
        assert!(filter.impulse_response().iter().all(|&h| h == 0.0));
        assert_eq!(filter.len(), 16);
    }
}
