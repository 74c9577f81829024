//! Cascaded biquad (IIR) filter, direct form 1.

/// Coefficients for a single second-order section, with `a[0]` normalized
/// to one and omitted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BiQuadCoefficients {
    pub b: [f32; 3],
    pub a: [f32; 2],
}

#[derive(Debug, Clone)]
struct BiQuad {
    coefficients: BiQuadCoefficients,
    x: [f32; 2],
    y: [f32; 2],
}

impl BiQuad {
    fn new(coefficients: BiQuadCoefficients) -> Self {
        Self {
            coefficients,
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    fn reset(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }

    /// Runs the section over `y` in place.
    fn apply(&mut self, y: &mut [f32]) {
        let [b0, b1, b2] = self.coefficients.b;
        let [a1, a2] = self.coefficients.a;
        let [mut x0, mut x1] = self.x;
        let [mut y0, mut y1] = self.y;
        for v in y.iter_mut() {
            let tmp = *v;
            *v = b0 * tmp + b1 * x0 + b2 * x1 - a1 * y0 - a2 * y1;
            x1 = x0;
            x0 = tmp;
            y1 = y0;
            y0 = *v;
        }
        self.x = [x0, x1];
        self.y = [y0, y1];
    }
}

/// Cascaded biquad filter applying multiple second-order sections in series.
///
/// An empty coefficient list yields a pass-through filter.
#[derive(Debug, Clone)]
pub(crate) struct CascadedBiQuadFilter {
    biquads: Vec<BiQuad>,
}

impl CascadedBiQuadFilter {
    pub(crate) fn new(coefficients: &[BiQuadCoefficients]) -> Self {
        Self {
            biquads: coefficients.iter().map(|c| BiQuad::new(*c)).collect(),
        }
    }

    pub(crate) fn is_pass_through(&self) -> bool {
        self.biquads.is_empty()
    }

    /// Filters `x` into `y` (separate input/output).
    pub(crate) fn process(&mut self, x: &[f32], y: &mut [f32]) {
        debug_assert_eq!(x.len(), y.len());
        y.copy_from_slice(x);
        self.process_in_place(y);
    }

    /// Filters `y` in-place through all stages.
    pub(crate) fn process_in_place(&mut self, y: &mut [f32]) {
        for bq in &mut self.biquads {
            bq.apply(y);
        }
    }

    pub(crate) fn reset(&mut self) {
        for bq in &mut self.biquads {
            bq.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Butterworth high-pass, 1 kHz at 16 kHz.
    const HIGH_PASS: BiQuadCoefficients = BiQuadCoefficients {
        b: [0.757_076_375, -1.514_152_75, 0.757_076_375],
        a: [-1.454_243_59, 0.574_061_915],
    };

    #[test]
    fn empty_cascade_is_pass_through() {
        let mut filter = CascadedBiQuadFilter::new(&[]);
        assert!(filter.is_pass_through());
        let x: Vec<f32> = (0..64).map(|k| k as f32).collect();
        let mut y = vec![0.0; 64];
        filter.process(&x, &mut y);
        assert_eq!(x, y);
    }

    #[test]
    fn high_pass_blocks_dc() {
        let mut filter = CascadedBiQuadFilter::new(&[HIGH_PASS; 2]);
        let mut y = vec![1000.0f32; 64];
        for _ in 0..20 {
            y.fill(1000.0);
            filter.process_in_place(&mut y);
        }
        assert!(y.iter().all(|v| v.abs() < 1.0), "{:?}", &y[..4]);
    }

    #[test]
    fn state_carries_across_calls() {
        let mut split = CascadedBiQuadFilter::new(&[HIGH_PASS]);
        let mut whole = CascadedBiQuadFilter::new(&[HIGH_PASS]);
        let x: Vec<f32> = (0..128).map(|k| (k as f32 * 0.3).sin() * 100.0).collect();

        let mut y_whole = vec![0.0; 128];
        whole.process(&x, &mut y_whole);

        let mut y_split = vec![0.0; 128];
        split.process(&x[..64], &mut y_split[..64]);
        split.process(&x[64..], &mut y_split[64..]);

        assert_eq!(y_whole, y_split);
    }

    #[test]
    fn reset_clears_state() {
        let mut filter = CascadedBiQuadFilter::new(&[HIGH_PASS]);
        let mut first = vec![1.0f32; 16];
        filter.process_in_place(&mut first);
        filter.reset();
        let mut second = vec![1.0f32; 16];
        filter.process_in_place(&mut second);
        assert_eq!(first, second);
    }
}
