//! Float comparison helpers for checking block outputs against reference
//! computations done in the test itself.

use std::fmt;

/// Element-wise difference statistics between two blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDiff {
    pub max_abs_diff: f32,
    pub worst_index: usize,
    pub mismatches: usize,
    pub len: usize,
}

impl fmt::Display for BlockDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_abs_diff={} at index {}, {}/{} samples out of tolerance",
            self.max_abs_diff, self.worst_index, self.mismatches, self.len
        )
    }
}

/// Compares `actual` against `expected` with an absolute tolerance.
pub fn diff_f32(actual: &[f32], expected: &[f32], tolerance: f32) -> BlockDiff {
    assert_eq!(actual.len(), expected.len(), "Length mismatch");
    let mut diff = BlockDiff {
        max_abs_diff: 0.0,
        worst_index: 0,
        mismatches: 0,
        len: actual.len(),
    };
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let d = (a - e).abs();
        if d > diff.max_abs_diff {
            diff.max_abs_diff = d;
            diff.worst_index = i;
        }
        if d > tolerance {
            diff.mismatches += 1;
        }
    }
    diff
}

/// Asserts that two f32 slices agree within an absolute tolerance.
pub fn assert_f32_near(actual: &[f32], expected: &[f32], tolerance: f32) {
    let diff = diff_f32(actual, expected, tolerance);
    assert!(diff.mismatches == 0, "f32 comparison failed: {diff}");
}

/// Sum of squares of `x`, accumulated in f64.
pub fn energy_f64(x: &[f32]) -> f64 {
    x.iter().map(|&v| f64::from(v) * f64::from(v)).sum()
}
