//! Echo path delay estimate reported by the delay search.

/// How the delay was obtained.
///
/// The refined delay estimator only produces `Refined` estimates. `Coarse`
/// marks delays that a caller obtains elsewhere, such as from a render
/// buffer correlation search, and passes to
/// [`EchoPathStrengthDetector::update`](crate::EchoPathStrengthDetector::update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayEstimateQuality {
    /// From a correlation search on the decimated signals only.
    Coarse,
    /// Confirmed by a consistent adaptive filter impulse response.
    Refined,
}

/// A delay, in blocks, together with its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayEstimate {
    pub quality: DelayEstimateQuality,
    pub delay: usize,
    pub blocks_since_last_change: usize,
    pub blocks_since_last_update: usize,
}

impl DelayEstimate {
    pub fn new(quality: DelayEstimateQuality, delay: usize) -> Self {
        Self {
            quality,
            delay,
            blocks_since_last_change: 0,
            blocks_since_last_update: 0,
        }
    }

    /// Records a new observation of the delay, restarting the change
    /// counter only when the value moved.
    pub(crate) fn observe(&mut self, delay: usize) {
        if delay == self.delay {
            self.blocks_since_last_change = self.blocks_since_last_change.saturating_add(1);
        } else {
            self.delay = delay;
            self.blocks_since_last_change = 0;
        }
        self.blocks_since_last_update = 0;
    }

    /// Ages the estimate by one block without a new observation.
    pub(crate) fn age(&mut self) {
        self.blocks_since_last_update = self.blocks_since_last_update.saturating_add(1);
        self.blocks_since_last_change = self.blocks_since_last_change.saturating_add(1);
    }
}
