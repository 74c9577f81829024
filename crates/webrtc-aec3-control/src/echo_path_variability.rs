//! Description of a change in the echo path reported by the audio pipeline.

/// How the render-to-capture alignment changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DelayAdjustment {
    #[default]
    None,
    /// The render buffer was flushed and refilled.
    BufferFlush,
    /// A new delay was detected and applied.
    NewDetectedDelay,
}

/// Echo path change signalled to [`EchoControl`](crate::EchoControl).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoPathVariability {
    /// The analog or digital gain in the echo path changed.
    pub gain_change: bool,
    pub delay_change: DelayAdjustment,
    pub clock_drift: bool,
}

impl EchoPathVariability {
    pub fn new(gain_change: bool, delay_change: DelayAdjustment, clock_drift: bool) -> Self {
        Self {
            gain_change,
            delay_change,
            clock_drift,
        }
    }

    pub fn delay_changed(&self) -> bool {
        self.delay_change != DelayAdjustment::None
    }

    /// Whether the gain or the delay of the echo path changed.
    pub fn audio_path_changed(&self) -> bool {
        self.gain_change || self.delay_changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_path_changed_on_gain_or_delay() {
        let cases = [
            (true, DelayAdjustment::NewDetectedDelay, true),
            (true, DelayAdjustment::None, true),
            (false, DelayAdjustment::BufferFlush, true),
            (false, DelayAdjustment::None, false),
        ];
        for (gain_change, delay_change, expected) in cases {
            let v = EchoPathVariability::new(gain_change, delay_change, false);
            assert_eq!(v.audio_path_changed(), expected, "{v:?}");
            assert_eq!(v.delay_changed(), delay_change != DelayAdjustment::None);
        }
    }

    #[test]
    fn clock_drift_alone_is_not_a_path_change() {
        let v = EchoPathVariability::new(false, DelayAdjustment::None, true);
        assert!(v.clock_drift);
        assert!(!v.audio_path_changed());
        assert_eq!(EchoPathVariability::default().delay_change, DelayAdjustment::None);
    }
}
