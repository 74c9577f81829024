//! Write cursor shared by the ring buffers of the crate.

/// Ring buffer write position. Slot `write` holds the newest entry.
#[derive(Debug, Clone)]
pub(crate) struct RingIndex {
    size: usize,
    write: usize,
}

impl RingIndex {
    pub(crate) fn new(size: usize) -> Self {
        debug_assert!(size > 0);
        Self { size, write: 0 }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Moves the cursor to the slot that receives the next entry.
    pub(crate) fn advance(&mut self) {
        self.write = if self.write < self.size - 1 {
            self.write + 1
        } else {
            0
        };
    }

    /// Slot of the entry written `age` insertions ago; age 0 is the newest.
    pub(crate) fn slot(&self, age: usize) -> usize {
        debug_assert!(age < self.size);
        (self.write + self.size - age) % self.size
    }

    pub(crate) fn reset(&mut self) {
        self.write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_around() {
        let mut index = RingIndex::new(3);
        assert_eq!(index.slot(0), 0);
        index.advance();
        index.advance();
        assert_eq!(index.slot(0), 2);
        index.advance();
        assert_eq!(index.slot(0), 0);
        assert_eq!(index.slot(1), 2);
        assert_eq!(index.slot(2), 1);
    }

    #[test]
    fn reset_returns_to_first_slot() {
        let mut index = RingIndex::new(4);
        index.advance();
        index.reset();
        assert_eq!(index.slot(0), 0);
        assert_eq!(index.size(), 4);
    }
}
