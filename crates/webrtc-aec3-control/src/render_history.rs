//! History of mono render blocks at full and decimated rate.

use crate::circular_buffer::RingIndex;
use crate::common::BLOCK_SIZE;

/// Ring buffer of the mixed render signal.
///
/// Each insertion stores one full-rate block together with its decimated
/// sub-block. Delays are counted in blocks back from the newest insertion.
#[derive(Debug)]
pub struct RenderHistory {
    index: RingIndex,
    sub_block_size: usize,
    blocks: Vec<[f32; BLOCK_SIZE]>,
    sub_blocks: Vec<f32>,
}

impl RenderHistory {
    pub fn new(num_blocks: usize, sub_block_size: usize) -> Self {
        debug_assert!(num_blocks > 0);
        debug_assert!(sub_block_size > 0 && sub_block_size <= BLOCK_SIZE);
        Self {
            index: RingIndex::new(num_blocks),
            sub_block_size,
            blocks: vec![[0.0; BLOCK_SIZE]; num_blocks],
            sub_blocks: vec![0.0; num_blocks * sub_block_size],
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.index.size()
    }

    pub fn sub_block_size(&self) -> usize {
        self.sub_block_size
    }

    /// Appends a full-rate block and its decimated counterpart.
    pub fn insert(&mut self, block: &[f32; BLOCK_SIZE], sub_block: &[f32]) {
        debug_assert_eq!(sub_block.len(), self.sub_block_size);
        self.index.advance();
        let slot = self.index.slot(0);
        self.blocks[slot] = *block;
        self.sub_blocks[slot * self.sub_block_size..(slot + 1) * self.sub_block_size]
            .copy_from_slice(sub_block);
    }

    /// Full-rate block inserted `delay` blocks ago.
    pub fn block(&self, delay: usize) -> &[f32; BLOCK_SIZE] {
        &self.blocks[self.index.slot(delay)]
    }

    /// Decimated sub-block inserted `delay` blocks ago.
    pub fn sub_block(&self, delay: usize) -> &[f32] {
        let slot = self.index.slot(delay);
        &self.sub_blocks[slot * self.sub_block_size..(slot + 1) * self.sub_block_size]
    }

    /// Copies the newest `out.len()` decimated samples, oldest first.
    pub fn copy_recent(&self, out: &mut [f32]) {
        let len = out.len();
        debug_assert!(len <= self.sub_blocks.len());
        for (i, sample) in out.iter_mut().enumerate() {
            let age = len - 1 - i;
            let sub_block = self.sub_block(age / self.sub_block_size);
            *sample = sub_block[self.sub_block_size - 1 - age % self.sub_block_size];
        }
    }

    pub fn reset(&mut self) {
        self.index.reset();
        self.blocks.iter_mut().for_each(|b| b.fill(0.0));
        self.sub_blocks.fill(0.0);
    }
}
