//! Bump allocator with checkpoint/rewind over one owned buffer.
//!
//! Blocks are carved sequentially and never freed one by one. The only way to
//! reclaim space is [`Arena::reset`] or [`Arena::rewind`], and both take
//! `&mut self`: every block handed out borrows the arena, so the borrow
//! checker refuses a rewind while any block is still in use.

use std::cell::{Cell, UnsafeCell};
use std::mem;
use std::slice;

use log::trace;

use crate::error::{NnError, Result};

/// Allocation granularity in bytes. One word holds one matrix cell.
pub const WORD_SIZE: usize = mem::size_of::<f64>();

pub struct Arena {
    buf: Box<[UnsafeCell<f64>]>,
    /// Bump cursor, in words.
    offset: Cell<usize>,
}

impl Arena {
    /// Creates an arena able to hold `capacity_bytes`, rounded up to whole words.
    pub fn new(capacity_bytes: usize) -> Arena {
        let words = capacity_bytes.div_ceil(WORD_SIZE);
        let buf = (0..words).map(|_| UnsafeCell::new(0.0)).collect();
        Arena {
            buf,
            offset: Cell::new(0),
        }
    }

    /// Hands out a zeroed block of `count` words.
    ///
    /// Returns [`NnError::OutOfMemory`] if the block does not fit; the cursor
    /// is left untouched in that case.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate(&self, count: usize) -> Result<&mut [f64]> {
        let start = self.offset.get();
        let end = match start.checked_add(count) {
            Some(end) if end <= self.buf.len() => end,
            _ => {
                return Err(NnError::OutOfMemory {
                    requested: count.saturating_mul(WORD_SIZE),
                    remaining: self.remaining_bytes(),
                })
            }
        };
        self.offset.set(end);
        trace!("arena: allocated {count} words at word {start}, {end}/{} in use", self.buf.len());

        // SAFETY: `[start, end)` is in bounds and lies past every block handed
        // out since the cursor last moved backwards. The cursor only moves
        // backwards through `reset`/`rewind`, which need `&mut self`, so no
        // earlier block overlapping this range can still be borrowed.
        let block = unsafe {
            let base = UnsafeCell::raw_get(self.buf.as_ptr());
            slice::from_raw_parts_mut(base.add(start), count)
        };
        block.fill(0.0);
        Ok(block)
    }

    /// Like [`Arena::allocate`] but sized in bytes, rounded up to whole words.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_bytes(&self, bytes: usize) -> Result<&mut [f64]> {
        self.allocate(bytes.div_ceil(WORD_SIZE))
    }

    /// Forgets every allocation.
    pub fn reset(&mut self) {
        trace!("arena: reset from {} bytes", self.occupied_bytes());
        self.offset.set(0);
    }

    /// Current offset in bytes, usable as a checkpoint for [`Arena::rewind`].
    pub fn save(&self) -> usize {
        self.occupied_bytes()
    }

    /// Restores the cursor to `checkpoint`, invalidating everything allocated since.
    ///
    /// # Panics
    /// Panics if `checkpoint` lies past the current offset or is not word aligned.
    pub fn rewind(&mut self, checkpoint: usize) {
        assert!(
            checkpoint <= self.occupied_bytes(),
            "cannot rewind arena forward: checkpoint {checkpoint}, occupied {}",
            self.occupied_bytes()
        );
        assert_eq!(checkpoint % WORD_SIZE, 0, "checkpoint {checkpoint} is not word aligned");
        trace!("arena: rewind {} -> {checkpoint} bytes", self.occupied_bytes());
        self.offset.set(checkpoint / WORD_SIZE);
    }

    /// Runs `f` against the arena and rewinds to the offset it started from.
    ///
    /// This is the supported way to bound the memory taken by gradient
    /// networks across repeated training steps.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&Arena) -> R) -> R {
        let checkpoint = self.save();
        let result = f(self);
        self.rewind(checkpoint);
        result
    }

    pub fn capacity_bytes(&self) -> usize {
        self.buf.len() * WORD_SIZE
    }

    pub fn occupied_bytes(&self) -> usize {
        self.offset.get() * WORD_SIZE
    }

    pub fn remaining_bytes(&self) -> usize {
        self.capacity_bytes() - self.occupied_bytes()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity_bytes", &self.capacity_bytes())
            .field("occupied_bytes", &self.occupied_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rounds_up_to_whole_words() {
        let arena = Arena::new(17);
        assert_eq!(arena.capacity_bytes(), 24);
        assert_eq!(arena.occupied_bytes(), 0);
    }

    #[test]
    fn allocations_are_sequential_and_zeroed() {
        let arena = Arena::new(64);
        let a = arena.allocate(2).unwrap();
        a.fill(7.0);
        let b = arena.allocate_bytes(10).unwrap();
        assert_eq!(b.len(), 2);
        assert!(b.iter().all(|&x| x == 0.0));
        assert_eq!(arena.occupied_bytes(), 32);
        assert_eq!(a.to_vec(), vec![7.0, 7.0]);
    }

    #[test]
    fn exhaustion_is_an_error_and_leaves_cursor_alone() {
        let arena = Arena::new(32);
        arena.allocate(3).unwrap();
        match arena.allocate(2) {
            Err(NnError::OutOfMemory { requested, remaining }) => {
                assert_eq!(requested, 16);
                assert_eq!(remaining, 8);
            }
            other => panic!("expected OutOfMemory, got {other:?}"),
        }
        assert_eq!(arena.occupied_bytes(), 24);
        assert!(arena.allocate(1).is_ok());
    }

    #[test]
    fn rewind_reuses_the_same_offset() {
        let mut arena = Arena::new(256);
        arena.allocate(4).unwrap();
        let checkpoint = arena.save();
        let first = arena.allocate(5).unwrap().as_ptr() as usize;
        arena.allocate(3).unwrap();

        arena.rewind(checkpoint);
        assert_eq!(arena.occupied_bytes(), checkpoint);

        let again = arena.allocate(5).unwrap();
        assert_eq!(again.as_ptr() as usize, first);
        assert!(again.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn reset_empties_the_arena() {
        let mut arena = Arena::new(64);
        arena.allocate(8).unwrap();
        assert_eq!(arena.remaining_bytes(), 0);
        arena.reset();
        assert_eq!(arena.occupied_bytes(), 0);
        assert_eq!(arena.remaining_bytes(), 64);
    }

    #[test]
    fn scoped_restores_the_offset() {
        let mut arena = Arena::new(128);
        arena.allocate(2).unwrap();
        let len = arena.scoped(|scratch| scratch.allocate(6).map(|block| block.len()));
        assert_eq!(len.unwrap(), 6);
        assert_eq!(arena.occupied_bytes(), 16);
    }

    #[test]
    #[should_panic(expected = "cannot rewind arena forward")]
    fn rewinding_forward_panics() {
        let mut arena = Arena::new(64);
        arena.rewind(8);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn rewind_then_allocate_starts_at_checkpoint(
                before in proptest::collection::vec(0usize..16, 0..8),
                after in proptest::collection::vec(0usize..16, 1..8),
            ) {
                let mut arena = Arena::new(4096);
                for &count in &before {
                    arena.allocate(count).unwrap();
                }
                let checkpoint = arena.save();
                let start = arena.allocate(after[0]).unwrap().as_ptr() as usize;
                for &count in &after[1..] {
                    arena.allocate(count).unwrap();
                }
                arena.rewind(checkpoint);
                prop_assert_eq!(arena.occupied_bytes(), checkpoint);
                let again = arena.allocate(after[0]).unwrap().as_ptr() as usize;
                prop_assert_eq!(again, start);
            }
        }
    }
}
