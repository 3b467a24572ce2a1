//! Generation-indexed accumulator arena.
//!
//! Slots are handed out in fixed-size chunks; every chunk is accounted against
//! a `MemoryBudgetImpl` sized to the owner's memory limit before the backing
//! vector grows. Slots are addressed by `SlotId` (epoch + index) instead of
//! references, and `reset` drops everything at once and bumps the epoch so
//! ids from before the reset no longer resolve.

use std::mem;

use qkernel_core::budget::BudgetGuard;
use qkernel_core::id::ArenaEpoch;

use crate::error::Result;
use crate::guard::{BudgetGuardImpl, MemoryBudgetImpl};
use crate::tracking::PeakTracker;

const TAG: &str = "accumulator_arena";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    epoch: ArenaEpoch,
    index: usize,
}

impl SlotId {
    pub fn index(self) -> usize {
        self.index
    }

    /// The id `n` slots after this one, in the same epoch.
    pub fn offset(self, n: usize) -> SlotId {
        SlotId {
            epoch: self.epoch,
            index: self.index + n,
        }
    }
}

pub struct AccumulatorArena<T> {
    slots: Vec<T>,
    reserved: usize,
    chunk_slots: usize,
    epoch: ArenaEpoch,
    budget: MemoryBudgetImpl,
    guard: Option<BudgetGuardImpl>,
    peak: PeakTracker,
}

impl<T> AccumulatorArena<T> {
    pub fn new(memory_limit: usize, chunk_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            reserved: 0,
            chunk_slots: chunk_slots.max(1),
            epoch: ArenaEpoch::default(),
            budget: MemoryBudgetImpl::new(memory_limit),
            guard: None,
            peak: PeakTracker::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn epoch(&self) -> ArenaEpoch {
        self.epoch
    }

    /// Bytes currently reserved from the budget (whole chunks).
    pub fn allocated_bytes(&self) -> usize {
        self.guard.as_ref().map(|g| g.bytes()).unwrap_or(0)
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak.peak()
    }

    /// Allocate `values` into contiguous slots and return the first id.
    ///
    /// Either every value is placed or none is: the budget is charged for the
    /// whole run before any slot is written.
    pub fn alloc_run(&mut self, values: Vec<T>) -> Result<SlotId> {
        let start = self.slots.len();
        self.reserve(values.len())?;
        self.slots.extend(values);
        Ok(SlotId {
            epoch: self.epoch,
            index: start,
        })
    }

    pub fn alloc(&mut self, value: T) -> Result<SlotId> {
        self.alloc_run(vec![value])
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self.slots.len() + additional;
        if needed <= self.reserved {
            return Ok(());
        }
        let chunks = (needed - self.reserved).div_ceil(self.chunk_slots);
        let new_reserved = self.reserved + chunks * self.chunk_slots;
        let new_bytes = new_reserved.saturating_mul(mem::size_of::<T>().max(1));

        match self.guard.as_mut() {
            Some(guard) => guard.resize(new_bytes)?,
            None => self.guard = Some(self.budget.acquire(new_bytes, TAG)?),
        }
        self.slots.reserve_exact(new_reserved - self.slots.len());
        self.reserved = new_reserved;
        self.peak.record(new_bytes);

        #[cfg(feature = "tracing")]
        tracing::trace!(slots = new_reserved, bytes = new_bytes, "arena grew");
        Ok(())
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if id.epoch != self.epoch {
            return None;
        }
        self.slots.get(id.index)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if id.epoch != self.epoch {
            return None;
        }
        self.slots.get_mut(id.index)
    }

    /// `len` contiguous slots starting at `start`.
    pub fn run(&self, start: SlotId, len: usize) -> Option<&[T]> {
        if start.epoch != self.epoch {
            return None;
        }
        self.slots.get(start.index..start.index + len)
    }

    pub fn run_mut(&mut self, start: SlotId, len: usize) -> Option<&mut [T]> {
        if start.epoch != self.epoch {
            return None;
        }
        self.slots.get_mut(start.index..start.index + len)
    }

    /// Drop every slot, return all bytes to the budget, and invalidate ids.
    pub fn reset(&mut self) {
        self.slots = Vec::new();
        self.reserved = 0;
        self.guard = None;
        self.epoch = self.epoch.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn grows_in_chunks() {
        let mut arena: AccumulatorArena<u64> = AccumulatorArena::new(1024, 4);
        let a = arena.alloc(1).unwrap();
        assert_eq!(arena.allocated_bytes(), 4 * 8);
        let b = arena.alloc_run(vec![2, 3, 4, 5]).unwrap();
        assert_eq!(arena.allocated_bytes(), 8 * 8);
        assert_eq!(arena.get(a), Some(&1));
        assert_eq!(arena.run(b, 4), Some(&[2, 3, 4, 5][..]));
        assert_eq!(arena.get(b.offset(3)), Some(&5));
    }

    #[test]
    fn refuses_past_limit() {
        let mut arena: AccumulatorArena<u64> = AccumulatorArena::new(64, 4);
        arena.alloc_run(vec![0; 8]).unwrap();
        let err = arena.alloc(9).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { .. }));
        assert_eq!(arena.len(), 8);
        assert_eq!(arena.allocated_bytes(), 64);
    }

    #[test]
    fn reset_invalidates_ids() {
        let mut arena: AccumulatorArena<u32> = AccumulatorArena::new(1024, 2);
        let id = arena.alloc(7).unwrap();
        arena.reset();
        assert_eq!(arena.get(id), None);
        assert_eq!(arena.allocated_bytes(), 0);
        assert!(arena.peak_bytes() > 0);
        let fresh = arena.alloc(8).unwrap();
        assert_eq!(fresh.index(), 0);
        assert_eq!(arena.get(fresh), Some(&8));
    }
}
