//! MemoryBudget + RAII guard implementations.
//!
//! A kernel acquires a guard before growing long-lived state; dropping the
//! guard returns its bytes to the budget.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qkernel_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};

struct Ledger {
    capacity: usize,
    used: AtomicUsize,
}

impl Ledger {
    fn reserve(&self, bytes: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            match self
                .used
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Byte budget with a fixed capacity. Cloning shares the same ledger.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    ledger: Arc<Ledger>,
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            ledger: Arc::new(Ledger {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
            }),
        }
    }

    /// `try_acquire` that reports the shortfall instead of returning `None`.
    pub fn acquire(&self, bytes: usize, tag: &'static str) -> Result<BudgetGuardImpl> {
        self.try_acquire(bytes, tag)
            .ok_or_else(|| self.exceeded(tag, bytes))
    }

    fn exceeded(&self, tag: &'static str, requested: usize) -> Error {
        Error::BudgetExceeded {
            tag,
            requested,
            capacity: self.ledger.capacity,
            used: self.ledger.used.load(Ordering::Relaxed),
        }
    }
}

/// RAII guard that accounts for a number of bytes.
pub struct BudgetGuardImpl {
    ledger: Arc<Ledger>,
    bytes: usize,
    tag: &'static str,
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.ledger.release(self.bytes);
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl BudgetGuardImpl {
    /// Resize the accounted bytes. Shrinking always succeeds; growing fails
    /// with `BudgetExceeded` when the ledger cannot cover the difference.
    pub fn resize(&mut self, new_bytes: usize) -> Result<()> {
        if new_bytes <= self.bytes {
            self.ledger.release(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return Ok(());
        }
        let delta = new_bytes - self.bytes;
        if !self.ledger.reserve(delta) {
            return Err(Error::BudgetExceeded {
                tag: self.tag,
                requested: delta,
                capacity: self.ledger.capacity,
                used: self.ledger.used.load(Ordering::Relaxed),
            });
        }
        self.bytes = new_bytes;
        Ok(())
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.ledger.reserve(bytes) {
            return None;
        }
        Some(BudgetGuardImpl {
            ledger: Arc::clone(&self.ledger),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.ledger.capacity
    }

    fn used_bytes(&self) -> usize {
        self.ledger.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_grows_and_shrinks() {
        let budget = MemoryBudgetImpl::new(100);
        let mut guard = budget.acquire(10, "test").unwrap();
        guard.resize(100).unwrap();
        assert_eq!(budget.used_bytes(), 100);
        assert!(guard.resize(101).is_err());
        assert_eq!(guard.bytes(), 100);
        guard.resize(5).unwrap();
        assert_eq!(budget.used_bytes(), 5);
        drop(guard);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn acquire_reports_shortfall() {
        let budget = MemoryBudgetImpl::new(8);
        let _held = budget.acquire(6, "held").unwrap();
        match budget.acquire(4, "agg") {
            Err(Error::BudgetExceeded {
                tag,
                requested,
                capacity,
                used,
            }) => {
                assert_eq!((tag, requested, capacity, used), ("agg", 4, 8, 6));
            }
            other => panic!("unexpected: {:?}", other.map(|g| g.bytes())),
        }
    }
}
