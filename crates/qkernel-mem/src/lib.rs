#![forbid(unsafe_code)]
//! qkernel-mem: hard memory budgeting and accumulator arenas.
//!
//! This crate provides concrete implementations for the *interfaces* defined
//! in `qkernel-core::budget`. Long-lived kernel state (aggregation
//! accumulators) is allocated here so the configured memory limit is enforced
//! with RAII guards.

pub mod arena;
pub mod error;
pub mod guard;
pub mod tracking;

pub use arena::{AccumulatorArena, SlotId};
pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use tracking::PeakTracker;
