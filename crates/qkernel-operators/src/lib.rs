#![forbid(unsafe_code)]
//! qkernel-operators: streaming kernels over `qkernel_core::Table`.
//!
//! Design intent:
//! - Kernels are synchronous and single-owner; the scheduler calls
//!   `Kernel::compute` once per batch, in stream order.
//! - Per-row work runs on typed slices bound once per batch; `Value` is only
//!   used at the edges (results, predicates).
//! - Long-lived accumulator state is allocated through `qkernel-mem`.

pub mod traits;

pub mod compare;

pub mod agg;
pub mod join;
pub mod limit;
pub mod sort;

pub use agg::{AggKernel, Aggregator, AggregatorConfig};
pub use compare::{ComboComparator, Direction};
pub use join::{HashJoinKernel, InnerJoin, Join, JoinConfig, LeftJoin};
pub use limit::{LimitConfig, LimitKernel};
pub use sort::{SortConfig, SortKernel};
pub use traits::{Kernel, OpError, Output};
