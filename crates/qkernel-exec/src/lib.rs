#![forbid(unsafe_code)]
//! qkernel-exec: builds kernels from JSON configs and drives them in a
//! linear pipeline.
//!
//! The pipeline stands in for the external dataflow scheduler: it calls each
//! kernel's `compute` once per batch, in order, and forwards outputs
//! downstream until the last stage reports end of stream.

pub mod metrics;
pub mod registry;
pub mod runtime;

pub use registry::{build_join_kernel, build_kernel};
pub use runtime::{ExecError, Pipeline};
