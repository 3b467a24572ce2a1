#![forbid(unsafe_code)]
//! qkernel: streaming columnar query kernels.
//!
//! Re-exports the workspace crates under one name.

pub use qkernel_core;
pub use qkernel_exec;
pub use qkernel_mem;
pub use qkernel_operators;

pub use qkernel_core::prelude::*;
pub use qkernel_exec::{build_join_kernel, build_kernel, ExecError, Pipeline};
pub use qkernel_operators::{Kernel, OpError, Output};
