//! Kernel trait + common interfaces.
//!
//! The external scheduler calls `compute(input, eof)` once per batch, in
//! stream order, on a single thread per kernel instance. A kernel may emit
//! nothing for a call; whatever it emits with `eof = true` is its last output.

use qkernel_core::table::Table;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("group key count exceeds limit {limit}")]
    GroupKeyLimit { limit: usize },

    #[error("accumulator memory {used} bytes exceeds limit {limit}")]
    MemoryLimit { used: usize, limit: usize },

    #[error("aggregator is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Core(#[from] qkernel_core::error::Error),

    #[error(transparent)]
    Mem(#[from] qkernel_mem::error::Error),
}

/// One emitted batch.
#[derive(Debug)]
pub struct Output {
    pub table: Table,
    pub eof: bool,
}

impl Output {
    pub fn batch(table: Table) -> Self {
        Self { table, eof: false }
    }

    pub fn last(table: Table) -> Self {
        Self { table, eof: true }
    }
}

/// Trait that all kernels implement.
///
/// Invariants:
/// - A failed `compute` leaves the kernel unusable; callers abort the query.
/// - After a kernel has emitted an output with `eof = true`, further calls
///   are an error.
pub trait Kernel: Send {
    /// Human-readable kernel name (stable).
    fn name(&self) -> &'static str;

    /// Consume zero or one input batch; `eof` marks the end of the input stream.
    fn compute(&mut self, input: Option<Table>, eof: bool) -> Result<Option<Output>, OpError>;
}
