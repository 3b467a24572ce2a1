//! ORDER BY with LIMIT/OFFSET over a stream of batches.

pub mod config;
pub mod kernel;
pub mod topk;

pub use config::SortConfig;
pub use kernel::{SortKernel, SortMetrics};
