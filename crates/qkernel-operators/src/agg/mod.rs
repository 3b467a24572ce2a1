//! Group-by aggregation: accumulators, function objects, and the aggregator.

pub mod accumulator;
pub mod aggregator;
pub mod function;
pub mod kernel;
pub mod registry;

pub use accumulator::Accumulator;
pub use aggregator::{Aggregator, AggregatorConfig};
pub use function::{AggFunction, FuncArgs};
pub use kernel::{AggKernel, AggKernelConfig};
pub use registry::{AggFuncDesc, AggFuncRegistry};
