//! Kernel registry: kind name + JSON config → boxed kernel.

use serde::de::DeserializeOwned;

use qkernel_core::table::Table;
use qkernel_operators::agg::AggKernelConfig;
use qkernel_operators::join::{HashJoinKernel, JoinConfig};
use qkernel_operators::limit::{LimitConfig, LimitKernel};
use qkernel_operators::sort::{SortConfig, SortKernel};
use qkernel_operators::{AggKernel, Kernel};

use crate::runtime::ExecError;

fn parse<T: DeserializeOwned>(kind: &str, config: &serde_json::Value) -> Result<T, ExecError> {
    serde_json::from_value(config.clone())
        .map_err(|e| ExecError::Registry(format!("bad {kind} config: {e}")))
}

/// Build a single-input kernel. Known kinds: `sort`, `limit`, `agg`
/// (alias `aggregate`).
pub fn build_kernel(kind: &str, config: &serde_json::Value) -> Result<Box<dyn Kernel>, ExecError> {
    let kernel: Box<dyn Kernel> = match kind {
        "sort" => Box::new(SortKernel::new(parse::<SortConfig>(kind, config)?)?),
        "limit" => Box::new(LimitKernel::new(parse::<LimitConfig>(kind, config)?)),
        "agg" | "aggregate" => Box::new(AggKernel::new(parse::<AggKernelConfig>(kind, config)?)),
        other => return Err(ExecError::Registry(format!("unknown kernel kind '{other}'"))),
    };
    Ok(kernel)
}

/// Build a hash join whose build side is `right`.
pub fn build_join_kernel(
    config: &serde_json::Value,
    right: Table,
) -> Result<Box<dyn Kernel>, ExecError> {
    let cfg = parse::<JoinConfig>("join", config)?;
    Ok(Box::new(HashJoinKernel::new(cfg, right)?))
}
