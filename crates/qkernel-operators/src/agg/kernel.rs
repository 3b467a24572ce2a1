//! Group-by kernel: hashes group keys per batch, feeds the `Aggregator`, and
//! emits one result table at end of stream.

use serde::{Deserialize, Serialize};

use qkernel_core::hash::group_keys;
use qkernel_core::table::Table;

use super::aggregator::{Aggregator, AggregatorConfig};
use super::registry::AggFuncDesc;
use crate::traits::{Kernel, OpError, Output};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggKernelConfig {
    #[serde(default, alias = "groupBy", alias = "groupKeys")]
    pub group_by: Vec<String>,
    #[serde(default, alias = "outputFields")]
    pub output_fields: Vec<String>,
    #[serde(default, alias = "aggFuncs")]
    pub agg_funcs: Vec<AggFuncDesc>,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

pub struct AggKernel {
    config: AggKernelConfig,
    aggregator: Aggregator,
    done: bool,
}

impl AggKernel {
    pub fn new(config: AggKernelConfig) -> Self {
        let aggregator = Aggregator::new(config.aggregator.clone());
        Self {
            config,
            aggregator,
            done: false,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}

impl Kernel for AggKernel {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> Result<Option<Output>, OpError> {
        if self.done {
            return Err(OpError::Exec("aggregate kernel already emitted".into()));
        }
        if let Some(batch) = input {
            if !self.aggregator.is_initialized() {
                self.aggregator.init(
                    &self.config.agg_funcs,
                    &self.config.group_by,
                    &self.config.output_fields,
                    &batch,
                )?;
            }
            let keys = group_keys(&batch, &self.config.group_by)?;
            self.aggregator.aggregate(&batch, &keys)?;
        }
        if !eof {
            return Ok(None);
        }

        self.done = true;
        let table = self.aggregator.get_table()?.unwrap_or_default();
        tracing::info!(
            groups = self.aggregator.group_count(),
            dropped_rows = self.aggregator.dropped_rows(),
            peak_bytes = self.aggregator.peak_bytes(),
            "aggregation finished"
        );
        Ok(Some(Output::last(table)))
    }
}
