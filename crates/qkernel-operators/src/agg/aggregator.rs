//! Streaming group-by aggregation.
//!
//! `Uninitialized -(init)-> Ready -(aggregate)*-> Ready`. `get_table` may be
//! called any number of times in `Ready`; `reset` returns to `Uninitialized`.
//!
//! Accumulators for one group are a contiguous run of `funcs.len()` slots in
//! the arena; the group map stores the run's first `SlotId`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use qkernel_core::column::Column;
use qkernel_core::config::KernelDefaults;
use qkernel_core::hash::GroupKey;
use qkernel_core::table::Table;
use qkernel_mem::error::Error as MemError;
use qkernel_mem::{AccumulatorArena, SlotId};

use super::accumulator::Accumulator;
use super::function::{pick_function, AggFunction, FuncArgs, Pick};
use super::registry::{AggFuncDesc, AggFuncRegistry};
use crate::traits::OpError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    #[serde(alias = "groupKeyLimit")]
    pub group_key_limit: usize,
    #[serde(alias = "stopExceedLimit")]
    pub stop_exceed_limit: bool,
    /// Bytes.
    #[serde(alias = "memoryLimit")]
    pub memory_limit: usize,
    #[serde(alias = "arenaChunkSlots")]
    pub arena_chunk_slots: usize,
}

impl Default for AggregatorConfig {
    /// Limits from `QKERNEL_*` environment variables, else built-in defaults.
    fn default() -> Self {
        Self::from_defaults(&KernelDefaults::from_env())
    }
}

impl AggregatorConfig {
    pub fn from_defaults(d: &KernelDefaults) -> Self {
        Self {
            group_key_limit: d.group_key_limit,
            stop_exceed_limit: d.stop_exceed_limit,
            memory_limit: d.memory_limit,
            arena_chunk_slots: d.arena_chunk_slots,
        }
    }
}

struct Ready {
    funcs: Vec<Box<dyn AggFunction>>,
    groups: HashMap<GroupKey, SlotId>,
    /// Group runs in first-seen order.
    order: Vec<SlotId>,
    /// Empty table carrying the output schema.
    output: Table,
    dropped_rows: u64,
}

enum State {
    Uninitialized,
    Ready(Box<Ready>),
}

pub struct Aggregator {
    config: AggregatorConfig,
    registry: AggFuncRegistry,
    arena: AccumulatorArena<Accumulator>,
    state: State,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_registry(config, AggFuncRegistry::default())
    }

    pub fn with_registry(config: AggregatorConfig, registry: AggFuncRegistry) -> Self {
        let arena = AccumulatorArena::new(config.memory_limit, config.arena_chunk_slots);
        Self {
            config,
            registry,
            arena,
            state: State::Uninitialized,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Resolve every function against `schema` and declare the output table.
    ///
    /// Group keys named in `output_fields` (all of them when `output_fields` is
    /// empty) pass through via a synthesized `IDENTITY` and come first in the
    /// output, followed by the functions in `descs` order.
    pub fn init(
        &mut self,
        descs: &[AggFuncDesc],
        group_keys: &[String],
        output_fields: &[String],
        schema: &Table,
    ) -> Result<(), OpError> {
        self.reset();

        let mut funcs: Vec<Box<dyn AggFunction>> = Vec::with_capacity(group_keys.len() + descs.len());
        for key in group_keys {
            let column = schema
                .column(key)
                .ok_or_else(|| OpError::Config(format!("unknown group key column '{key}'")))?;
            if output_fields.is_empty() || output_fields.contains(key) {
                funcs.push(pick_function(Pick::First, key, column.value_type(), key, None));
            }
        }

        for desc in descs {
            let output = match desc.outputs.as_slice() {
                [one] => one.clone(),
                other => {
                    return Err(OpError::Config(format!(
                        "{} expects one output field, got {}",
                        desc.func,
                        other.len()
                    )))
                }
            };
            let input = match desc.inputs.as_slice() {
                [] => None,
                [name] => {
                    let column = schema
                        .column(name)
                        .ok_or_else(|| OpError::Config(format!("unknown column '{name}'")))?;
                    Some((name.clone(), column.value_type()))
                }
                many => {
                    return Err(OpError::Config(format!(
                        "{} takes at most one input, got {}",
                        desc.func,
                        many.len()
                    )))
                }
            };
            if let Some(filter) = &desc.filter {
                if schema.column(filter).is_none() {
                    return Err(OpError::Config(format!("unknown filter column '{filter}'")));
                }
            }
            let args = FuncArgs {
                input,
                output,
                filter: desc.filter.clone(),
            };
            funcs.push(self.registry.create(&desc.func, &args)?);
        }

        let mut output = Table::new();
        for f in &funcs {
            let field = f.output();
            output.add_column(Column::new(field.name.clone(), field.value_type))?;
        }

        tracing::debug!(
            functions = funcs.len(),
            group_keys = group_keys.len(),
            "aggregator initialized"
        );
        self.state = State::Ready(Box::new(Ready {
            funcs,
            groups: HashMap::new(),
            order: Vec::new(),
            output,
            dropped_rows: 0,
        }));
        Ok(())
    }

    /// Fold every live row of `table` into the group named by `group_keys[row]`.
    ///
    /// A failure leaves partial progress in place; the caller must treat the
    /// aggregator as unusable afterwards.
    pub fn aggregate(&mut self, table: &Table, group_keys: &[GroupKey]) -> Result<(), OpError> {
        let State::Ready(ready) = &mut self.state else {
            return Err(OpError::NotInitialized);
        };
        if group_keys.len() != table.row_count() {
            return Err(OpError::Exec(format!(
                "{} group keys for {} rows",
                group_keys.len(),
                table.row_count()
            )));
        }

        let folds = ready
            .funcs
            .iter()
            .map(|f| f.bind(table))
            .collect::<Result<Vec<_>, _>>()?;
        let filters = ready
            .funcs
            .iter()
            .map(|f| f.filter().map(|name| table.values::<bool>(name)).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        let width = ready.funcs.len();
        let limit = self.config.group_key_limit;
        let memory_limit = self.config.memory_limit;

        for (row, key) in group_keys.iter().enumerate() {
            if table.is_deleted_row(row) {
                continue;
            }
            let start = match ready.groups.get(key) {
                Some(&start) => start,
                None => {
                    if ready.groups.len() >= limit {
                        if self.config.stop_exceed_limit {
                            return Err(OpError::GroupKeyLimit { limit });
                        }
                        if ready.dropped_rows == 0 {
                            tracing::warn!(limit, "group key limit reached, dropping rows");
                        }
                        ready.dropped_rows += 1;
                        continue;
                    }
                    let run = ready.funcs.iter().map(|f| f.new_accumulator()).collect();
                    let start = self
                        .arena
                        .alloc_run(run)
                        .map_err(|e| memory_error(e, memory_limit))?;
                    ready.groups.insert(*key, start);
                    ready.order.push(start);
                    start
                }
            };

            let accs = self
                .arena
                .run_mut(start, width)
                .ok_or_else(|| OpError::Exec("accumulator run out of range".into()))?;
            for ((fold, filter), acc) in folds.iter().zip(&filters).zip(accs.iter_mut()) {
                if filter.map_or(true, |f| f[row]) {
                    fold(row, acc);
                }
            }
            check_memory(&self.arena, memory_limit)?;
        }
        check_memory(&self.arena, memory_limit)?;

        tracing::debug!(
            rows = table.row_count(),
            groups = ready.groups.len(),
            bytes = self.arena.allocated_bytes(),
            "aggregated batch"
        );
        Ok(())
    }

    /// One output row per group, in first-seen order. `None` before `init`.
    /// Walks every group on each call.
    pub fn get_table(&self) -> Result<Option<Table>, OpError> {
        let State::Ready(ready) = &self.state else {
            return Ok(None);
        };
        let mut out = ready.output.clone();
        out.batch_allocate_rows(ready.order.len());
        let width = ready.funcs.len();
        for (row, &start) in ready.order.iter().enumerate() {
            let accs = self
                .arena
                .run(start, width)
                .ok_or_else(|| OpError::Exec("accumulator run out of range".into()))?;
            for (col, acc) in accs.iter().enumerate() {
                let value = acc.result();
                if !value.is_null() {
                    out.set_value(col, row, &value)?;
                }
            }
        }
        Ok(Some(out))
    }

    /// Drop every function and accumulator and return to `Uninitialized`.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.state = State::Uninitialized;
    }

    pub fn group_count(&self) -> usize {
        match &self.state {
            State::Ready(r) => r.groups.len(),
            State::Uninitialized => 0,
        }
    }

    /// Rows discarded because the group-key limit was reached with
    /// `stop_exceed_limit = false`.
    pub fn dropped_rows(&self) -> u64 {
        match &self.state {
            State::Ready(r) => r.dropped_rows,
            State::Uninitialized => 0,
        }
    }

    pub fn allocated_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    /// High-water mark of accumulator bytes across resets.
    pub fn peak_bytes(&self) -> usize {
        self.arena.peak_bytes()
    }
}

fn check_memory(arena: &AccumulatorArena<Accumulator>, limit: usize) -> Result<(), OpError> {
    let used = arena.allocated_bytes();
    if used > limit {
        return Err(OpError::MemoryLimit { used, limit });
    }
    Ok(())
}

fn memory_error(e: MemError, limit: usize) -> OpError {
    match e {
        MemError::BudgetExceeded {
            requested, used, ..
        } => OpError::MemoryLimit {
            used: used.saturating_add(requested),
            limit,
        },
        other => other.into(),
    }
}
