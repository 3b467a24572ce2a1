//! Streaming ORDER BY ... LIMIT/OFFSET.
//!
//! Every batch is merged into a running table, which is then cut down to its
//! `offset + limit` smallest rows. At end of stream the residue is fully
//! sorted, the first `offset` rows are removed, and the result is emitted.

use std::mem;
use std::time::{Duration, Instant};

use qkernel_core::table::Table;

use super::config::SortConfig;
use super::topk::{sorted_indices, top_k_indices};
use crate::compare::ComboComparator;
use crate::traits::{Kernel, OpError, Output};

/// Wall-clock spent per phase. Observability only.
#[derive(Debug, Default, Clone)]
pub struct SortMetrics {
    pub merge: Duration,
    pub top_k: Duration,
    pub compact: Duration,
    pub output: Duration,
    pub compute_calls: u64,
}

enum SortState {
    Empty,
    Accumulating {
        table: Table,
        comparator: ComboComparator,
    },
    Done,
}

pub struct SortKernel {
    config: SortConfig,
    state: SortState,
    metrics: SortMetrics,
}

impl SortKernel {
    pub fn new(mut config: SortConfig) -> Result<Self, OpError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SortState::Empty,
            metrics: SortMetrics::default(),
        })
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SortMetrics {
        &self.metrics
    }

    /// Rows currently held between batches.
    pub fn buffered_rows(&self) -> usize {
        match &self.state {
            SortState::Accumulating { table, .. } => table.row_count(),
            SortState::Empty | SortState::Done => 0,
        }
    }

    fn absorb(&mut self, state: SortState, mut batch: Table) -> Result<SortState, OpError> {
        let start = Instant::now();
        let (mut table, comparator) = match state {
            SortState::Empty => {
                batch.delete_rows();
                let comparator = ComboComparator::new(
                    &batch,
                    &self.config.order_fields,
                    &self.config.directions,
                )?;
                (batch, comparator)
            }
            SortState::Accumulating {
                mut table,
                comparator,
            } => {
                table.merge(&batch)?;
                (table, comparator)
            }
            SortState::Done => {
                return Err(OpError::Exec("sort kernel already emitted".into()));
            }
        };
        self.metrics.merge += start.elapsed();

        let k = self.config.top_k();
        if table.row_count() > k {
            let start = Instant::now();
            let keep = {
                let bound = comparator.bind(&table)?;
                top_k_indices(&bound, table.row_count(), k)
            };
            self.metrics.top_k += start.elapsed();

            let start = Instant::now();
            table.reorder(&keep)?;
            self.metrics.compact += start.elapsed();
        }
        Ok(SortState::Accumulating { table, comparator })
    }

    fn finish(&mut self, state: SortState) -> Result<Table, OpError> {
        let start = Instant::now();
        let table = match state {
            SortState::Empty => Table::new(),
            SortState::Accumulating {
                mut table,
                comparator,
            } => {
                let order = {
                    let bound = comparator.bind(&table)?;
                    sorted_indices(&bound, table.row_count())
                };
                table.reorder(&order)?;
                table.truncate(self.config.top_k());
                for row in 0..self.config.offset.min(table.row_count()) {
                    table.mark_delete_row(row);
                }
                table.delete_rows();
                table
            }
            SortState::Done => {
                return Err(OpError::Exec("sort kernel already emitted".into()));
            }
        };
        self.metrics.output += start.elapsed();

        let m = &self.metrics;
        tracing::debug!(
            rows = table.row_count(),
            compute_calls = m.compute_calls,
            merge_us = m.merge.as_micros() as u64,
            top_k_us = m.top_k.as_micros() as u64,
            compact_us = m.compact.as_micros() as u64,
            output_us = m.output.as_micros() as u64,
            "sort finished"
        );
        Ok(table)
    }
}

impl Kernel for SortKernel {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> Result<Option<Output>, OpError> {
        self.metrics.compute_calls += 1;
        let mut state = mem::replace(&mut self.state, SortState::Done);
        if let SortState::Done = state {
            return Err(OpError::Exec("sort kernel already emitted".into()));
        }
        if let Some(batch) = input {
            state = self.absorb(state, batch)?;
        }
        if !eof {
            self.state = state;
            return Ok(None);
        }
        let table = self.finish(state)?;
        Ok(Some(Output::last(table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Direction;
    use qkernel_core::column::Column;

    fn batch(id: Vec<i64>, a: Vec<i32>) -> Table {
        Table::from_columns(vec![Column::from_vec("id", id), Column::from_vec("a", a)]).unwrap()
    }

    fn run(cfg: SortConfig, batches: Vec<Table>) -> Table {
        let mut k = SortKernel::new(cfg).unwrap();
        for b in batches {
            assert!(k.compute(Some(b), false).unwrap().is_none());
        }
        let out = k.compute(None, true).unwrap().unwrap();
        assert!(out.eof);
        out.table
    }

    fn asc_a() -> SortConfig {
        SortConfig::new(&["a"], &[Direction::Asc])
    }

    #[test]
    fn limit_across_batches() {
        let out = run(
            asc_a().with_limit(3, 0),
            vec![batch(vec![1, 2], vec![3, 2]), batch(vec![3, 4], vec![4, 1])],
        );
        assert_eq!(out.values::<i64>("id").unwrap(), &[4, 2, 1]);
    }

    #[test]
    fn offset_drops_leading_rows() {
        let out = run(
            asc_a().with_limit(3, 1),
            vec![batch(vec![1, 2], vec![3, 2]), batch(vec![3, 4], vec![4, 1])],
        );
        assert_eq!(out.values::<i64>("id").unwrap(), &[2, 1, 3]);
    }

    #[test]
    fn working_set_is_bounded_by_top_k() {
        let mut k = SortKernel::new(asc_a().with_limit(2, 0)).unwrap();
        for i in 0..5 {
            k.compute(Some(batch(vec![i; 10], (0..10).collect())), false)
                .unwrap();
            assert!(k.buffered_rows() <= 2);
        }
        let out = k.compute(None, true).unwrap().unwrap();
        assert_eq!(out.table.values::<i32>("a").unwrap(), &[0, 0]);
        // stable: the earliest batch wins ties
        assert_eq!(out.table.values::<i64>("id").unwrap(), &[0, 1]);
    }

    #[test]
    fn unlimited_sorts_everything_desc() {
        let out = run(
            SortConfig::new(&["a"], &[Direction::Desc]),
            vec![batch(vec![1, 2, 3], vec![1, 3, 2])],
        );
        assert_eq!(out.values::<i64>("id").unwrap(), &[2, 3, 1]);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let out = run(
            asc_a().with_limit(5, 10),
            vec![batch(vec![1, 2], vec![1, 2])],
        );
        assert_eq!(out.row_count(), 0);
        assert_eq!(out.column_count(), 2);
    }

    #[test]
    fn deleted_input_rows_are_ignored() {
        let mut first = batch(vec![1, 2], vec![1, 2]);
        first.mark_delete_row(0);
        let mut second = batch(vec![3, 4], vec![0, 5]);
        second.mark_delete_row(0);
        let out = run(asc_a(), vec![first, second]);
        assert_eq!(out.values::<i64>("id").unwrap(), &[2, 4]);
    }

    #[test]
    fn unknown_sort_column_fails_first_batch() {
        let mut k = SortKernel::new(SortConfig::new(&["nope"], &[Direction::Asc])).unwrap();
        let err = k
            .compute(Some(batch(vec![1], vec![1])), false)
            .unwrap_err();
        assert!(err.to_string().contains("invalid column name"));
    }

    #[test]
    fn schema_mismatch_on_merge_fails() {
        let mut k = SortKernel::new(asc_a()).unwrap();
        k.compute(Some(batch(vec![1], vec![1])), false).unwrap();
        let other = Table::from_columns(vec![Column::from_vec("a", vec![1i32])]).unwrap();
        assert!(k.compute(Some(other), false).is_err());
    }

    #[test]
    fn emits_once() {
        let mut k = SortKernel::new(asc_a()).unwrap();
        let out = k.compute(None, true).unwrap().unwrap();
        assert_eq!(out.table.row_count(), 0);
        assert!(k.compute(None, true).is_err());
        assert_eq!(k.metrics().compute_calls, 2);
    }
}
