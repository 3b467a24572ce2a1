//! LEFT JOIN: every left row appears at least once; rows with no surviving
//! match are emitted with zero-valued right columns.

use std::ops::Range;

use bitvec::prelude::*;

use qkernel_core::table::Table;

use super::base::JoinBase;
use super::{Join, JoinConfig};
use crate::traits::OpError;

/// Matched flags for the left rows in `[flushed, flushed + flags.len())`.
/// Rows before `flushed` have been resolved and dropped from tracking.
#[derive(Debug, Default, Clone)]
pub struct JoinedFlags {
    flushed: usize,
    flags: BitVec,
}

impl JoinedFlags {
    pub fn reset(&mut self, left_rows: usize) {
        self.flushed = 0;
        self.flags = bitvec![0; left_rows];
    }

    /// Extend tracking to cover `left_rows` rows; never shrinks.
    pub fn ensure(&mut self, left_rows: usize) {
        let len = left_rows.saturating_sub(self.flushed);
        if len > self.flags.len() {
            self.flags.resize(len, false);
        }
    }

    pub fn mark(&mut self, left_row: usize) -> Result<(), OpError> {
        let Some(slot) = left_row.checked_sub(self.flushed) else {
            return Err(OpError::Exec(format!(
                "left row {left_row} was already flushed (cursor at {})",
                self.flushed
            )));
        };
        self.ensure(left_row + 1);
        self.flags.set(slot, true);
        Ok(())
    }

    pub fn is_joined(&self, left_row: usize) -> bool {
        left_row < self.flushed
            || self
                .flags
                .get(left_row - self.flushed)
                .map_or(false, |b| *b)
    }

    /// The not yet flushed part of `[0, processed)`.
    pub fn pending(&self, processed: usize) -> Range<usize> {
        self.flushed..processed.max(self.flushed)
    }

    /// Drop tracking for every row before `processed`.
    pub fn advance(&mut self, processed: usize) {
        if processed <= self.flushed {
            return;
        }
        let consumed = (processed - self.flushed).min(self.flags.len());
        self.flags = self.flags.split_off(consumed);
        self.flushed = processed;
    }

    pub fn flushed(&self) -> usize {
        self.flushed
    }
}

#[derive(Debug, Clone)]
pub struct LeftJoin {
    base: JoinBase,
    flags: JoinedFlags,
}

impl LeftJoin {
    pub fn new(config: JoinConfig) -> Result<Self, OpError> {
        Ok(Self {
            base: JoinBase::new(config)?,
            flags: JoinedFlags::default(),
        })
    }

    pub fn flags(&self) -> &JoinedFlags {
        &self.flags
    }

    /// Append a null-filled row for every left row in `[flushed, processed)`
    /// that has no surviving match, then move the cursor to `processed`.
    pub fn fill_not_joined_rows(
        &mut self,
        left: &Table,
        processed_left_count: usize,
        output: &mut Table,
    ) -> Result<(), OpError> {
        if processed_left_count > left.row_count() {
            return Err(OpError::Exec(format!(
                "processed count {processed_left_count} exceeds {} left rows",
                left.row_count()
            )));
        }
        let mut filled = 0usize;
        for row in self.flags.pending(processed_left_count) {
            if !self.flags.is_joined(row) {
                self.base.append_row(output, left, row, None)?;
                filled += 1;
            }
        }
        self.flags.advance(processed_left_count);
        tracing::debug!(filled, cursor = self.flags.flushed(), "left join fill");
        Ok(())
    }
}

impl Join for LeftJoin {
    fn base(&self) -> &JoinBase {
        &self.base
    }

    fn init_joined_table(
        &mut self,
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError> {
        self.base.declare_output(left, right, output)?;
        self.flags.reset(left.row_count());
        Ok(())
    }

    fn generate_result_table(
        &mut self,
        left_indices: &[usize],
        right_indices: &[usize],
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError> {
        self.flags.ensure(left.row_count());
        let kept = self
            .base
            .append_pairs(left_indices, right_indices, left, right, output)?;
        for (&l, keep) in left_indices.iter().zip(kept) {
            if keep {
                self.flags.mark(l)?;
            }
        }
        Ok(())
    }

    fn finish(
        &mut self,
        left: &Table,
        total_left_count: usize,
        output: &mut Table,
    ) -> Result<(), OpError> {
        self.fill_not_joined_rows(left, total_left_count, output)
    }
}
