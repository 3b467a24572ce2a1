//! Column-oriented in-memory batch of rows with a shared schema.
//!
//! Invariants:
//! - every column holds exactly `row_count` cells after any public call returns;
//! - `deleted` has exactly `row_count` bits;
//! - row indices are only valid for the `Generation` they were handed out in.
//!   `delete_rows`, `take_rows`, `reorder` and `truncate` renumber rows and bump it.

use std::collections::HashMap;
use std::ops::Range;

use bitvec::prelude::*;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::id::Generation;
use crate::schema::{Field, Schema, ValueType};
use crate::types::{NativeType, Value};

/// Logical handle to one row of one table generation. Not a copy of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Row {
    index: usize,
    generation: Generation,
}

impl Row {
    pub fn index(self) -> usize {
        self.index
    }

    pub fn generation(self) -> Generation {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
    row_count: usize,
    deleted: BitVec,
    generation: Generation,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table with the columns of `schema`.
    pub fn with_schema(schema: &Schema) -> Result<Self> {
        let mut table = Self::new();
        for field in &schema.fields {
            table.add_column(Column::new(field.name.clone(), field.value_type))?;
        }
        Ok(table)
    }

    /// Build a table from pre-filled columns of equal length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut table = Self::new();
        table.row_count = row_count;
        table.deleted = bitvec![0; row_count];
        for col in columns {
            if col.len() != row_count {
                return Err(Error::SchemaMismatch(format!(
                    "column '{}' has {} rows, expected {}",
                    col.name(),
                    col.len(),
                    row_count
                )));
            }
            table.add_column(col)?;
        }
        Ok(table)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(Column::field).collect())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    // ----- columns -----

    /// Declare a column of `value_type`. Re-declaring a name with the same
    /// type returns the existing column index; a different type is an error.
    pub fn declare_column(&mut self, name: &str, value_type: ValueType) -> Result<usize> {
        if let Some(&idx) = self.by_name.get(name) {
            let actual = self.columns[idx].value_type();
            if actual != value_type {
                return Err(Error::TypeMismatch {
                    column: name.to_string(),
                    expected: value_type,
                    actual,
                });
            }
            return Ok(idx);
        }
        self.add_column(Column::new(name, value_type))
    }

    pub fn declare<T: NativeType>(&mut self, name: &str) -> Result<usize> {
        self.declare_column(name, T::VALUE_TYPE)
    }

    /// Append a column. A duplicate name is always an error. A shorter
    /// column is padded with zero values to the current row count.
    pub fn add_column(&mut self, mut column: Column) -> Result<usize> {
        if self.by_name.contains_key(column.name()) {
            return Err(Error::DuplicateColumn(column.name().to_string()));
        }
        if column.len() > self.row_count {
            return Err(Error::SchemaMismatch(format!(
                "column '{}' has {} rows, table has {}",
                column.name(),
                column.len(),
                self.row_count
            )));
        }
        column.data_mut().resize(self.row_count);
        let idx = self.columns.len();
        self.by_name.insert(column.name().to_string(), idx);
        self.columns.push(column);
        Ok(idx)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&idx| &self.columns[idx])
    }

    pub fn column_at(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Like `column_index`, but an unknown name is an `UnknownColumn` error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Typed view of a column by name.
    pub fn values<T: NativeType>(&self, name: &str) -> Result<&[T]> {
        self.column(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?
            .values::<T>()
    }

    /// Typed view of a column by position.
    pub fn values_at<T: NativeType>(&self, idx: usize) -> Result<&[T]> {
        self.column_at(idx)
            .ok_or_else(|| Error::Invariant(format!("column index {idx} out of range")))?
            .values::<T>()
    }

    // ----- rows -----

    pub fn allocate_row(&mut self) -> Row {
        let start = self.batch_allocate_rows(1).start;
        self.row(start)
    }

    /// Append `n` zero-valued rows to every column.
    pub fn batch_allocate_rows(&mut self, n: usize) -> Range<usize> {
        let start = self.row_count;
        let end = start + n;
        for col in &mut self.columns {
            col.data_mut().resize(end);
        }
        self.deleted.resize(end, false);
        self.row_count = end;
        start..end
    }

    /// Handle for row `index` in the current generation.
    pub fn row(&self, index: usize) -> Row {
        Row {
            index,
            generation: self.generation,
        }
    }

    /// Resolve a handle back to an index, rejecting handles from an older
    /// generation or past the end.
    pub fn resolve(&self, row: Row) -> Result<usize> {
        if row.generation != self.generation {
            return Err(Error::StaleRow {
                row: row.generation.get(),
                table: self.generation.get(),
            });
        }
        if row.index >= self.row_count {
            return Err(Error::RowOutOfRange {
                index: row.index,
                row_count: self.row_count,
            });
        }
        Ok(row.index)
    }

    pub fn value(&self, col: usize, row: usize) -> Option<Value> {
        self.columns.get(col)?.get(row)
    }

    pub fn value_by_name(&self, name: &str, row: usize) -> Option<Value> {
        self.column(name)?.get(row)
    }

    /// Read a cell through a row handle. Stale handles trip a debug assertion.
    pub fn value_at(&self, col: usize, row: Row) -> Option<Value> {
        debug_assert_eq!(row.generation, self.generation, "stale row handle");
        self.value(col, row.index)
    }

    pub fn set_value(&mut self, col: usize, row: usize, value: &Value) -> Result<()> {
        self.check_row(row)?;
        let column = self
            .columns
            .get_mut(col)
            .ok_or_else(|| Error::Invariant(format!("column index {col} out of range")))?;
        if column.data_mut().set(row, value) {
            Ok(())
        } else {
            Err(Error::SchemaMismatch(format!(
                "cannot store {:?} into column '{}' of type {}",
                value,
                column.name(),
                column.value_type()
            )))
        }
    }

    /// Typed cell write; the hot-path alternative to `set_value`.
    pub fn set<T: NativeType>(&mut self, col: usize, row: usize, value: T) -> Result<()> {
        self.check_row(row)?;
        let column = self
            .columns
            .get_mut(col)
            .ok_or_else(|| Error::Invariant(format!("column index {col} out of range")))?;
        column.values_mut::<T>()?[row] = value;
        Ok(())
    }

    /// Copy `src.column(src_col)[src_row]` into `self.column(dst_col)[dst_row]`.
    pub fn copy_cell(
        &mut self,
        dst_col: usize,
        dst_row: usize,
        src: &Table,
        src_col: usize,
        src_row: usize,
    ) -> Result<()> {
        self.check_row(dst_row)?;
        src.check_row(src_row)?;
        let from = src
            .columns
            .get(src_col)
            .ok_or_else(|| Error::Invariant(format!("column index {src_col} out of range")))?;
        let to = self
            .columns
            .get_mut(dst_col)
            .ok_or_else(|| Error::Invariant(format!("column index {dst_col} out of range")))?;
        if to.data_mut().copy_cell(dst_row, from.data(), src_row) {
            Ok(())
        } else {
            Err(Error::SchemaMismatch(format!(
                "cannot copy '{}' ({}) into '{}' ({})",
                from.name(),
                from.value_type(),
                to.name(),
                to.value_type()
            )))
        }
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.row_count {
            return Err(Error::RowOutOfRange {
                index: row,
                row_count: self.row_count,
            });
        }
        Ok(())
    }

    // ----- deletion -----

    /// Flag a row as logically gone. O(1); no data moves until `delete_rows`.
    pub fn mark_delete_row(&mut self, row: usize) {
        if row < self.row_count {
            self.deleted.set(row, true);
        }
    }

    pub fn is_deleted_row(&self, row: usize) -> bool {
        self.deleted.get(row).map(|b| *b).unwrap_or(false)
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.count_ones()
    }

    /// Physically remove every marked row, renumbering survivors from 0.
    /// Idempotent; a no-op when nothing is marked.
    #[doc(alias = "compact")]
    pub fn delete_rows(&mut self) {
        if self.deleted.not_any() {
            return;
        }
        for col in &mut self.columns {
            col.data_mut().remove_marked(&self.deleted);
        }
        self.row_count -= self.deleted.count_ones();
        self.deleted = bitvec![0; self.row_count];
        self.generation = self.generation.next();
    }

    // ----- whole-table operations -----

    /// Append every non-deleted row of `other`. Both tables must have the same
    /// column names and types in the same order. `other` is left untouched.
    pub fn merge(&mut self, other: &Table) -> Result<()> {
        self.check_same_schema(other)?;
        let added = other.row_count - other.deleted_count();
        for (dst, src) in self.columns.iter_mut().zip(other.columns.iter()) {
            if !dst.data_mut().extend_from(src.data(), &other.deleted) {
                return Err(Error::Invariant(format!(
                    "column '{}' changed kind during merge",
                    dst.name()
                )));
            }
        }
        self.row_count += added;
        self.deleted.resize(self.row_count, false);
        Ok(())
    }

    fn check_same_schema(&self, other: &Table) -> Result<()> {
        if self.columns.len() != other.columns.len() {
            return Err(Error::SchemaMismatch(format!(
                "column count {} vs {}",
                self.columns.len(),
                other.columns.len()
            )));
        }
        for (a, b) in self.columns.iter().zip(other.columns.iter()) {
            if a.name() != b.name() || a.value_type() != b.value_type() {
                return Err(Error::SchemaMismatch(format!(
                    "column '{}' ({}) vs '{}' ({})",
                    a.name(),
                    a.value_type(),
                    b.name(),
                    b.value_type()
                )));
            }
        }
        Ok(())
    }

    /// New table holding the rows at `indices` in that order. Deletion marks
    /// are not carried over.
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.row_count) {
            return Err(Error::RowOutOfRange {
                index: bad,
                row_count: self.row_count,
            });
        }
        let mut out = Table {
            columns: Vec::with_capacity(self.columns.len()),
            by_name: self.by_name.clone(),
            row_count: indices.len(),
            deleted: bitvec![0; indices.len()],
            generation: self.generation.next(),
        };
        for col in &self.columns {
            let mut taken = Column::new(col.name(), col.value_type());
            *taken.data_mut() = col.data().take(indices);
            out.columns.push(taken);
        }
        Ok(out)
    }

    /// Permute rows in place so that new row `i` is old row `perm[i]`.
    pub fn reorder(&mut self, perm: &[usize]) -> Result<()> {
        let reordered = self.take_rows(perm)?;
        *self = reordered;
        Ok(())
    }

    /// Keep only the first `len` rows.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.row_count {
            return;
        }
        for col in &mut self.columns {
            col.data_mut().truncate(len);
        }
        self.deleted.truncate(len);
        self.row_count = len;
        self.generation = self.generation.next();
    }

    /// Every field of `self` as a `Field` list, used when declaring derived tables.
    pub fn fields(&self) -> Vec<Field> {
        self.schema().fields
    }

    /// Materialize one row as dynamic values, in column order.
    pub fn row_values(&self, row: usize) -> Option<Vec<Value>> {
        if row >= self.row_count {
            return None;
        }
        self.columns.iter().map(|c| c.get(row)).collect()
    }
}
