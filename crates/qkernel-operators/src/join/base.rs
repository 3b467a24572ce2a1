//! State and helpers shared by every join flavour: configuration checks,
//! output schema, row appends and the post-join filter.

use std::ops::Range;

use qkernel_core::column::Column;
use qkernel_core::table::Table;

use super::predicate::Predicate;
use super::JoinConfig;
use crate::traits::OpError;

#[derive(Debug, Clone)]
pub struct JoinBase {
    config: JoinConfig,
    filter: Option<Predicate>,
}

impl JoinBase {
    /// Checks key counts and parses the filter. A malformed filter aborts construction.
    pub fn new(config: JoinConfig) -> Result<Self, OpError> {
        if config.left_keys.is_empty() {
            return Err(OpError::Config("join needs at least one key".into()));
        }
        if config.left_keys.len() != config.right_keys.len() {
            return Err(OpError::Config(format!(
                "{} left keys but {} right keys",
                config.left_keys.len(),
                config.right_keys.len()
            )));
        }
        let filter = match config.filter.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(expr) => Some(Predicate::parse(expr)?),
        };
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Key columns must exist on both sides with pairwise equal types, and an
    /// explicit output list must name every left then every right column.
    pub fn validate(&self, left: &Table, right: &Table) -> Result<(), OpError> {
        for (l, r) in self.config.left_keys.iter().zip(&self.config.right_keys) {
            let lc = left
                .column(l)
                .ok_or_else(|| OpError::Schema(format!("unknown left key column '{l}'")))?;
            let rc = right
                .column(r)
                .ok_or_else(|| OpError::Schema(format!("unknown right key column '{r}'")))?;
            if lc.value_type() != rc.value_type() {
                return Err(OpError::Schema(format!(
                    "join key '{l}' ({}) does not match '{r}' ({})",
                    lc.value_type(),
                    rc.value_type()
                )));
            }
        }
        let expected = left.column_count() + right.column_count();
        if !self.config.output_fields.is_empty() && self.config.output_fields.len() != expected {
            return Err(OpError::Schema(format!(
                "{} output fields for {} input columns",
                self.config.output_fields.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Declare the output columns (left then right) on an empty `output`.
    /// An already-declared output is checked instead.
    pub fn declare_output(
        &self,
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError> {
        self.validate(left, right)?;
        let inputs = left.columns().iter().chain(right.columns());
        if output.column_count() > 0 {
            for (idx, src) in inputs.enumerate() {
                let matches = output
                    .column_at(idx)
                    .map_or(false, |c| c.value_type() == src.value_type());
                if !matches {
                    return Err(OpError::Schema(format!(
                        "join output column {idx} does not match input '{}'",
                        src.name()
                    )));
                }
            }
            return Ok(());
        }
        for (idx, src) in inputs.enumerate() {
            let name = self
                .config
                .output_fields
                .get(idx)
                .map(String::as_str)
                .unwrap_or(src.name());
            output.add_column(Column::new(name, src.value_type()))?;
        }
        Ok(())
    }

    /// Append one output row. Without a right row the right columns keep
    /// their zero values.
    pub fn append_row(
        &self,
        output: &mut Table,
        left: &Table,
        left_row: usize,
        right: Option<(&Table, usize)>,
    ) -> Result<usize, OpError> {
        let row = output.allocate_row().index();
        for col in 0..left.column_count() {
            output.copy_cell(col, row, left, col, left_row)?;
        }
        if let Some((right, r)) = right {
            let offset = left.column_count();
            for col in 0..right.column_count() {
                output.copy_cell(offset + col, row, right, col, r)?;
            }
        }
        Ok(row)
    }

    /// Mark rows of `output` in `rows` that fail the filter as deleted.
    /// Returns, per row in `rows`, whether it survived.
    pub fn apply_filter(&self, output: &mut Table, rows: Range<usize>) -> Result<Vec<bool>, OpError> {
        let Some(filter) = &self.filter else {
            return Ok(vec![true; rows.len()]);
        };
        let bound = filter.bind(output)?;
        let kept: Vec<bool> = rows.clone().map(|row| bound.eval(output, row)).collect();
        for (row, keep) in rows.zip(&kept) {
            if !keep {
                output.mark_delete_row(row);
            }
        }
        Ok(kept)
    }

    /// Append every `(left_indices[i], right_indices[i])` pair and filter the
    /// new rows. Returns, per pair, whether its row survived.
    pub fn append_pairs(
        &self,
        left_indices: &[usize],
        right_indices: &[usize],
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<Vec<bool>, OpError> {
        if left_indices.len() != right_indices.len() {
            return Err(OpError::Exec(format!(
                "{} left indices but {} right indices",
                left_indices.len(),
                right_indices.len()
            )));
        }
        let first = output.row_count();
        for (&l, &r) in left_indices.iter().zip(right_indices) {
            self.append_row(output, left, l, Some((right, r)))?;
        }
        self.apply_filter(output, first..output.row_count())
    }
}
