//! Hash join kernel: the right (build) side is fixed at construction and
//! every streamed left batch is matched, joined and emitted on its own.

use qkernel_core::schema::Schema;
use qkernel_core::table::Table;

use super::hash::hash_match;
use super::{Join, JoinConfig, JoinType};
use super::{InnerJoin, LeftJoin};
use crate::traits::{Kernel, OpError, Output};

pub struct HashJoinKernel {
    join: Box<dyn Join + Send>,
    right: Table,
    output_schema: Option<Schema>,
    done: bool,
}

impl HashJoinKernel {
    pub fn new(config: JoinConfig, mut right: Table) -> Result<Self, OpError> {
        for key in &config.right_keys {
            right.require_column(key)?;
        }
        right.delete_rows();
        let join: Box<dyn Join + Send> = match config.join_type {
            JoinType::Left => Box::new(LeftJoin::new(config)?),
            JoinType::Inner => Box::new(InnerJoin::new(config)?),
        };
        Ok(Self {
            join,
            right,
            output_schema: None,
            done: false,
        })
    }

    fn join_batch(&mut self, mut left: Table) -> Result<Table, OpError> {
        left.delete_rows();
        let mut out = Table::new();
        self.join.init_joined_table(&left, &self.right, &mut out)?;

        let cfg = self.join.base().config();
        let (li, ri) = hash_match(&left, &cfg.left_keys, &self.right, &cfg.right_keys)?;
        self.join
            .generate_result_table(&li, &ri, &left, &self.right, &mut out)?;
        self.join.finish(&left, left.row_count(), &mut out)?;
        out.delete_rows();

        tracing::debug!(
            left_rows = left.row_count(),
            matches = li.len(),
            rows = out.row_count(),
            "joined batch"
        );
        if self.output_schema.is_none() {
            self.output_schema = Some(out.schema());
        }
        Ok(out)
    }
}

impl Kernel for HashJoinKernel {
    fn name(&self) -> &'static str {
        "hash_join"
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> Result<Option<Output>, OpError> {
        if self.done {
            return Err(OpError::Exec("join kernel already emitted".into()));
        }
        let table = match input {
            Some(left) => self.join_batch(left)?,
            None if eof => match &self.output_schema {
                Some(schema) => Table::with_schema(schema)?,
                None => Table::new(),
            },
            None => return Ok(None),
        };
        self.done = eof;
        Ok(Some(Output { table, eof }))
    }
}
