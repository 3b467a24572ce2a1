//! INNER JOIN: only pairs that survive the filter are kept.

use qkernel_core::table::Table;

use super::base::JoinBase;
use super::{Join, JoinConfig};
use crate::traits::OpError;

#[derive(Debug, Clone)]
pub struct InnerJoin {
    base: JoinBase,
}

impl InnerJoin {
    pub fn new(config: JoinConfig) -> Result<Self, OpError> {
        Ok(Self {
            base: JoinBase::new(config)?,
        })
    }
}

impl Join for InnerJoin {
    fn base(&self) -> &JoinBase {
        &self.base
    }

    fn init_joined_table(
        &mut self,
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError> {
        self.base.declare_output(left, right, output)
    }

    fn generate_result_table(
        &mut self,
        left_indices: &[usize],
        right_indices: &[usize],
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError> {
        self.base
            .append_pairs(left_indices, right_indices, left, right, output)?;
        Ok(())
    }

    fn finish(&mut self, _left: &Table, _total: usize, _output: &mut Table) -> Result<(), OpError> {
        Ok(())
    }
}
