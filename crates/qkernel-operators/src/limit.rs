//! LIMIT: pass through at most `limit` live rows, then end the stream early.

use serde::{Deserialize, Serialize};

use qkernel_core::schema::Schema;
use qkernel_core::table::Table;

use crate::traits::{Kernel, OpError, Output};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    pub limit: usize,
}

pub struct LimitKernel {
    config: LimitConfig,
    emitted: usize,
    schema: Option<Schema>,
    done: bool,
}

impl LimitKernel {
    pub fn new(config: LimitConfig) -> Self {
        Self {
            config,
            emitted: 0,
            schema: None,
            done: false,
        }
    }

    pub fn emitted_rows(&self) -> usize {
        self.emitted
    }

    fn empty(&self) -> Result<Table, OpError> {
        Ok(match &self.schema {
            Some(schema) => Table::with_schema(schema)?,
            None => Table::new(),
        })
    }
}

impl Kernel for LimitKernel {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> Result<Option<Output>, OpError> {
        if self.done {
            return Err(OpError::Exec("limit kernel already reached end of stream".into()));
        }
        let remaining = self.config.limit - self.emitted;

        let Some(mut batch) = input else {
            if eof || remaining == 0 {
                self.done = true;
                return Ok(Some(Output::last(self.empty()?)));
            }
            return Ok(None);
        };

        if self.schema.is_none() {
            self.schema = Some(batch.schema());
        }
        batch.delete_rows();
        let reached = batch.row_count() >= remaining;
        batch.truncate(remaining);
        self.emitted += batch.row_count();

        if reached || eof {
            self.done = true;
            tracing::debug!(rows = self.emitted, "limit reached end of stream");
            return Ok(Some(Output::last(batch)));
        }
        Ok(Some(Output::batch(batch)))
    }
}
