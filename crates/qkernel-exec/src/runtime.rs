//! Runtime: drive a linear chain of kernels batch by batch.
//!
//! Behavior:
//! - `push` feeds one input (or just an end-of-stream signal) to the first
//!   stage and forwards every output downstream, preserving order.
//! - A stage that has emitted `eof = true` is finished; nothing more is sent
//!   to it, and once the last stage finishes the pipeline is done.
//! - Any kernel error aborts the pipeline; later calls fail with `Invalid`.

use thiserror::Error;

use qkernel_core::table::Table;
use qkernel_operators::{Kernel, OpError, Output};

use crate::metrics::emit_span;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("kernel registry: {0}")]
    Registry(String),
    #[error("kernel exec: {0}")]
    Operator(#[from] OpError),
    #[error("invalid pipeline: {0}")]
    Invalid(String),
}

struct Stage {
    kernel: Box<dyn Kernel>,
    finished: bool,
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    failed: bool,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it consumes the previous stage's output.
    pub fn then(mut self, kernel: Box<dyn Kernel>) -> Self {
        self.stages.push(Stage {
            kernel,
            finished: false,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True once the last stage has emitted end of stream.
    pub fn is_finished(&self) -> bool {
        self.stages.last().map_or(false, |s| s.finished)
    }

    /// Feed one call's worth of input. Returns whatever the last stage emitted.
    pub fn push(&mut self, input: Option<Table>, eof: bool) -> Result<Vec<Output>, ExecError> {
        if self.failed {
            return Err(ExecError::Invalid("pipeline aborted by an earlier error".into()));
        }
        if self.stages.is_empty() {
            return Err(ExecError::Invalid("pipeline has no stages".into()));
        }
        let result = self.forward(input, eof);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn forward(&mut self, input: Option<Table>, eof: bool) -> Result<Vec<Output>, ExecError> {
        let mut pending: Option<(Option<Table>, bool)> = Some((input, eof));
        let last = self.stages.len() - 1;
        for (idx, stage) in self.stages.iter_mut().enumerate() {
            let Some((input, eof)) = pending.take() else {
                break;
            };
            if stage.finished {
                break;
            }
            let output = stage.kernel.compute(input, eof)?;
            if let Some(out) = &output {
                emit_span(
                    "stage_output",
                    &[
                        ("kernel", stage.kernel.name().to_string()),
                        ("rows", out.table.row_count().to_string()),
                        ("eof", out.eof.to_string()),
                    ],
                );
                stage.finished = out.eof;
            } else if eof {
                return Err(ExecError::Invalid(format!(
                    "stage {idx} ({}) produced no output at end of stream",
                    stage.kernel.name()
                )));
            }
            if idx == last {
                return Ok(output.into_iter().collect());
            }
            pending = output.map(|o| (Some(o.table), o.eof));
        }
        Ok(Vec::new())
    }

    /// Push every batch, then end of stream, and collect the last stage's
    /// tables. Stops feeding input early once the pipeline finishes.
    pub fn run<I>(&mut self, batches: I) -> Result<Vec<Table>, ExecError>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut tables = Vec::new();
        for batch in batches {
            if self.is_finished() {
                break;
            }
            tables.extend(self.push(Some(batch), false)?.into_iter().map(|o| o.table));
        }
        if !self.is_finished() {
            tables.extend(self.push(None, true)?.into_iter().map(|o| o.table));
        }
        Ok(tables)
    }
}
