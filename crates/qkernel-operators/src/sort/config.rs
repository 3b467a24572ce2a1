use serde::{Deserialize, Serialize};

use crate::compare::Direction;
use crate::traits::OpError;

fn unlimited() -> usize {
    usize::MAX
}

/// `{order_fields: [..], directions: ["ASC"|"DESC"], limit, offset}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(alias = "orderFields")]
    pub order_fields: Vec<String>,
    /// One per order field. Empty means all ascending.
    #[serde(default)]
    pub directions: Vec<Direction>,
    #[serde(default = "unlimited")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl SortConfig {
    pub fn new(order_fields: &[&str], directions: &[Direction]) -> Self {
        Self {
            order_fields: order_fields.iter().map(|s| s.to_string()).collect(),
            directions: directions.to_vec(),
            limit: unlimited(),
            offset: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Rows that must survive every intermediate pass.
    pub fn top_k(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }

    pub fn validate(&mut self) -> Result<(), OpError> {
        if self.order_fields.is_empty() {
            return Err(OpError::Config("sort needs at least one order field".into()));
        }
        if self.directions.is_empty() {
            self.directions = vec![Direction::Asc; self.order_fields.len()];
        }
        if self.directions.len() != self.order_fields.len() {
            return Err(OpError::Config(format!(
                "{} order fields but {} directions",
                self.order_fields.len(),
                self.directions.len()
            )));
        }
        Ok(())
    }
}
