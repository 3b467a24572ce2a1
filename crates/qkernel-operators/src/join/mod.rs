//! Row-index based joins.
//!
//! A matching phase (`hash_match`, or any external matcher) yields parallel
//! `(left, right)` row-index arrays; a `Join` turns them into output rows and,
//! for LEFT joins, fills left rows that never matched.

pub mod base;
pub mod hash;
pub mod inner;
pub mod kernel;
pub mod left;
pub mod predicate;

use serde::{Deserialize, Serialize};

use qkernel_core::table::Table;

use crate::traits::OpError;

pub use base::JoinBase;
pub use hash::hash_match;
pub use inner::InnerJoin;
pub use kernel::HashJoinKernel;
pub use left::{JoinedFlags, LeftJoin};
pub use predicate::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    #[default]
    Left,
}

/// `{leftKeys, rightKeys, outputFields, filter, joinType}`.
///
/// `output_fields`, when given, renames every left column and then every
/// right column, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    #[serde(alias = "leftKeys")]
    pub left_keys: Vec<String>,
    #[serde(alias = "rightKeys")]
    pub right_keys: Vec<String>,
    #[serde(default, alias = "outputFields")]
    pub output_fields: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default, alias = "joinType")]
    pub join_type: JoinType,
}

/// One join flavour driven by externally computed row-index pairs.
pub trait Join {
    fn base(&self) -> &JoinBase;

    /// Declare `output`'s schema (left columns, then right columns) and reset
    /// per-left-row bookkeeping to `left`'s current size.
    fn init_joined_table(
        &mut self,
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError>;

    /// Append one output row per `(left_indices[i], right_indices[i])` and
    /// apply the filter. May be called repeatedly against the same output.
    fn generate_result_table(
        &mut self,
        left_indices: &[usize],
        right_indices: &[usize],
        left: &Table,
        right: &Table,
        output: &mut Table,
    ) -> Result<(), OpError>;

    /// The left side is exhausted up to `total_left_count`.
    fn finish(
        &mut self,
        left: &Table,
        total_left_count: usize,
        output: &mut Table,
    ) -> Result<(), OpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_camel_case_json() {
        let cfg: JoinConfig = serde_json::from_str(
            r#"{"leftKeys": ["g"], "rightKeys": ["g"], "outputFields": ["a", "b"],
                "filter": "a > b", "joinType": "inner"}"#,
        )
        .unwrap();
        assert_eq!(cfg.join_type, JoinType::Inner);
        assert_eq!(cfg.filter.as_deref(), Some("a > b"));
    }

    #[test]
    fn malformed_filter_aborts_construction() {
        let cfg = JoinConfig {
            left_keys: vec!["g".into()],
            right_keys: vec!["g".into()],
            filter: Some("g >".into()),
            ..JoinConfig::default()
        };
        assert!(LeftJoin::new(cfg.clone()).is_err());
        assert!(InnerJoin::new(cfg).is_err());
    }

    #[test]
    fn key_count_mismatch() {
        let cfg = JoinConfig {
            left_keys: vec!["a".into(), "b".into()],
            right_keys: vec!["a".into()],
            ..JoinConfig::default()
        };
        assert!(matches!(LeftJoin::new(cfg), Err(OpError::Config(_))));
    }
}
