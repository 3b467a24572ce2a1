//! Hash matching phase: produces the `(left, right)` row-index pairs the join
//! flavours consume.

use std::cmp::Ordering;
use std::collections::HashMap;

use qkernel_core::hash::{group_keys, GroupKey};
use qkernel_core::table::Table;

use crate::traits::OpError;

/// Index pairs whose key columns are equal, in left-row order and, per left
/// row, in right-row order. Deleted rows on either side never match.
pub fn hash_match(
    left: &Table,
    left_keys: &[String],
    right: &Table,
    right_keys: &[String],
) -> Result<(Vec<usize>, Vec<usize>), OpError> {
    if left_keys.len() != right_keys.len() {
        return Err(OpError::Config("join key lists differ in length".into()));
    }
    let left_cols = left_keys
        .iter()
        .map(|k| left.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;
    let right_cols = right_keys
        .iter()
        .map(|k| right.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;

    let mut build: HashMap<GroupKey, Vec<usize>> = HashMap::new();
    for (row, key) in group_keys(right, right_keys)?.into_iter().enumerate() {
        if !right.is_deleted_row(row) {
            build.entry(key).or_default().push(row);
        }
    }

    let mut left_out = Vec::new();
    let mut right_out = Vec::new();
    for (l, key) in group_keys(left, left_keys)?.into_iter().enumerate() {
        if left.is_deleted_row(l) {
            continue;
        }
        let Some(candidates) = build.get(&key) else {
            continue;
        };
        for &r in candidates {
            // hashes can collide; confirm on the values
            let equal = left_cols.iter().zip(&right_cols).all(|(&lc, &rc)| {
                match (left.value(lc, l), right.value(rc, r)) {
                    (Some(a), Some(b)) => a.compare(&b) == Some(Ordering::Equal),
                    _ => false,
                }
            });
            if equal {
                left_out.push(l);
                right_out.push(r);
            }
        }
    }
    Ok((left_out, right_out))
}
