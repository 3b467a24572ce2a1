//! Stable row hashing for group keys and join keys.
//!
//! Group keys are opaque `u64`s; callers that need exact grouping on colliding
//! hashes must verify the key columns themselves (the join matcher does).

use blake3::Hasher;

use crate::error::Result;
use crate::table::Table;

pub type GroupKey = u64;

/// One hash per row over the values of `columns`, in order.
///
/// Deleted rows still get a key so the result stays parallel to the rows.
pub fn group_keys(table: &Table, columns: &[String]) -> Result<Vec<GroupKey>> {
    let indices = columns
        .iter()
        .map(|name| table.require_column(name))
        .collect::<Result<Vec<_>>>()?;

    let mut keys = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let mut hasher = Hasher::new();
        for &col_idx in &indices {
            if let Some(col) = table.column_at(col_idx) {
                col.data().hash_cell(row, &mut hasher);
            }
        }
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[0..8]);
        keys.push(u64::from_le_bytes(head));
    }
    Ok(keys)
}
