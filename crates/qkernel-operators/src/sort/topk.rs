//! Row-index selection helpers shared by the sort kernel.
//!
//! Ties are broken by row index, so repeated top-K passes over a table whose
//! older rows come first give the same result as one stable sort of the
//! whole input.

use std::cmp::Ordering;

use crate::compare::BoundComparator;

#[inline]
fn stable(cmp: &BoundComparator<'_>, a: usize, b: usize) -> Ordering {
    cmp.compare(a, b).then(a.cmp(&b))
}

/// Indices of the `k` smallest rows, in order. O(n + k log k).
pub fn top_k_indices(cmp: &BoundComparator<'_>, rows: usize, k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..rows).collect();
    if k == 0 {
        idx.clear();
        return idx;
    }
    if k < rows {
        idx.select_nth_unstable_by(k - 1, |&a, &b| stable(cmp, a, b));
        idx.truncate(k);
    }
    idx.sort_unstable_by(|&a, &b| stable(cmp, a, b));
    idx
}

/// Stable order of all `rows`.
pub fn sorted_indices(cmp: &BoundComparator<'_>, rows: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..rows).collect();
    idx.sort_by(|&a, &b| cmp.compare(a, b));
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ComboComparator, Direction};
    use qkernel_core::column::Column;
    use qkernel_core::table::Table;

    fn table(a: Vec<i32>) -> Table {
        Table::from_columns(vec![Column::from_vec("a", a)]).unwrap()
    }

    #[test]
    fn selects_smallest_in_order() {
        let t = table(vec![5, 1, 4, 1, 3]);
        let cmp = ComboComparator::new(&t, &["a".to_string()], &[Direction::Asc]).unwrap();
        let bound = cmp.bind(&t).unwrap();
        assert_eq!(top_k_indices(&bound, 5, 3), vec![1, 3, 4]);
        assert_eq!(top_k_indices(&bound, 5, 0), Vec::<usize>::new());
        assert_eq!(top_k_indices(&bound, 5, 10), vec![1, 3, 4, 2, 0]);
    }

    #[test]
    fn full_sort_is_stable() {
        let t = table(vec![2, 1, 2, 1]);
        let cmp = ComboComparator::new(&t, &["a".to_string()], &[Direction::Desc]).unwrap();
        let bound = cmp.bind(&t).unwrap();
        assert_eq!(sorted_indices(&bound, 4), vec![0, 2, 1, 3]);
    }
}
