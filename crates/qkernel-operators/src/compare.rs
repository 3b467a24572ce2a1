//! Type-specialized row comparators.
//!
//! A `ComboComparator` is built once per kernel from column names and
//! directions. Each key is a `TypedComparator<T>` chosen by an exhaustive match
//! on the column's `ValueType`. Comparators hold the column *name*, not a
//! reference, so they outlive any table mutation that keeps the column; before
//! comparing, `bind` resolves every key to a typed slice once so the per-pair
//! comparison is a plain slice lookup.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use qkernel_core::schema::{BuiltinType, ValueType};
use qkernel_core::table::{Row, Table};
use qkernel_core::types::{Element, NativeType};
use serde::{Deserialize, Serialize};

use crate::traits::OpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

type KeyFn<'t> = Box<dyn Fn(usize, usize) -> Ordering + 't>;

/// A single-column comparator that can be bound to a table.
pub trait ColumnComparator: Send + Sync + fmt::Debug {
    fn column(&self) -> &str;
    fn direction(&self) -> Direction;
    fn bind<'t>(&self, table: &'t Table) -> Result<KeyFn<'t>, OpError>;
}

pub struct TypedComparator<T> {
    column: String,
    direction: Direction,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for TypedComparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedComparator")
            .field("column", &self.column)
            .field("type", &std::any::type_name::<T>())
            .field("direction", &self.direction)
            .finish()
    }
}

impl<T: NativeType> TypedComparator<T> {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
            _marker: PhantomData,
        }
    }
}

impl<T: NativeType> ColumnComparator for TypedComparator<T> {
    fn column(&self) -> &str {
        &self.column
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn bind<'t>(&self, table: &'t Table) -> Result<KeyFn<'t>, OpError> {
        let values: &'t [T] = table.values::<T>(&self.column)?;
        let key: KeyFn<'t> = match self.direction {
            Direction::Asc => Box::new(move |a, b| values[a].elem_cmp(&values[b])),
            Direction::Desc => Box::new(move |a, b| values[b].elem_cmp(&values[a])),
        };
        Ok(key)
    }
}

macro_rules! typed_comparator_for {
    ($($variant:ident => $ty:ty, $builtin:ident, $multi:literal;)*) => {
        /// Instantiate the comparator matching `value_type`.
        pub fn typed_comparator(
            column: &str,
            value_type: ValueType,
            direction: Direction,
        ) -> Box<dyn ColumnComparator> {
            match (value_type.builtin, value_type.multi) {
                $((BuiltinType::$builtin, $multi) => {
                    Box::new(TypedComparator::<$ty>::new(column, direction))
                })*
            }
        }
    };
}

qkernel_core::for_each_variant!(typed_comparator_for);

/// Ordered composition of single-column comparators. The first key that
/// is not equal decides; all-equal compares `Equal`.
#[derive(Debug)]
pub struct ComboComparator {
    keys: Vec<Box<dyn ColumnComparator>>,
}

impl ComboComparator {
    /// Build one comparator per `(column, direction)` against `table`'s schema.
    pub fn new(
        table: &Table,
        columns: &[String],
        directions: &[Direction],
    ) -> Result<Self, OpError> {
        if columns.len() != directions.len() {
            return Err(OpError::Config(format!(
                "{} sort columns but {} directions",
                columns.len(),
                directions.len()
            )));
        }
        let mut keys = Vec::with_capacity(columns.len());
        for (name, &direction) in columns.iter().zip(directions) {
            let column = table
                .column(name)
                .ok_or_else(|| OpError::Config(format!("invalid column name '{name}'")))?;
            keys.push(typed_comparator(name, column.value_type(), direction));
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve every key against `table`. Fails with "impossible cast" if a
    /// column changed type since construction, or if it disappeared.
    pub fn bind<'t>(&self, table: &'t Table) -> Result<BoundComparator<'t>, OpError> {
        let keys = self
            .keys
            .iter()
            .map(|k| k.bind(table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BoundComparator { keys })
    }

    /// Compare two row handles of `table`. Binds on every call; use `bind`
    /// for bulk work.
    pub fn compare(&self, table: &Table, a: Row, b: Row) -> Result<Ordering, OpError> {
        let a = table.resolve(a)?;
        let b = table.resolve(b)?;
        Ok(self.bind(table)?.compare(a, b))
    }
}

pub struct BoundComparator<'t> {
    keys: Vec<KeyFn<'t>>,
}

impl BoundComparator<'_> {
    #[inline]
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        for key in &self.keys {
            match key(a, b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qkernel_core::column::Column;

    fn table() -> Table {
        Table::from_columns(vec![
            Column::from_vec("g", vec![1i32, 1, 2, 2]),
            Column::from_vec("v", vec![0.5f64, 1.5, -1.0, 1.5]),
            Column::from_vec("s", vec!["b".to_string(), "a".into(), "a".into(), "c".into()]),
            Column::from_vec("m", vec![vec![1u8, 2], vec![1], vec![], vec![3]]),
        ])
        .unwrap()
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_non_equal_key_decides() {
        let t = table();
        let cmp =
            ComboComparator::new(&t, &names(&["g", "v"]), &[Direction::Asc, Direction::Desc])
                .unwrap();
        let bound = cmp.bind(&t).unwrap();
        assert_eq!(bound.compare(0, 2), Ordering::Less);
        // same group, v descending
        assert_eq!(bound.compare(0, 1), Ordering::Greater);
        assert_eq!(bound.compare(1, 1), Ordering::Equal);
    }

    #[test]
    fn descending_ties_fall_through() {
        let t = table();
        let cmp =
            ComboComparator::new(&t, &names(&["v", "s"]), &[Direction::Desc, Direction::Asc])
                .unwrap();
        let bound = cmp.bind(&t).unwrap();
        // v equal (1.5), s "a" < "c"
        assert_eq!(bound.compare(1, 3), Ordering::Less);
    }

    #[test]
    fn multi_value_and_string_keys() {
        let t = table();
        let cmp = ComboComparator::new(&t, &names(&["m"]), &[Direction::Asc]).unwrap();
        let bound = cmp.bind(&t).unwrap();
        assert_eq!(bound.compare(2, 1), Ordering::Less);
        assert_eq!(bound.compare(1, 0), Ordering::Less);
    }

    #[test]
    fn invalid_column_name() {
        let t = table();
        let err = ComboComparator::new(&t, &names(&["nope"]), &[Direction::Asc]).unwrap_err();
        assert!(err.to_string().contains("invalid column name"));
    }

    #[test]
    fn direction_count_must_match() {
        let t = table();
        assert!(matches!(
            ComboComparator::new(&t, &names(&["g"]), &[]),
            Err(OpError::Config(_))
        ));
    }

    #[test]
    fn bind_detects_retyped_column() {
        let t = table();
        let cmp = ComboComparator::new(&t, &names(&["g"]), &[Direction::Asc]).unwrap();
        let other = Table::from_columns(vec![Column::from_vec("g", vec![1i64])]).unwrap();
        let err = cmp.bind(&other).err().unwrap();
        assert!(err.to_string().contains("impossible cast"));
    }

    #[test]
    fn stale_row_handles_are_rejected() {
        let mut t = table();
        let cmp = ComboComparator::new(&t, &names(&["g"]), &[Direction::Asc]).unwrap();
        let (a, b) = (t.row(0), t.row(2));
        assert_eq!(cmp.compare(&t, a, b).unwrap(), Ordering::Less);
        t.mark_delete_row(1);
        t.delete_rows();
        assert!(cmp.compare(&t, a, b).is_err());
    }

    #[test]
    fn directions_deserialize() {
        let dirs: Vec<Direction> = serde_json::from_str(r#"["ASC", "desc"]"#).unwrap();
        assert_eq!(dirs, vec![Direction::Asc, Direction::Desc]);
    }

    mod totality {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn equality_is_transitive(
                ints in proptest::collection::vec(-3i64..3, 3),
                floats in proptest::collection::vec(prop_oneof![
                    Just(f64::NAN), Just(0.0), Just(-0.0), Just(1.0)
                ], 3),
                strs in proptest::collection::vec("[ab]{0,2}", 3),
                desc in any::<bool>(),
            ) {
                let t = Table::from_columns(vec![
                    Column::from_vec("i", ints),
                    Column::from_vec("f", floats),
                    Column::from_vec("s", strs),
                ]).unwrap();
                let dir = if desc { Direction::Desc } else { Direction::Asc };
                let cmp = ComboComparator::new(
                    &t,
                    &names(&["i", "f", "s"]),
                    &[dir, Direction::Asc, dir],
                ).unwrap();
                let bound = cmp.bind(&t).unwrap();
                let (a, b, c) = (0, 1, 2);
                if bound.compare(a, b) == Ordering::Equal && bound.compare(b, c) == Ordering::Equal {
                    prop_assert_eq!(bound.compare(a, c), Ordering::Equal);
                }
                prop_assert_eq!(bound.compare(a, b), bound.compare(b, a).reverse());
                if bound.compare(a, b) == Ordering::Less && bound.compare(b, c) == Ordering::Less {
                    prop_assert_eq!(bound.compare(a, c), Ordering::Less);
                }
            }
        }
    }
}
