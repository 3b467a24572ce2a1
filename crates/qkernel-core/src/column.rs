//! Typed columnar storage.
//!
//! `ColumnData` is one contiguous vector per supported kind. Every method is an
//! exhaustive match generated from `for_each_variant!`, so a new storage kind
//! cannot be added without every operation handling it.

use std::cmp::Ordering;

use bitvec::slice::BitSlice;

use crate::error::{Error, Result};
use crate::schema::{BuiltinType, Field, ValueType};
use crate::types::{Element, NativeType, Value};

macro_rules! define_column_data {
    ($($variant:ident => $ty:ty, $builtin:ident, $multi:literal;)*) => {
        /// Physical storage for one column.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ColumnData {
            $($variant(Vec<$ty>),)*
        }

        impl ColumnData {
            /// Empty storage for `value_type`.
            pub fn new(value_type: ValueType) -> Self {
                match (value_type.builtin, value_type.multi) {
                    $((BuiltinType::$builtin, $multi) => ColumnData::$variant(Vec::new()),)*
                }
            }

            pub fn value_type(&self) -> ValueType {
                match self {
                    $(ColumnData::$variant(_) => <$ty as NativeType>::VALUE_TYPE,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(ColumnData::$variant(v) => v.len(),)*
                }
            }

            /// Grow or shrink to `len` cells; new cells get the type's zero value.
            pub fn resize(&mut self, len: usize) {
                match self {
                    $(ColumnData::$variant(v) => v.resize(len, Default::default()),)*
                }
            }

            pub fn truncate(&mut self, len: usize) {
                match self {
                    $(ColumnData::$variant(v) => v.truncate(len),)*
                }
            }

            /// Drop every cell whose bit is set in `deleted`, keeping order.
            pub fn remove_marked(&mut self, deleted: &BitSlice) {
                match self {
                    $(ColumnData::$variant(v) => {
                        let mut idx = 0;
                        v.retain(|_| {
                            let keep = !deleted[idx];
                            idx += 1;
                            keep
                        });
                    })*
                }
            }

            /// New storage holding the cells at `indices`, in that order.
            pub fn take(&self, indices: &[usize]) -> ColumnData {
                match self {
                    $(ColumnData::$variant(v) => {
                        ColumnData::$variant(indices.iter().map(|&i| v[i].clone()).collect())
                    })*
                }
            }

            /// Append the cells of `other` not marked in `skip`. Returns false
            /// when the two columns hold different kinds.
            pub fn extend_from(&mut self, other: &ColumnData, skip: &BitSlice) -> bool {
                match (self, other) {
                    $((ColumnData::$variant(dst), ColumnData::$variant(src)) => {
                        dst.extend(
                            src.iter()
                                .enumerate()
                                .filter(|(i, _)| !skip.get(*i).map(|b| *b).unwrap_or(false))
                                .map(|(_, v)| v.clone()),
                        );
                        true
                    })*
                    _ => false,
                }
            }

            /// `self[dst] = src[src_row]`. Returns false on a kind mismatch.
            pub fn copy_cell(&mut self, dst: usize, src: &ColumnData, src_row: usize) -> bool {
                match (self, src) {
                    $((ColumnData::$variant(d), ColumnData::$variant(s)) => {
                        d[dst] = s[src_row].clone();
                        true
                    })*
                    _ => false,
                }
            }

            pub fn get(&self, row: usize) -> Option<Value> {
                match self {
                    $(ColumnData::$variant(v) => v.get(row).cloned().map(Value::$variant),)*
                }
            }

            /// Overwrite one cell. Returns false if `value` is of another kind.
            pub fn set(&mut self, row: usize, value: &Value) -> bool {
                match (self, value) {
                    $((ColumnData::$variant(v), Value::$variant(x)) => {
                        v[row] = x.clone();
                        true
                    })*
                    _ => false,
                }
            }

            pub fn compare_rows(&self, a: usize, b: usize) -> Ordering {
                match self {
                    $(ColumnData::$variant(v) => v[a].elem_cmp(&v[b]),)*
                }
            }

            pub fn hash_cell(&self, row: usize, hasher: &mut blake3::Hasher) {
                match self {
                    $(ColumnData::$variant(v) => v[row].elem_hash(hasher),)*
                }
            }
        }
    };
}

crate::for_each_variant!(define_column_data);

impl ColumnData {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single named, typed vector of values. Owned by exactly one `Table`;
/// logical row deletion is tracked by the table, not the column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::new(value_type),
        }
    }

    pub fn from_vec<T: NativeType>(name: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            data: T::into_column_data(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.data.value_type()
    }

    pub fn field(&self) -> Field {
        Field::new(self.name.clone(), self.value_type())
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Typed view of the cells. Fails with "impossible cast" when `T` is not
    /// the declared type.
    pub fn values<T: NativeType>(&self) -> Result<&[T]> {
        T::slice(&self.data).ok_or_else(|| self.cast_error::<T>())
    }

    pub(crate) fn values_mut<T: NativeType>(&mut self) -> Result<&mut Vec<T>> {
        let expected = T::VALUE_TYPE;
        let actual = self.value_type();
        let name = self.name.clone();
        T::vec_mut(&mut self.data).ok_or(Error::TypeMismatch {
            column: name,
            expected,
            actual,
        })
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        self.data.get(row)
    }

    fn cast_error<T: NativeType>(&self) -> Error {
        Error::TypeMismatch {
            column: self.name.clone(),
            expected: T::VALUE_TYPE,
            actual: self.value_type(),
        }
    }
}
