//! Native value types and the dynamic `Value` cell.
//!
//! `for_each_variant!` is the single list of supported storage kinds. Both
//! `Value` and `ColumnData` (see `column.rs`) are generated from it, and every
//! generic kernel is written once against `NativeType` and instantiated per
//! concrete type by the dispatch sites.

use std::cmp::Ordering;
use std::fmt;

use crate::column::ColumnData;
use crate::schema::{BuiltinType, ValueType};

/// Invoke `$m!` with the full variant table:
/// `Variant => native type, builtin, multi;`
#[macro_export]
macro_rules! for_each_variant {
    ($m:ident) => {
        $m! {
            Int8 => i8, Int8, false;
            Int16 => i16, Int16, false;
            Int32 => i32, Int32, false;
            Int64 => i64, Int64, false;
            UInt8 => u8, UInt8, false;
            UInt16 => u16, UInt16, false;
            UInt32 => u32, UInt32, false;
            UInt64 => u64, UInt64, false;
            Float => f32, Float, false;
            Double => f64, Double, false;
            String => String, String, false;
            Bool => bool, Bool, false;
            MultiInt8 => Vec<i8>, Int8, true;
            MultiInt16 => Vec<i16>, Int16, true;
            MultiInt32 => Vec<i32>, Int32, true;
            MultiInt64 => Vec<i64>, Int64, true;
            MultiUInt8 => Vec<u8>, UInt8, true;
            MultiUInt16 => Vec<u16>, UInt16, true;
            MultiUInt32 => Vec<u32>, UInt32, true;
            MultiUInt64 => Vec<u64>, UInt64, true;
            MultiFloat => Vec<f32>, Float, true;
            MultiDouble => Vec<f64>, Double, true;
            MultiString => Vec<String>, String, true;
            MultiBool => Vec<bool>, Bool, true;
        }
    };
}

/// Total order and stable hashing for a single cell element.
///
/// Floats use IEEE `total_cmp`, so NaN and signed zero have a fixed place and
/// equality stays transitive.
pub trait Element: Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    fn elem_cmp(&self, other: &Self) -> Ordering;
    fn elem_hash(&self, hasher: &mut blake3::Hasher);
}

macro_rules! int_element {
    ($($t:ty),*) => {
        $(impl Element for $t {
            #[inline]
            fn elem_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
            fn elem_hash(&self, hasher: &mut blake3::Hasher) {
                hasher.update(&self.to_le_bytes());
            }
        })*
    };
}

macro_rules! float_element {
    ($($t:ty),*) => {
        $(impl Element for $t {
            #[inline]
            fn elem_cmp(&self, other: &Self) -> Ordering {
                self.total_cmp(other)
            }
            fn elem_hash(&self, hasher: &mut blake3::Hasher) {
                hasher.update(&self.to_bits().to_le_bytes());
            }
        })*
    };
}

int_element!(i8, i16, i32, i64, u8, u16, u32, u64);
float_element!(f32, f64);

impl Element for bool {
    #[inline]
    fn elem_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn elem_hash(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&[*self as u8]);
    }
}

impl Element for String {
    #[inline]
    fn elem_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
    fn elem_hash(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&(self.len() as u64).to_le_bytes());
        hasher.update(self.as_bytes());
    }
}

impl<E: Element> Element for Vec<E> {
    fn elem_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.iter().zip(other.iter()) {
            match a.elem_cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.len().cmp(&other.len())
    }
    fn elem_hash(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&(self.len() as u64).to_le_bytes());
        for e in self {
            e.elem_hash(hasher);
        }
    }
}

/// A Rust type that can be stored in a column.
///
/// Implemented for exactly the kinds listed in `for_each_variant!`.
pub trait NativeType: Element {
    const VALUE_TYPE: ValueType;

    fn slice(data: &ColumnData) -> Option<&[Self]>;
    fn vec_mut(data: &mut ColumnData) -> Option<&mut Vec<Self>>;
    fn into_column_data(values: Vec<Self>) -> ColumnData;
    fn from_value(value: &Value) -> Option<&Self>;
    fn into_value(self) -> Value;
}

macro_rules! impl_native {
    ($($variant:ident => $ty:ty, $builtin:ident, $multi:literal;)*) => {
        $(impl NativeType for $ty {
            const VALUE_TYPE: ValueType = ValueType {
                builtin: BuiltinType::$builtin,
                multi: $multi,
            };

            #[inline]
            fn slice(data: &ColumnData) -> Option<&[Self]> {
                match data {
                    ColumnData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            #[inline]
            fn vec_mut(data: &mut ColumnData) -> Option<&mut Vec<Self>> {
                match data {
                    ColumnData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_column_data(values: Vec<Self>) -> ColumnData {
                ColumnData::$variant(values)
            }

            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        })*
    };
}

for_each_variant!(impl_native);

macro_rules! define_value {
    ($($variant:ident => $ty:ty, $builtin:ident, $multi:literal;)*) => {
        /// One dynamically-typed cell. Used at the edges (tests, predicates,
        /// accumulator results), never on the per-row hot path of a typed kernel.
        #[derive(Debug, Clone, PartialEq, Default)]
        pub enum Value {
            #[default]
            Null,
            $($variant($ty),)*
        }

        impl Value {
            pub fn value_type(&self) -> Option<ValueType> {
                match self {
                    Value::Null => None,
                    $(Value::$variant(_) => Some(<$ty as NativeType>::VALUE_TYPE),)*
                }
            }

            /// Compare two cells of the same type. `None` for mixed types or nulls.
            pub fn compare(&self, other: &Value) -> Option<Ordering> {
                match (self, other) {
                    $((Value::$variant(a), Value::$variant(b)) => Some(a.elem_cmp(b)),)*
                    _ => None,
                }
            }

            pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
                match self {
                    Value::Null => {
                        hasher.update(&[0xff]);
                    }
                    $(Value::$variant(v) => v.elem_hash(hasher),)*
                }
            }
        }
    };
}

for_each_variant!(define_value);

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a literal for a single-valued column type. Strings may be quoted
    /// with `'` or `"`. Multi-value literals are not supported.
    pub fn parse_literal(literal: &str, value_type: ValueType) -> Option<Value> {
        if value_type.multi {
            return None;
        }
        let s = literal.trim();
        let v = match value_type.builtin {
            BuiltinType::Int8 => Value::Int8(s.parse().ok()?),
            BuiltinType::Int16 => Value::Int16(s.parse().ok()?),
            BuiltinType::Int32 => Value::Int32(s.parse().ok()?),
            BuiltinType::Int64 => Value::Int64(s.parse().ok()?),
            BuiltinType::UInt8 => Value::UInt8(s.parse().ok()?),
            BuiltinType::UInt16 => Value::UInt16(s.parse().ok()?),
            BuiltinType::UInt32 => Value::UInt32(s.parse().ok()?),
            BuiltinType::UInt64 => Value::UInt64(s.parse().ok()?),
            BuiltinType::Float => Value::Float(s.parse().ok()?),
            BuiltinType::Double => Value::Double(s.parse().ok()?),
            BuiltinType::Bool => Value::Bool(s.parse().ok()?),
            BuiltinType::String => {
                let unquoted = s
                    .strip_prefix('\'')
                    .and_then(|r| r.strip_suffix('\''))
                    .or_else(|| s.strip_prefix('"').and_then(|r| r.strip_suffix('"')))
                    .unwrap_or(s);
                Value::String(unquoted.to_string())
            }
        };
        Some(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::String(s) => f.write_str(s),
            other => {
                // Debug output is `Variant(payload)`; print just the payload.
                let dbg = format!("{:?}", other);
                let payload = dbg
                    .split_once('(')
                    .map(|(_, rest)| rest.trim_end_matches(')'))
                    .unwrap_or(&dbg);
                f.write_str(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_value_types() {
        assert_eq!(i32::VALUE_TYPE, ValueType::single(BuiltinType::Int32));
        assert_eq!(
            <Vec<String>>::VALUE_TYPE,
            ValueType::multi(BuiltinType::String)
        );
        assert_eq!(
            Value::MultiDouble(vec![1.0]).value_type(),
            Some(ValueType::multi(BuiltinType::Double))
        );
        assert_eq!(Value::Null.value_type(), None);
    }

    #[test]
    fn float_order_is_total() {
        assert_eq!(f64::NAN.elem_cmp(&f64::NAN), Ordering::Equal);
        assert_eq!((-0.0f32).elem_cmp(&0.0), Ordering::Less);
        assert_eq!(1.0f64.elem_cmp(&f64::NAN), Ordering::Less);
    }

    #[test]
    fn multi_value_is_lexicographic() {
        assert_eq!(vec![1i32, 2].elem_cmp(&vec![1, 3]), Ordering::Less);
        assert_eq!(vec![1i32, 2].elem_cmp(&vec![1]), Ordering::Greater);
        assert_eq!(Vec::<i8>::new().elem_cmp(&vec![]), Ordering::Equal);
    }

    #[test]
    fn compare_mixed_types_is_none() {
        assert_eq!(Value::Int32(1).compare(&Value::Int64(1)), None);
        assert_eq!(
            Value::Int32(1).compare(&Value::Int32(2)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn parse_literals() {
        let int32 = ValueType::single(BuiltinType::Int32);
        assert_eq!(Value::parse_literal(" 42 ", int32), Some(Value::Int32(42)));
        assert_eq!(Value::parse_literal("x", int32), None);
        let string = ValueType::single(BuiltinType::String);
        assert_eq!(
            Value::parse_literal("'abc'", string),
            Some(Value::String("abc".into()))
        );
        assert_eq!(
            Value::parse_literal("1", ValueType::multi(BuiltinType::Int8)),
            None
        );
    }

    #[test]
    fn display_prints_payload() {
        assert_eq!(Value::Int32(7).to_string(), "7");
        assert_eq!(Value::String("a".into()).to_string(), "a");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
