//! Per-group accumulator state and the numeric widening table.
//!
//! SUM accumulates in a fixed wider type: signed integers in `i64`, unsigned
//! integers in `u64`, `f32` in `f32` and `f64` in `f64`. Float addition is plain
//! IEEE addition in row order, with no compensation.

use qkernel_core::schema::BuiltinType;
use qkernel_core::types::{NativeType, Value};

/// Opaque per-(group, function) state. One variant per accumulation shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    SumInt(i64),
    SumUInt(u64),
    SumFloat(f32),
    SumDouble(f64),
    Count(i64),
    Avg { sum: f64, count: u64 },
    /// Holds a value of the input type; `Value::Null` until the first row.
    Pick(Value),
}

/// Input types SUM accepts, with the accumulator they widen into.
pub trait Summable: NativeType + Copy {
    const SUM_TYPE: BuiltinType;

    fn zero() -> Accumulator;

    /// Add `self` to `acc`. Returns false if `acc` has the wrong shape.
    fn fold_into(self, acc: &mut Accumulator) -> bool;
}

macro_rules! summable {
    ($variant:ident, $wide:ty, $sum:ident, $add:expr; $($t:ty),*) => {
        $(impl Summable for $t {
            const SUM_TYPE: BuiltinType = BuiltinType::$sum;

            fn zero() -> Accumulator {
                Accumulator::$variant(<$wide>::default())
            }

            #[inline]
            fn fold_into(self, acc: &mut Accumulator) -> bool {
                match acc {
                    Accumulator::$variant(total) => {
                        *total = $add(*total, self as $wide);
                        true
                    }
                    _ => false,
                }
            }
        })*
    };
}

summable!(SumInt, i64, Int64, i64::wrapping_add; i8, i16, i32, i64);
summable!(SumUInt, u64, UInt64, u64::wrapping_add; u8, u16, u32, u64);
summable!(SumFloat, f32, Float, |a: f32, b: f32| a + b; f32);
summable!(SumDouble, f64, Double, |a: f64, b: f64| a + b; f64);

/// Numeric inputs AVG accepts.
pub trait Numeric: NativeType + Copy {
    fn to_f64(self) -> f64;
}

macro_rules! numeric {
    ($($t:ty),*) => {
        $(impl Numeric for $t {
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
        })*
    };
}

numeric!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl Accumulator {
    /// Final value for the output column. `Null` leaves the output cell at
    /// its zero value.
    pub fn result(&self) -> Value {
        match self {
            Accumulator::SumInt(v) => Value::Int64(*v),
            Accumulator::SumUInt(v) => Value::UInt64(*v),
            Accumulator::SumFloat(v) => Value::Float(*v),
            Accumulator::SumDouble(v) => Value::Double(*v),
            Accumulator::Count(v) => Value::Int64(*v),
            Accumulator::Avg { count: 0, .. } => Value::Null,
            Accumulator::Avg { sum, count } => Value::Double(*sum / *count as f64),
            Accumulator::Pick(v) => v.clone(),
        }
    }
}
