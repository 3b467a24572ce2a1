//! Aggregate function objects.
//!
//! Each function is generic over its input's native type and instantiated by
//! an exhaustive match on the input column's `ValueType`. Types a function
//! cannot handle fail at construction with `UnsupportedType`.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use qkernel_core::error::Error as CoreError;
use qkernel_core::schema::{BuiltinType, Field, ValueType};
use qkernel_core::table::Table;
use qkernel_core::types::{Element, NativeType, Value};

use super::accumulator::{Accumulator, Numeric, Summable};
use crate::traits::OpError;

/// Per-row fold bound to one input table.
pub type BoundFold<'t> = Box<dyn Fn(usize, &mut Accumulator) + 't>;

/// Resolved arguments handed to a function constructor.
#[derive(Debug, Clone)]
pub struct FuncArgs {
    /// Input column and its declared type; `None` only for `COUNT()`.
    pub input: Option<(String, ValueType)>,
    pub output: String,
    pub filter: Option<String>,
}

impl FuncArgs {
    fn require_input(&self, func: &str) -> Result<(&str, ValueType), OpError> {
        self.input
            .as_ref()
            .map(|(name, vt)| (name.as_str(), *vt))
            .ok_or_else(|| OpError::Config(format!("{func} needs one input column")))
    }
}

pub trait AggFunction: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Output column (name and type).
    fn output(&self) -> &Field;

    /// Optional bool column; rows where it is false are skipped by this function only.
    fn filter(&self) -> Option<&str>;

    fn new_accumulator(&self) -> Accumulator;

    /// Resolve the input column against `table` and return the per-row fold.
    fn bind<'t>(&self, table: &'t Table) -> Result<BoundFold<'t>, OpError>;
}

// ----- SUM -----

pub struct SumFunction<T> {
    input: String,
    output: Field,
    filter: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for SumFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SumFunction")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl<T: Summable> AggFunction for SumFunction<T> {
    fn name(&self) -> &'static str {
        "SUM"
    }

    fn output(&self) -> &Field {
        &self.output
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    fn new_accumulator(&self) -> Accumulator {
        T::zero()
    }

    fn bind<'t>(&self, table: &'t Table) -> Result<BoundFold<'t>, OpError> {
        let values: &'t [T] = table.values::<T>(&self.input)?;
        Ok(Box::new(move |row, acc| {
            let folded = values[row].fold_into(acc);
            debug_assert!(folded, "SUM accumulator shape does not match input type");
        }))
    }
}

fn sum_of<T: Summable>(input: &str, args: &FuncArgs) -> Box<dyn AggFunction> {
    Box::new(SumFunction::<T> {
        input: input.to_string(),
        output: Field::new(args.output.clone(), ValueType::single(T::SUM_TYPE)),
        filter: args.filter.clone(),
        _marker: PhantomData,
    })
}

pub fn create_sum(args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
    let (input, vt) = args.require_input("SUM")?;
    use BuiltinType::*;
    Ok(match (vt.builtin, vt.multi) {
        (Int8, false) => sum_of::<i8>(input, args),
        (Int16, false) => sum_of::<i16>(input, args),
        (Int32, false) => sum_of::<i32>(input, args),
        (Int64, false) => sum_of::<i64>(input, args),
        (UInt8, false) => sum_of::<u8>(input, args),
        (UInt16, false) => sum_of::<u16>(input, args),
        (UInt32, false) => sum_of::<u32>(input, args),
        (UInt64, false) => sum_of::<u64>(input, args),
        (Float, false) => sum_of::<f32>(input, args),
        (Double, false) => sum_of::<f64>(input, args),
        (String | Bool, false) | (_, true) => {
            return Err(CoreError::UnsupportedType(vt).into());
        }
    })
}

// ----- AVG -----

pub struct AvgFunction<T> {
    input: String,
    output: Field,
    filter: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for AvgFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvgFunction")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl<T: Numeric> AggFunction for AvgFunction<T> {
    fn name(&self) -> &'static str {
        "AVG"
    }

    fn output(&self) -> &Field {
        &self.output
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    fn new_accumulator(&self) -> Accumulator {
        Accumulator::Avg { sum: 0.0, count: 0 }
    }

    fn bind<'t>(&self, table: &'t Table) -> Result<BoundFold<'t>, OpError> {
        let values: &'t [T] = table.values::<T>(&self.input)?;
        Ok(Box::new(move |row, acc| {
            if let Accumulator::Avg { sum, count } = acc {
                *sum += values[row].to_f64();
                *count += 1;
            }
        }))
    }
}

fn avg_of<T: Numeric>(input: &str, args: &FuncArgs) -> Box<dyn AggFunction> {
    Box::new(AvgFunction::<T> {
        input: input.to_string(),
        output: Field::new(args.output.clone(), ValueType::single(BuiltinType::Double)),
        filter: args.filter.clone(),
        _marker: PhantomData,
    })
}

pub fn create_avg(args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
    let (input, vt) = args.require_input("AVG")?;
    use BuiltinType::*;
    Ok(match (vt.builtin, vt.multi) {
        (Int8, false) => avg_of::<i8>(input, args),
        (Int16, false) => avg_of::<i16>(input, args),
        (Int32, false) => avg_of::<i32>(input, args),
        (Int64, false) => avg_of::<i64>(input, args),
        (UInt8, false) => avg_of::<u8>(input, args),
        (UInt16, false) => avg_of::<u16>(input, args),
        (UInt32, false) => avg_of::<u32>(input, args),
        (UInt64, false) => avg_of::<u64>(input, args),
        (Float, false) => avg_of::<f32>(input, args),
        (Double, false) => avg_of::<f64>(input, args),
        (String | Bool, false) | (_, true) => {
            return Err(CoreError::UnsupportedType(vt).into());
        }
    })
}

// ----- COUNT -----

#[derive(Debug)]
pub struct CountFunction {
    output: Field,
    filter: Option<String>,
}

impl AggFunction for CountFunction {
    fn name(&self) -> &'static str {
        "COUNT"
    }

    fn output(&self) -> &Field {
        &self.output
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    fn new_accumulator(&self) -> Accumulator {
        Accumulator::Count(0)
    }

    fn bind<'t>(&self, _table: &'t Table) -> Result<BoundFold<'t>, OpError> {
        Ok(Box::new(|_, acc| {
            if let Accumulator::Count(n) = acc {
                *n += 1;
            }
        }))
    }
}

pub fn create_count(args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
    Ok(Box::new(CountFunction {
        output: Field::new(args.output.clone(), ValueType::single(BuiltinType::Int64)),
        filter: args.filter.clone(),
    }))
}

// ----- IDENTITY / MIN / MAX -----

/// Which row value a `PickFunction` keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// First value seen; group keys pass through unchanged.
    First,
    Min,
    Max,
}

impl Pick {
    fn replaces(self, candidate: Ordering) -> bool {
        match self {
            Pick::First => false,
            Pick::Min => candidate == Ordering::Less,
            Pick::Max => candidate == Ordering::Greater,
        }
    }
}

pub struct PickFunction<T> {
    pick: Pick,
    input: String,
    output: Field,
    filter: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for PickFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickFunction")
            .field("pick", &self.pick)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl<T: NativeType> AggFunction for PickFunction<T> {
    fn name(&self) -> &'static str {
        match self.pick {
            Pick::First => "IDENTITY",
            Pick::Min => "MIN",
            Pick::Max => "MAX",
        }
    }

    fn output(&self) -> &Field {
        &self.output
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    fn new_accumulator(&self) -> Accumulator {
        Accumulator::Pick(Value::Null)
    }

    fn bind<'t>(&self, table: &'t Table) -> Result<BoundFold<'t>, OpError> {
        let values: &'t [T] = table.values::<T>(&self.input)?;
        let pick = self.pick;
        Ok(Box::new(move |row, acc| {
            let Accumulator::Pick(held) = acc else {
                return;
            };
            let candidate = &values[row];
            let replace = match T::from_value(held) {
                Some(current) => pick.replaces(candidate.elem_cmp(current)),
                None => true,
            };
            if replace {
                *held = candidate.clone().into_value();
            }
        }))
    }
}

macro_rules! pick_for {
    ($($variant:ident => $ty:ty, $builtin:ident, $multi:literal;)*) => {
        /// Build a `PickFunction` for any stored type.
        pub fn pick_function(
            pick: Pick,
            input: &str,
            value_type: ValueType,
            output: &str,
            filter: Option<String>,
        ) -> Box<dyn AggFunction> {
            match (value_type.builtin, value_type.multi) {
                $((BuiltinType::$builtin, $multi) => Box::new(PickFunction::<$ty> {
                    pick,
                    input: input.to_string(),
                    output: Field::new(output, value_type),
                    filter,
                    _marker: PhantomData,
                }),)*
            }
        }
    };
}

qkernel_core::for_each_variant!(pick_for);

pub fn create_identity(args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
    let (input, vt) = args.require_input("IDENTITY")?;
    Ok(pick_function(Pick::First, input, vt, &args.output, args.filter.clone()))
}

pub fn create_min(args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
    let (input, vt) = args.require_input("MIN")?;
    Ok(pick_function(Pick::Min, input, vt, &args.output, args.filter.clone()))
}

pub fn create_max(args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
    let (input, vt) = args.require_input("MAX")?;
    Ok(pick_function(Pick::Max, input, vt, &args.output, args.filter.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qkernel_core::column::Column;

    fn args(input: &str, vt: ValueType) -> FuncArgs {
        FuncArgs {
            input: Some((input.to_string(), vt)),
            output: "out".into(),
            filter: None,
        }
    }

    fn fold_all(f: &dyn AggFunction, table: &Table) -> Value {
        let fold = f.bind(table).unwrap();
        let mut acc = f.new_accumulator();
        for row in 0..table.row_count() {
            fold(row, &mut acc);
        }
        acc.result()
    }

    #[test]
    fn sum_widens_output_type() {
        let t = Table::from_columns(vec![Column::from_vec("a", vec![3u8, 250, 4])]).unwrap();
        let f = create_sum(&args("a", ValueType::single(BuiltinType::UInt8))).unwrap();
        assert_eq!(f.output().value_type, ValueType::single(BuiltinType::UInt64));
        assert_eq!(fold_all(f.as_ref(), &t), Value::UInt64(257));
    }

    #[test]
    fn sum_rejects_strings() {
        let err = create_sum(&args("s", ValueType::single(BuiltinType::String))).unwrap_err();
        assert!(matches!(err, OpError::Core(CoreError::UnsupportedType(_))));
        assert!(create_sum(&args("m", ValueType::multi(BuiltinType::Int32))).is_err());
    }

    #[test]
    fn min_max_identity_keep_input_type() {
        let t = Table::from_columns(vec![Column::from_vec(
            "s",
            vec!["m".to_string(), "a".into(), "z".into()],
        )])
        .unwrap();
        let vt = ValueType::single(BuiltinType::String);
        let min = create_min(&args("s", vt)).unwrap();
        let max = create_max(&args("s", vt)).unwrap();
        let first = create_identity(&args("s", vt)).unwrap();
        assert_eq!(fold_all(min.as_ref(), &t), Value::String("a".into()));
        assert_eq!(fold_all(max.as_ref(), &t), Value::String("z".into()));
        assert_eq!(fold_all(first.as_ref(), &t), Value::String("m".into()));
        assert_eq!(first.name(), "IDENTITY");
    }

    #[test]
    fn avg_and_count() {
        let t = Table::from_columns(vec![Column::from_vec("a", vec![1i16, 2, 6])]).unwrap();
        let avg = create_avg(&args("a", ValueType::single(BuiltinType::Int16))).unwrap();
        assert_eq!(fold_all(avg.as_ref(), &t), Value::Double(3.0));
        let count = create_count(&FuncArgs {
            input: None,
            output: "n".into(),
            filter: None,
        })
        .unwrap();
        assert_eq!(fold_all(count.as_ref(), &t), Value::Int64(3));
    }

    #[test]
    fn bind_reports_impossible_cast() {
        let t = Table::from_columns(vec![Column::from_vec("a", vec![1i64])]).unwrap();
        let f = create_sum(&args("a", ValueType::single(BuiltinType::Int32))).unwrap();
        let err = f.bind(&t).err().unwrap();
        assert!(err.to_string().contains("impossible cast"));
    }
}
