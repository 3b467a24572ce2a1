//! Convenient re-exports for downstream crates.

pub use crate::column::{Column, ColumnData};
pub use crate::config::KernelDefaults;
pub use crate::error::{Error, Result};
pub use crate::hash::{group_keys, GroupKey};
pub use crate::id::{ArenaEpoch, Generation};
pub use crate::schema::{BuiltinType, Field, Schema, ValueType};
pub use crate::table::{Row, Table};
pub use crate::types::{Element, NativeType, Value};
