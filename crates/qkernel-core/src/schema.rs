//! Logical schema types. Pure data; the typed storage lives in `column.rs`.
//!
//! The type set is closed: every operator that touches raw column data matches
//! exhaustively on `BuiltinType` (and the multi-value flag), so adding a type is
//! a compile error at every unhandled site.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Native element kinds a column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Bool,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 12] = [
        BuiltinType::Int8,
        BuiltinType::Int16,
        BuiltinType::Int32,
        BuiltinType::Int64,
        BuiltinType::UInt8,
        BuiltinType::UInt16,
        BuiltinType::UInt32,
        BuiltinType::UInt64,
        BuiltinType::Float,
        BuiltinType::Double,
        BuiltinType::String,
        BuiltinType::Bool,
    ];

    pub fn is_numeric(self) -> bool {
        !matches!(self, BuiltinType::String | BuiltinType::Bool)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Int8 => "int8",
            BuiltinType::Int16 => "int16",
            BuiltinType::Int32 => "int32",
            BuiltinType::Int64 => "int64",
            BuiltinType::UInt8 => "uint8",
            BuiltinType::UInt16 => "uint16",
            BuiltinType::UInt32 => "uint32",
            BuiltinType::UInt64 => "uint64",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::String => "string",
            BuiltinType::Bool => "bool",
        }
    }
}

/// Runtime type of a column: a builtin element type, optionally multi-valued
/// (each cell is a list of elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueType {
    pub builtin: BuiltinType,
    pub multi: bool,
}

impl ValueType {
    pub const fn single(builtin: BuiltinType) -> Self {
        Self {
            builtin,
            multi: false,
        }
    }

    pub const fn multi(builtin: BuiltinType) -> Self {
        Self {
            builtin,
            multi: true,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multi {
            write!(f, "multi<{}>", self.builtin.name())
        } else {
            f.write_str(self.builtin.name())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value_type: ValueType,
}

impl Field {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

/// Ordered list of fields; order is the output column order of a `Table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_display() {
        assert_eq!(ValueType::single(BuiltinType::Int32).to_string(), "int32");
        assert_eq!(
            ValueType::multi(BuiltinType::String).to_string(),
            "multi<string>"
        );
    }

    #[test]
    fn schema_lookup() {
        let schema = Schema::new(vec![
            Field::new("id", ValueType::single(BuiltinType::Int64)),
            Field::new("tags", ValueType::multi(BuiltinType::String)),
        ]);
        assert_eq!(schema.index_of("tags"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
        assert_eq!(schema.len(), 2);
    }
}
