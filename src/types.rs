//! Types module: defines the value types and literal values the engine works with.
//!
//! This module provides the ValueType and Value enums, and the Primitive trait
//! that ties a native Rust type to its ValueType tag.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
}

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::Bool,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Float32,
        ValueType::Float64,
        ValueType::Decimal,
    ];

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueType::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ValueType::Int32 | ValueType::Int64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ValueType::Float32 | ValueType::Float64)
    }

    /// Whether a value of this type may stand in for `target` through an
    /// implicit widening conversion.
    pub fn is_assignable_to(&self, target: ValueType) -> bool {
        use ValueType::*;
        if *self == target {
            return true;
        }
        matches!(
            (self, target),
            (Int32, Int64 | Float32 | Float64 | Decimal)
                | (Int64, Float32 | Float64 | Decimal)
                | (Float32, Float64)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
            ValueType::Decimal => "decimal",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::Decimal(_) => ValueType::Decimal,
        }
    }

    /// Bitwise identity: `NaN` is identical to itself, `-0.0` is not `0.0`,
    /// and decimals must agree on scale as well as value.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a.serialize() == b.serialize(),
            _ => self == other,
        }
    }

    /// Extracts the native value, if this value carries `T`'s type.
    pub fn get<T: Primitive>(&self) -> Option<T> {
        T::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}L", v),
            Value::Float32(v) => write!(f, "{:?}f", v),
            Value::Float64(v) => write!(f, "{:?}", v),
            Value::Decimal(v) => write!(f, "{}m", v),
        }
    }
}

/// A native Rust type that has a [`ValueType`] tag and converts to and from [`Value`].
pub trait Primitive: Copy + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const TYPE: ValueType;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

macro_rules! primitives {
    ($( $native:ty => $variant:ident ),* $(,)?) => {
        $(
            impl Primitive for $native {
                const TYPE: ValueType = ValueType::$variant;

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

primitives! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
}
