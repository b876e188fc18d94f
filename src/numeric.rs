//! Numeric module: per-type arithmetic, comparison and bitwise semantics.
//!
//! Every operator in the catalog bottoms out in one of the kernels defined here,
//! both when folding constants at compile time and when a lowered callable runs.
//! Integers wrap on add/subtract/multiply/negate and trap on division by zero,
//! floats follow IEEE 754, and decimals are exact with overflow detection.

use crate::types::{Primitive, Value};
use crate::EvalError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::cmp::Ordering;

pub trait Numeric: Primitive {
    const ZERO: Self;
    const ONE: Self;
    const MINUS_ONE: Self;

    fn plus(self, rhs: Self) -> Result<Self, EvalError>;
    fn minus(self, rhs: Self) -> Result<Self, EvalError>;
    fn times(self, rhs: Self) -> Result<Self, EvalError>;
    fn divide(self, rhs: Self) -> Result<Self, EvalError>;
    fn remainder(self, rhs: Self) -> Result<Self, EvalError>;
    fn negate(self) -> Self;

    /// Native three-way comparison.
    fn three_way(self, rhs: Self) -> Ordering;

    /// Explicit numeric conversion from any numeric value.
    fn cast_from(value: &Value) -> Result<Self, EvalError>;
}

/// Types supporting `&`, `|`, `^` and `!`. `NONE` and `ALL` are the absorbing
/// and identity elements of `&` (and the reverse for `|`).
pub trait Bitwise: Primitive {
    const NONE: Self;
    const ALL: Self;

    fn and(self, rhs: Self) -> Self;
    fn or(self, rhs: Self) -> Self;
    fn xor(self, rhs: Self) -> Self;
    fn not(self) -> Self;
}

macro_rules! integer_numeric {
    ($($native:ty),*) => {
        $(
            impl Numeric for $native {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const MINUS_ONE: Self = -1;

                fn plus(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self.wrapping_add(rhs))
                }

                fn minus(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self.wrapping_sub(rhs))
                }

                fn times(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self.wrapping_mul(rhs))
                }

                fn divide(self, rhs: Self) -> Result<Self, EvalError> {
                    if rhs == 0 {
                        return Err(EvalError::DivideByZero);
                    }
                    self.checked_div(rhs).ok_or(EvalError::Overflow)
                }

                fn remainder(self, rhs: Self) -> Result<Self, EvalError> {
                    if rhs == 0 {
                        return Err(EvalError::DivideByZero);
                    }
                    self.checked_rem(rhs).ok_or(EvalError::Overflow)
                }

                fn negate(self) -> Self {
                    self.wrapping_neg()
                }

                fn three_way(self, rhs: Self) -> Ordering {
                    self.cmp(&rhs)
                }

                fn cast_from(value: &Value) -> Result<Self, EvalError> {
                    match *value {
                        Value::Int32(v) => Ok(v as $native),
                        Value::Int64(v) => Ok(v as $native),
                        // `as` saturates out-of-range floats and maps NaN to zero
                        Value::Float32(v) => Ok(v as $native),
                        Value::Float64(v) => Ok(v as $native),
                        Value::Decimal(v) => v
                            .trunc()
                            .to_i128()
                            .and_then(|v| <$native>::try_from(v).ok())
                            .ok_or(EvalError::Overflow),
                        Value::Bool(_) => Err(EvalError::TypeMismatch {
                            expected: <$native as Primitive>::TYPE,
                            actual: value.value_type(),
                        }),
                    }
                }
            }

            impl Bitwise for $native {
                const NONE: Self = 0;
                const ALL: Self = -1;

                fn and(self, rhs: Self) -> Self {
                    self & rhs
                }

                fn or(self, rhs: Self) -> Self {
                    self | rhs
                }

                fn xor(self, rhs: Self) -> Self {
                    self ^ rhs
                }

                fn not(self) -> Self {
                    !self
                }
            }
        )*
    };
}

integer_numeric!(i32, i64);

macro_rules! float_numeric {
    ($($native:ty => $from_decimal:ident),*) => {
        $(
            impl Numeric for $native {
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;
                const MINUS_ONE: Self = -1.0;

                fn plus(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self + rhs)
                }

                fn minus(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self - rhs)
                }

                fn times(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self * rhs)
                }

                fn divide(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self / rhs)
                }

                fn remainder(self, rhs: Self) -> Result<Self, EvalError> {
                    Ok(self % rhs)
                }

                fn negate(self) -> Self {
                    -self
                }

                fn three_way(self, rhs: Self) -> Ordering {
                    match self.partial_cmp(&rhs) {
                        Some(ordering) => ordering,
                        // NaN sorts below every number and equal to itself
                        None => match (self.is_nan(), rhs.is_nan()) {
                            (true, true) => Ordering::Equal,
                            (true, false) => Ordering::Less,
                            _ => Ordering::Greater,
                        },
                    }
                }

                fn cast_from(value: &Value) -> Result<Self, EvalError> {
                    match *value {
                        Value::Int32(v) => Ok(v as $native),
                        Value::Int64(v) => Ok(v as $native),
                        Value::Float32(v) => Ok(v as $native),
                        Value::Float64(v) => Ok(v as $native),
                        Value::Decimal(v) => v.$from_decimal().ok_or(EvalError::Overflow),
                        Value::Bool(_) => Err(EvalError::TypeMismatch {
                            expected: <$native as Primitive>::TYPE,
                            actual: value.value_type(),
                        }),
                    }
                }
            }
        )*
    };
}

float_numeric!(f32 => to_f32, f64 => to_f64);

impl Numeric for Decimal {
    const ZERO: Self = Decimal::ZERO;
    const ONE: Self = Decimal::ONE;
    const MINUS_ONE: Self = Decimal::NEGATIVE_ONE;

    fn plus(self, rhs: Self) -> Result<Self, EvalError> {
        self.checked_add(rhs).ok_or(EvalError::Overflow)
    }

    fn minus(self, rhs: Self) -> Result<Self, EvalError> {
        self.checked_sub(rhs).ok_or(EvalError::Overflow)
    }

    fn times(self, rhs: Self) -> Result<Self, EvalError> {
        self.checked_mul(rhs).ok_or(EvalError::Overflow)
    }

    fn divide(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivideByZero);
        }
        self.checked_div(rhs).ok_or(EvalError::Overflow)
    }

    fn remainder(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivideByZero);
        }
        self.checked_rem(rhs).ok_or(EvalError::Overflow)
    }

    fn negate(self) -> Self {
        -self
    }

    fn three_way(self, rhs: Self) -> Ordering {
        self.cmp(&rhs)
    }

    fn cast_from(value: &Value) -> Result<Self, EvalError> {
        match *value {
            Value::Int32(v) => Ok(Decimal::from(v)),
            Value::Int64(v) => Ok(Decimal::from(v)),
            Value::Float32(v) => Decimal::from_f32(v).ok_or(EvalError::Overflow),
            Value::Float64(v) => Decimal::from_f64(v).ok_or(EvalError::Overflow),
            Value::Decimal(v) => Ok(v),
            Value::Bool(_) => Err(EvalError::TypeMismatch {
                expected: <Decimal as Primitive>::TYPE,
                actual: value.value_type(),
            }),
        }
    }
}

impl Bitwise for bool {
    const NONE: Self = false;
    const ALL: Self = true;

    fn and(self, rhs: Self) -> Self {
        self & rhs
    }

    fn or(self, rhs: Self) -> Self {
        self | rhs
    }

    fn xor(self, rhs: Self) -> Self {
        self ^ rhs
    }

    fn not(self) -> Self {
        !self
    }
}

fn operand<T: Primitive>(value: &Value) -> Result<T, EvalError> {
    T::from_value(value).ok_or(EvalError::TypeMismatch {
        expected: T::TYPE,
        actual: value.value_type(),
    })
}

fn operands<T: Primitive>(left: &Value, right: &Value) -> Result<(T, T), EvalError> {
    Ok((operand(left)?, operand(right)?))
}

macro_rules! arithmetic_kernels {
    ($( $kernel:ident => $method:ident ),* $(,)?) => {
        $(
            pub fn $kernel<T: Numeric>(left: &Value, right: &Value) -> Result<Value, EvalError> {
                let (a, b) = operands::<T>(left, right)?;
                a.$method(b).map(T::into_value)
            }
        )*
    };
}

arithmetic_kernels! {
    add_kernel => plus,
    subtract_kernel => minus,
    multiply_kernel => times,
    divide_kernel => divide,
    modulo_kernel => remainder,
}

macro_rules! relational_kernels {
    ($( $kernel:ident => $op:tt ),* $(,)?) => {
        $(
            pub fn $kernel<T: Primitive>(left: &Value, right: &Value) -> Result<Value, EvalError> {
                let (a, b) = operands::<T>(left, right)?;
                Ok(Value::Bool(a $op b))
            }
        )*
    };
}

relational_kernels! {
    equal_kernel => ==,
    not_equal_kernel => !=,
    greater_kernel => >,
    greater_or_equal_kernel => >=,
    less_kernel => <,
    less_or_equal_kernel => <=,
}

macro_rules! bitwise_kernels {
    ($( $kernel:ident => $method:ident ),* $(,)?) => {
        $(
            pub fn $kernel<T: Bitwise>(left: &Value, right: &Value) -> Result<Value, EvalError> {
                let (a, b) = operands::<T>(left, right)?;
                Ok(a.$method(b).into_value())
            }
        )*
    };
}

bitwise_kernels! {
    and_kernel => and,
    or_kernel => or,
    xor_kernel => xor,
}

/// Three-way comparison lowered to an int32 sign.
pub fn three_way_kernel<T: Numeric>(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (a, b) = operands::<T>(left, right)?;
    Ok(Value::Int32(a.three_way(b) as i32))
}

pub fn negate_kernel<T: Numeric>(value: &Value) -> Result<Value, EvalError> {
    Ok(operand::<T>(value)?.negate().into_value())
}

pub fn not_kernel<T: Bitwise>(value: &Value) -> Result<Value, EvalError> {
    Ok(operand::<T>(value)?.not().into_value())
}

pub fn cast_kernel<T: Numeric>(value: &Value) -> Result<Value, EvalError> {
    T::cast_from(value).map(T::into_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(i32::MAX.plus(1), Ok(i32::MIN));
        assert_eq!(i64::MIN.minus(1), Ok(i64::MAX));
        assert_eq!(i32::MIN.negate(), i32::MIN);
        assert_eq!(i32::MAX.times(2), Ok(-2));
    }

    #[test]
    fn test_integer_division_traps() {
        assert_eq!(7i32.divide(0), Err(EvalError::DivideByZero));
        assert_eq!(7i64.remainder(0), Err(EvalError::DivideByZero));
        assert_eq!(i32::MIN.divide(-1), Err(EvalError::Overflow));
        assert_eq!(i64::MIN.remainder(-1), Err(EvalError::Overflow));
        assert_eq!((-7i32).divide(2), Ok(-3));
        assert_eq!((-7i32).remainder(2), Ok(-1));
    }

    #[test]
    fn test_float_division_follows_ieee() {
        assert_eq!(1.0f64.divide(0.0), Ok(f64::INFINITY));
        assert!(0.0f32.divide(0.0).unwrap().is_nan());
        assert_eq!((-7.5f64).remainder(2.0), Ok(-1.5));
    }

    #[test]
    fn test_decimal_is_exact() {
        let tenth = Decimal::new(1, 1);
        let sum = tenth.plus(Decimal::new(2, 1)).unwrap();
        assert_eq!(sum, Decimal::new(3, 1));
        assert_eq!(Decimal::ONE.divide(Decimal::ZERO), Err(EvalError::DivideByZero));
        assert_eq!(Decimal::MAX.plus(Decimal::ONE), Err(EvalError::Overflow));
    }

    #[test]
    fn test_three_way_orders_nan_first() {
        assert_eq!(f64::NAN.three_way(f64::NAN), Ordering::Equal);
        assert_eq!(f64::NAN.three_way(f64::NEG_INFINITY), Ordering::Less);
        assert_eq!(1.0f32.three_way(f32::NAN), Ordering::Greater);
        assert_eq!((-0.0f64).three_way(0.0), Ordering::Equal);
        assert_eq!(5i64.three_way(3), Ordering::Greater);
    }

    #[test]
    fn test_kernels_check_operand_types() {
        assert_eq!(
            add_kernel::<i32>(&Value::Int32(1), &Value::Int64(2)),
            Err(EvalError::TypeMismatch { expected: crate::ValueType::Int32, actual: crate::ValueType::Int64 })
        );
        assert_eq!(three_way_kernel::<i64>(&Value::Int64(3), &Value::Int64(5)), Ok(Value::Int32(-1)));
        assert_eq!(less_kernel::<f64>(&Value::Float64(f64::NAN), &Value::Float64(1.0)), Ok(Value::Bool(false)));
        assert_eq!(not_equal_kernel::<f64>(&Value::Float64(f64::NAN), &Value::Float64(f64::NAN)), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_casts() {
        assert_eq!(cast_kernel::<f64>(&Value::Int32(2)), Ok(Value::Float64(2.0)));
        assert_eq!(cast_kernel::<i32>(&Value::Float64(-2.9)), Ok(Value::Int32(-2)));
        assert_eq!(cast_kernel::<i32>(&Value::Int64(1 << 32)), Ok(Value::Int32(0)));
        assert_eq!(cast_kernel::<i32>(&Value::Decimal(Decimal::new(-299, 2))), Ok(Value::Int32(-2)));
        assert_eq!(cast_kernel::<i32>(&Value::Decimal(Decimal::from(i64::MAX))), Err(EvalError::Overflow));
        assert_eq!(cast_kernel::<Decimal>(&Value::Float64(f64::NAN)), Err(EvalError::Overflow));
        assert!(cast_kernel::<i64>(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(and_kernel::<i32>(&Value::Int32(0b1100), &Value::Int32(0b1010)), Ok(Value::Int32(0b1000)));
        assert_eq!(xor_kernel::<bool>(&Value::Bool(true), &Value::Bool(true)), Ok(Value::Bool(false)));
        assert_eq!(not_kernel::<i64>(&Value::Int64(0)), Ok(Value::Int64(-1)));
        assert_eq!(not_kernel::<bool>(&Value::Bool(false)), Ok(Value::Bool(true)));
    }
}
