//! Locator module: resolves native three-way comparisons by operand types.
//!
//! Each numeric type contributes its comparison when it is registered; Compare
//! constructs resolve their handle once, at construction, and keep it.

use crate::ir::{BinaryKernel, BinaryOp};
use crate::numeric::{three_way_kernel, Numeric};
use crate::types::{Value, ValueType};
use crate::{EvalError, ExprError};
use std::collections::HashMap;

/// A resolved handle to a type's native three-way comparison.
#[derive(Debug, Clone, Copy)]
pub struct ThreeWayComparison {
    left: ValueType,
    right: ValueType,
    kernel: BinaryKernel,
}

impl ThreeWayComparison {
    pub fn left_type(&self) -> ValueType {
        self.left
    }

    pub fn right_type(&self) -> ValueType {
        self.right
    }

    pub fn kernel(&self) -> BinaryKernel {
        self.kernel
    }

    /// Returns `-1`, `0` or `1` as an int32 value.
    pub fn invoke(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        (self.kernel)(left, right)
    }
}

#[derive(Debug, Clone)]
pub struct MethodLocator {
    comparisons: HashMap<(ValueType, ValueType), ThreeWayComparison>,
}

impl Default for MethodLocator {
    fn default() -> Self {
        let mut locator = Self::empty();
        locator.register::<i32>();
        locator.register::<i64>();
        locator.register::<f32>();
        locator.register::<f64>();
        locator.register::<rust_decimal::Decimal>();
        locator
    }
}

impl MethodLocator {
    /// A locator knowing the comparisons of every built-in numeric type.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self { comparisons: HashMap::new() }
    }

    pub fn register<T: Numeric>(&mut self) {
        self.comparisons.insert(
            (T::TYPE, T::TYPE),
            ThreeWayComparison {
                left: T::TYPE,
                right: T::TYPE,
                kernel: three_way_kernel::<T>,
            },
        );
    }

    pub fn locate(&self, left: ValueType, right: ValueType) -> Result<ThreeWayComparison, ExprError> {
        let found = self.comparisons.get(&(left, right)).copied();
        tracing::trace!(%left, %right, found = found.is_some(), "resolving three-way comparison");
        found.ok_or_else(|| ExprError::UnsupportedConstruct {
            symbol: BinaryOp::Compare.symbol().to_string(),
            operands: vec![left, right],
        })
    }
}
