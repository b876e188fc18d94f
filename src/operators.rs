//! Operators module: one operator per (symbol, operand type) pair.
//!
//! Operators are generic over the native type they work on and get
//! monomorphized per primitive when the catalog registers them. Each one
//! overrides only the template hooks for which it knows an identity.

use crate::construct::{BinaryOperator, UnaryConstruct, UnaryOperator};
use crate::ir::{BinaryKernel, BinaryOp, DynamicExpr, Node, UnaryKernel, UnaryOp};
use crate::locator::{MethodLocator, ThreeWayComparison};
use crate::numeric::{self, Bitwise, Numeric};
use crate::types::{Primitive, Value, ValueType};
use crate::ExprError;
use std::fmt;
use std::marker::PhantomData;

fn is<T: Primitive>(value: &Value, expected: T) -> bool {
    T::from_value(value) == Some(expected)
}

fn negated<T: Numeric>(node: &Node) -> Result<Node, ExprError> {
    UnaryConstruct::new(Negate::<T>::new()).create_result(node.clone())
}

/// Returns the operand of `node` if it is an application of `op`.
fn unwrap_unary(node: &Node, op: UnaryOp) -> Option<&Node> {
    match node.as_dynamic() {
        Some(DynamicExpr::Unary { op: applied, operand, .. }) if *applied == op => Some(operand),
        _ => None,
    }
}

macro_rules! typed_operators {
    ($( $(#[$doc:meta])* $name:ident ),* $(,)?) => {
        $(
            $(#[$doc])*
            pub struct $name<T>(PhantomData<fn() -> T>);

            impl<T> $name<T> {
                pub fn new() -> Self {
                    Self(PhantomData)
                }
            }

            impl<T> Default for $name<T> {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl<T> Clone for $name<T> {
                fn clone(&self) -> Self {
                    Self::new()
                }
            }

            impl<T: Primitive> fmt::Debug for $name<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}<{}>", stringify!($name), T::TYPE)
                }
            }
        )*
    };
}

typed_operators! {
    /// `x + 0 → x`, `0 + x → x`.
    Add,
    /// `x - 0 → x`, `0 - x → -x`.
    Subtract,
    /// `x * 1 → x`, `x * -1 → -x`, `x * 0 → 0`, and mirrored.
    Multiply,
    /// `x / 1 → x`, `x / -1 → -x`; a constant zero divisor is rejected.
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    /// `x & NONE → NONE`, `x & ALL → x`, and mirrored.
    And,
    /// `x | NONE → x`, `x | ALL → ALL`, and mirrored.
    Or,
    /// `x ^ NONE → x`, and mirrored.
    Xor,
    /// Folds literals; `-(-x) → x`.
    Negate,
    /// Folds literals; `!!x → x`.
    Not,
}

impl<T: Numeric> BinaryOperator for Add<T> {
    fn op(&self) -> BinaryOp {
        BinaryOp::Add
    }

    fn left_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> BinaryKernel {
        numeric::add_kernel::<T>
    }

    fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(left, right).map(Some)
    }

    fn try_create_from_left_constant(&self, left: &Value, right: &Node) -> Result<Option<Node>, ExprError> {
        Ok(is(left, T::ZERO).then(|| right.clone()))
    }

    fn try_create_from_right_constant(&self, left: &Node, right: &Value) -> Result<Option<Node>, ExprError> {
        Ok(is(right, T::ZERO).then(|| left.clone()))
    }
}

impl<T: Numeric> BinaryOperator for Subtract<T> {
    fn op(&self) -> BinaryOp {
        BinaryOp::Subtract
    }

    fn left_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> BinaryKernel {
        numeric::subtract_kernel::<T>
    }

    fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(left, right).map(Some)
    }

    fn try_create_from_left_constant(&self, left: &Value, right: &Node) -> Result<Option<Node>, ExprError> {
        if is(left, T::ZERO) {
            return negated::<T>(right).map(Some);
        }
        Ok(None)
    }

    fn try_create_from_right_constant(&self, left: &Node, right: &Value) -> Result<Option<Node>, ExprError> {
        Ok(is(right, T::ZERO).then(|| left.clone()))
    }
}

impl<T: Numeric> Multiply<T> {
    fn by_constant(&self, constant: &Value, other: &Node) -> Result<Option<Node>, ExprError> {
        if is(constant, T::ONE) {
            Ok(Some(other.clone()))
        } else if is(constant, T::MINUS_ONE) {
            negated::<T>(other).map(Some)
        } else if is(constant, T::ZERO) {
            Ok(Some(Node::constant(T::ZERO.into_value())))
        } else {
            Ok(None)
        }
    }
}

impl<T: Numeric> BinaryOperator for Multiply<T> {
    fn op(&self) -> BinaryOp {
        BinaryOp::Multiply
    }

    fn left_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> BinaryKernel {
        numeric::multiply_kernel::<T>
    }

    fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(left, right).map(Some)
    }

    fn try_create_from_left_constant(&self, left: &Value, right: &Node) -> Result<Option<Node>, ExprError> {
        self.by_constant(left, right)
    }

    fn try_create_from_right_constant(&self, left: &Node, right: &Value) -> Result<Option<Node>, ExprError> {
        self.by_constant(right, left)
    }
}

impl<T: Numeric> Divide<T> {
    fn reject_zero(&self, dividend: &dyn fmt::Display, divisor: &Value) -> Result<(), ExprError> {
        if is(divisor, T::ZERO) {
            tracing::debug!(%dividend, "constant division by zero");
            return Err(ExprError::DivideByZero {
                operator: BinaryOp::Divide,
                dividend: dividend.to_string(),
            });
        }
        Ok(())
    }
}

impl<T: Numeric> BinaryOperator for Divide<T> {
    fn op(&self) -> BinaryOp {
        BinaryOp::Divide
    }

    fn left_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> BinaryKernel {
        numeric::divide_kernel::<T>
    }

    fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
        self.reject_zero(left, right)?;
        self.fold(left, right).map(Some)
    }

    fn try_create_from_right_constant(&self, left: &Node, right: &Value) -> Result<Option<Node>, ExprError> {
        self.reject_zero(left, right)?;
        if is(right, T::ONE) {
            Ok(Some(left.clone()))
        } else if is(right, T::MINUS_ONE) {
            negated::<T>(left).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl<T: Numeric> BinaryOperator for Modulo<T> {
    fn op(&self) -> BinaryOp {
        BinaryOp::Modulo
    }

    fn left_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> BinaryKernel {
        numeric::modulo_kernel::<T>
    }

    fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(left, right).map(Some)
    }
}

/// Three-way comparison, yielding an int32 sign.
pub struct Compare<T> {
    comparison: ThreeWayComparison,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Numeric> Compare<T> {
    /// Resolves the comparison handle once; every compilation reuses it.
    pub fn new(locator: &MethodLocator) -> Result<Self, ExprError> {
        Ok(Self {
            comparison: locator.locate(T::TYPE, T::TYPE)?,
            _marker: PhantomData,
        })
    }

    pub fn comparison(&self) -> &ThreeWayComparison {
        &self.comparison
    }
}

impl<T: Primitive> fmt::Debug for Compare<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Compare<{}>", T::TYPE)
    }
}

impl<T: Numeric> BinaryOperator for Compare<T> {
    fn op(&self) -> BinaryOp {
        BinaryOp::Compare
    }

    fn left_type(&self) -> ValueType {
        T::TYPE
    }

    fn result_type(&self) -> ValueType {
        ValueType::Int32
    }

    fn kernel(&self) -> BinaryKernel {
        self.comparison.kernel()
    }

    fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(left, right).map(Some)
    }
}

macro_rules! relational_operators {
    ($( $name:ident => $op:ident, $kernel:ident, $bound:ident );* $(;)?) => {
        $(
            impl<T: $bound> BinaryOperator for $name<T> {
                fn op(&self) -> BinaryOp {
                    BinaryOp::$op
                }

                fn left_type(&self) -> ValueType {
                    T::TYPE
                }

                fn result_type(&self) -> ValueType {
                    ValueType::Bool
                }

                fn kernel(&self) -> BinaryKernel {
                    numeric::$kernel::<T>
                }

                fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
                    self.fold(left, right).map(Some)
                }
            }
        )*
    };
}

relational_operators! {
    Equal => Equal, equal_kernel, Primitive;
    NotEqual => NotEqual, not_equal_kernel, Primitive;
    Greater => Greater, greater_kernel, Numeric;
    GreaterOrEqual => GreaterOrEqual, greater_or_equal_kernel, Numeric;
    Less => Less, less_kernel, Numeric;
    LessOrEqual => LessOrEqual, less_or_equal_kernel, Numeric;
}

impl<T: Bitwise> And<T> {
    fn with_constant(&self, constant: &Value, other: &Node) -> Option<Node> {
        if is(constant, T::NONE) {
            Some(Node::constant(T::NONE.into_value()))
        } else if is(constant, T::ALL) {
            Some(other.clone())
        } else {
            None
        }
    }
}

impl<T: Bitwise> Or<T> {
    fn with_constant(&self, constant: &Value, other: &Node) -> Option<Node> {
        if is(constant, T::NONE) {
            Some(other.clone())
        } else if is(constant, T::ALL) {
            Some(Node::constant(T::ALL.into_value()))
        } else {
            None
        }
    }
}

impl<T: Bitwise> Xor<T> {
    fn with_constant(&self, constant: &Value, other: &Node) -> Option<Node> {
        is(constant, T::NONE).then(|| other.clone())
    }
}

macro_rules! bitwise_operators {
    ($( $name:ident => $op:ident, $kernel:ident );* $(;)?) => {
        $(
            impl<T: Bitwise> BinaryOperator for $name<T> {
                fn op(&self) -> BinaryOp {
                    BinaryOp::$op
                }

                fn left_type(&self) -> ValueType {
                    T::TYPE
                }

                fn kernel(&self) -> BinaryKernel {
                    numeric::$kernel::<T>
                }

                fn try_create_from_two_constants(&self, left: &Value, right: &Value) -> Result<Option<Node>, ExprError> {
                    self.fold(left, right).map(Some)
                }

                fn try_create_from_left_constant(&self, left: &Value, right: &Node) -> Result<Option<Node>, ExprError> {
                    Ok(self.with_constant(left, right))
                }

                fn try_create_from_right_constant(&self, left: &Node, right: &Value) -> Result<Option<Node>, ExprError> {
                    Ok(self.with_constant(right, left))
                }
            }
        )*
    };
}

bitwise_operators! {
    And => And, and_kernel;
    Or => Or, or_kernel;
    Xor => Xor, xor_kernel;
}

impl<T: Numeric> UnaryOperator for Negate<T> {
    fn op(&self) -> UnaryOp {
        UnaryOp::Negate
    }

    fn argument_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> UnaryKernel {
        numeric::negate_kernel::<T>
    }

    fn try_create_from_constant(&self, operand: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(operand).map(Some)
    }

    fn create_unary_node(&self, operand: Node) -> Node {
        match unwrap_unary(&operand, UnaryOp::Negate) {
            Some(inner) => inner.clone(),
            None => Node::unary(self.op(), self.result_type(), self.kernel(), operand),
        }
    }
}

impl<T: Bitwise> UnaryOperator for Not<T> {
    fn op(&self) -> UnaryOp {
        UnaryOp::Not
    }

    fn argument_type(&self) -> ValueType {
        T::TYPE
    }

    fn kernel(&self) -> UnaryKernel {
        numeric::not_kernel::<T>
    }

    fn try_create_from_constant(&self, operand: &Value) -> Result<Option<Node>, ExprError> {
        self.fold(operand).map(Some)
    }

    fn create_unary_node(&self, operand: Node) -> Node {
        match unwrap_unary(&operand, UnaryOp::Not) {
            Some(inner) => inner.clone(),
            None => Node::unary(self.op(), self.result_type(), self.kernel(), operand),
        }
    }
}
