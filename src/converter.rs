//! Converter module: constructs that change a node's declared type.

use crate::construct::Construct;
use crate::ir::{Node, UnaryKernel};
use crate::numeric::{cast_kernel, Numeric};
use crate::stack::OperandStack;
use crate::types::{Value, ValueType};
use crate::ExprError;
use rust_decimal::Decimal;
use std::fmt;
use std::marker::PhantomData;

/// The explicit conversion between two types, if one exists. Only numeric
/// types convert into each other; bool has no numeric representation.
pub fn conversion_kernel(from: ValueType, to: ValueType) -> Option<UnaryKernel> {
    if !from.is_numeric() || !to.is_numeric() {
        return None;
    }
    let kernel: UnaryKernel = match to {
        ValueType::Int32 => cast_kernel::<i32>,
        ValueType::Int64 => cast_kernel::<i64>,
        ValueType::Float32 => cast_kernel::<f32>,
        ValueType::Float64 => cast_kernel::<f64>,
        ValueType::Decimal => cast_kernel::<Decimal>,
        ValueType::Bool => return None,
    };
    Some(kernel)
}

pub trait TypeConversion: Send + Sync + fmt::Debug + 'static {
    fn target_type(&self) -> ValueType;

    /// The only operand type this converter accepts, if it is restricted.
    fn source_type(&self) -> Option<ValueType> {
        None
    }

    fn try_create_from_constant(&self, _value: &Value) -> Result<Option<Node>, ExprError> {
        Ok(None)
    }

    /// Builds the generic conversion node. Without an explicit route the
    /// operand comes back unchanged and is left to the assignability check.
    fn create_conversion_node(&self, operand: Node) -> Node {
        match conversion_kernel(operand.ty(), self.target_type()) {
            Some(kernel) => Node::convert(self.target_type(), kernel, operand),
            None => operand,
        }
    }
}

/// Numeric cast to `T`, folding literal operands.
pub struct Cast<T>(PhantomData<fn() -> T>);

impl<T> Cast<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Cast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Numeric> fmt::Debug for Cast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cast<{}>", T::TYPE)
    }
}

impl<T: Numeric> TypeConversion for Cast<T> {
    fn target_type(&self) -> ValueType {
        T::TYPE
    }

    fn try_create_from_constant(&self, value: &Value) -> Result<Option<Node>, ExprError> {
        if !value.value_type().is_numeric() {
            return Ok(None);
        }
        T::cast_from(value)
            .map(|converted| Some(Node::constant(converted.into_value())))
            .map_err(|source| ExprError::ConstantFolding {
                operator: format!("({})", T::TYPE),
                operands: vec![*value],
                source,
            })
    }
}

/// Adapts a [`TypeConversion`] to the [`Construct`] contract.
#[derive(Debug, Clone, Default)]
pub struct ConverterConstruct<C> {
    converter: C,
}

impl<C: TypeConversion> ConverterConstruct<C> {
    pub fn new(converter: C) -> Self {
        Self { converter }
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Converts `operand` to the target type. An operand that already has the
    /// target type is returned as is.
    pub fn convert(&self, operand: Node, folding: bool) -> Result<Node, ExprError> {
        let target = self.converter.target_type();
        if operand.ty() == target {
            return Ok(operand);
        }
        let folded = match &operand {
            Node::Constant(value) if folding => self.converter.try_create_from_constant(value)?,
            _ => None,
        };
        let result = match folded {
            Some(node) => {
                tracing::trace!(converter = %self.name(), operand = %operand, result = %node, "folded conversion");
                node
            }
            None => self.converter.create_conversion_node(operand),
        };
        self.verify(result)
    }

    fn verify(&self, result: Node) -> Result<Node, ExprError> {
        let target = self.converter.target_type();
        let actual = result.ty();
        if actual == target {
            return Ok(result);
        }
        match conversion_kernel(actual, target) {
            Some(kernel) if actual.is_assignable_to(target) => Ok(Node::convert(target, kernel, result)),
            _ => Err(ExprError::TypeConversion { from: actual, to: target }),
        }
    }
}

impl<C: TypeConversion> Construct for ConverterConstruct<C> {
    fn name(&self) -> String {
        match self.converter.source_type() {
            Some(source) => format!("convert<{} -> {}>", source, self.converter.target_type()),
            None => format!("convert<{}>", self.converter.target_type()),
        }
    }

    fn arity(&self) -> usize {
        1
    }

    fn result_type(&self) -> ValueType {
        self.converter.target_type()
    }

    fn process(&self, stack: &mut OperandStack) -> Result<(), ExprError> {
        stack.require(1, &self.name())?;
        let operand = stack.pop()?;
        if let Some(expected) = self.converter.source_type() {
            if operand.ty() != expected {
                tracing::warn!(converter = %self.name(), %expected, actual = %operand.ty(), "operand type mismatch");
                return Err(ExprError::OperandType {
                    construct: self.name(),
                    expected,
                    actual: operand.ty(),
                });
            }
        }
        let result = self.convert(operand, stack.folding_enabled())?;
        stack.push(result)
    }

    fn evaluate(&self, operands: &[Value]) -> Result<Value, ExprError> {
        match operands {
            [value] => Ok(self.convert(Node::Constant(*value), false)?.evaluate(&[])?),
            _ => Err(ExprError::StackUnderflow {
                construct: self.name(),
                required: 1,
                available: operands.len(),
            }),
        }
    }
}
