//! Construct module: the stack-consuming contract shared by operators and converters.
//!
//! Operators implement [`BinaryOperator`] or [`UnaryOperator`], overriding only
//! the simplification hooks that apply to them. [`BinaryConstruct`] and
//! [`UnaryConstruct`] wrap an operator and supply the shared algorithm: detect
//! constant operands, try the hooks from strongest to weakest, and fall back
//! to a generic node.

use crate::ir::{BinaryKernel, BinaryOp, Node, UnaryKernel, UnaryOp};
use crate::stack::OperandStack;
use crate::types::{Value, ValueType};
use crate::ExprError;
use std::fmt;

/// A unit of IR-building work. Implementations hold immutable configuration
/// only, so one instance may serve any number of concurrent compilations.
pub trait Construct: Send + Sync + fmt::Debug {
    /// Display name, e.g. `+<int32>`.
    fn name(&self) -> String;

    /// Number of nodes consumed from the stack.
    fn arity(&self) -> usize;

    fn result_type(&self) -> ValueType;

    /// Pops `arity` nodes and pushes exactly one.
    fn process(&self, stack: &mut OperandStack) -> Result<(), ExprError>;

    /// Applies the construct directly to values, without building IR.
    fn evaluate(&self, operands: &[Value]) -> Result<Value, ExprError>;
}

pub trait BinaryOperator: Send + Sync + fmt::Debug + 'static {
    fn op(&self) -> BinaryOp;

    fn left_type(&self) -> ValueType;

    fn right_type(&self) -> ValueType {
        self.left_type()
    }

    fn result_type(&self) -> ValueType {
        self.left_type()
    }

    fn kernel(&self) -> BinaryKernel;

    fn try_create_from_two_constants(&self, _left: &Value, _right: &Value) -> Result<Option<Node>, ExprError> {
        Ok(None)
    }

    fn try_create_from_left_constant(&self, _left: &Value, _right: &Node) -> Result<Option<Node>, ExprError> {
        Ok(None)
    }

    fn try_create_from_right_constant(&self, _left: &Node, _right: &Value) -> Result<Option<Node>, ExprError> {
        Ok(None)
    }

    fn create_binary_node(&self, left: Node, right: Node) -> Node {
        Node::binary(self.op(), self.result_type(), self.kernel(), left, right)
    }

    /// Precomputes the result of this operator over two literals.
    fn fold(&self, left: &Value, right: &Value) -> Result<Node, ExprError> {
        (self.kernel())(left, right)
            .map(Node::Constant)
            .map_err(|source| ExprError::ConstantFolding {
                operator: self.op().symbol().to_string(),
                operands: vec![*left, *right],
                source,
            })
    }
}

pub trait UnaryOperator: Send + Sync + fmt::Debug + 'static {
    fn op(&self) -> UnaryOp;

    fn argument_type(&self) -> ValueType;

    fn result_type(&self) -> ValueType {
        self.argument_type()
    }

    fn kernel(&self) -> UnaryKernel;

    fn try_create_from_constant(&self, _operand: &Value) -> Result<Option<Node>, ExprError> {
        Ok(None)
    }

    fn create_unary_node(&self, operand: Node) -> Node {
        Node::unary(self.op(), self.result_type(), self.kernel(), operand)
    }

    fn fold(&self, operand: &Value) -> Result<Node, ExprError> {
        (self.kernel())(operand)
            .map(Node::Constant)
            .map_err(|source| ExprError::ConstantFolding {
                operator: self.op().symbol().to_string(),
                operands: vec![*operand],
                source,
            })
    }
}

fn check_operand(construct: &dyn Construct, node: &Node, expected: ValueType) -> Result<(), ExprError> {
    if node.ty() != expected {
        tracing::warn!(construct = %construct.name(), %expected, actual = %node.ty(), "operand type mismatch");
        return Err(ExprError::OperandType {
            construct: construct.name(),
            expected,
            actual: node.ty(),
        });
    }
    Ok(())
}

/// Adapts a [`BinaryOperator`] to the [`Construct`] contract.
#[derive(Debug, Clone, Default)]
pub struct BinaryConstruct<O> {
    operator: O,
}

impl<O: BinaryOperator> BinaryConstruct<O> {
    pub fn new(operator: O) -> Self {
        Self { operator }
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn create_result(&self, left: Node, right: Node) -> Result<Node, ExprError> {
        let op = &self.operator;
        let simplified = match (&left, &right) {
            (Node::Constant(a), Node::Constant(b)) => op.try_create_from_two_constants(a, b)?,
            (Node::Constant(a), _) => op.try_create_from_left_constant(a, &right)?,
            (_, Node::Constant(b)) => op.try_create_from_right_constant(&left, b)?,
            _ => None,
        };
        match simplified {
            Some(node) => {
                tracing::trace!(construct = %self.name(), left = %left, right = %right, result = %node, "simplified");
                Ok(node)
            }
            None => Ok(op.create_binary_node(left, right)),
        }
    }
}

impl<O: BinaryOperator> Construct for BinaryConstruct<O> {
    fn name(&self) -> String {
        let op = &self.operator;
        if op.left_type() == op.right_type() {
            format!("{}<{}>", op.op(), op.left_type())
        } else {
            format!("{}<{}, {}>", op.op(), op.left_type(), op.right_type())
        }
    }

    fn arity(&self) -> usize {
        2
    }

    fn result_type(&self) -> ValueType {
        self.operator.result_type()
    }

    fn process(&self, stack: &mut OperandStack) -> Result<(), ExprError> {
        stack.require(2, &self.name())?;
        let right = stack.pop()?;
        let left = stack.pop()?;
        check_operand(self, &left, self.operator.left_type())?;
        check_operand(self, &right, self.operator.right_type())?;
        let result = if stack.folding_enabled() {
            self.create_result(left, right)?
        } else {
            self.operator.create_binary_node(left, right)
        };
        stack.push(result)
    }

    fn evaluate(&self, operands: &[Value]) -> Result<Value, ExprError> {
        match operands {
            [left, right] => Ok((self.operator.kernel())(left, right)?),
            _ => Err(ExprError::StackUnderflow {
                construct: self.name(),
                required: 2,
                available: operands.len(),
            }),
        }
    }
}

/// Adapts a [`UnaryOperator`] to the [`Construct`] contract.
#[derive(Debug, Clone, Default)]
pub struct UnaryConstruct<O> {
    operator: O,
}

impl<O: UnaryOperator> UnaryConstruct<O> {
    pub fn new(operator: O) -> Self {
        Self { operator }
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn create_result(&self, operand: Node) -> Result<Node, ExprError> {
        if let Node::Constant(value) = &operand {
            if let Some(node) = self.operator.try_create_from_constant(value)? {
                tracing::trace!(construct = %self.name(), operand = %operand, result = %node, "folded constant");
                return Ok(node);
            }
        }
        Ok(self.operator.create_unary_node(operand))
    }
}

impl<O: UnaryOperator> Construct for UnaryConstruct<O> {
    fn name(&self) -> String {
        format!("{}<{}>", self.operator.op(), self.operator.argument_type())
    }

    fn arity(&self) -> usize {
        1
    }

    fn result_type(&self) -> ValueType {
        self.operator.result_type()
    }

    fn process(&self, stack: &mut OperandStack) -> Result<(), ExprError> {
        stack.require(1, &self.name())?;
        let operand = stack.pop()?;
        check_operand(self, &operand, self.operator.argument_type())?;
        let result = if stack.folding_enabled() {
            self.create_result(operand)?
        } else {
            Node::unary(self.operator.op(), self.operator.result_type(), self.operator.kernel(), operand)
        };
        stack.push(result)
    }

    fn evaluate(&self, operands: &[Value]) -> Result<Value, ExprError> {
        match operands {
            [operand] => Ok((self.operator.kernel())(operand)?),
            _ => Err(ExprError::StackUnderflow {
                construct: self.name(),
                required: 1,
                available: operands.len(),
            }),
        }
    }
}
