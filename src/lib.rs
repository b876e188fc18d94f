//! Foldrust: an embeddable expression construct compiler.
//!
//! A parser hands the engine an ordered instruction sequence (push a literal,
//! push a parameter, apply a construct). The compiler drives each construct
//! against an operand stack to assemble a typed IR, folding constants and
//! eliminating algebraic identities along the way, then lowers the single
//! remaining node into a callable over a fixed argument vector.
//!
//! # Architecture
//! - Value types and literals (`types`, `numeric`)
//! - IR nodes (`ir`) and the operand stack (`stack`)
//! - Constructs: operator templates, typed operators, converters
//! - Construct catalog keyed by operator symbol and operand types
//! - Compilation driver and lowering to a flat postfix program (`compiler`, `expression`)
//! - Reference evaluator for checking the optimizer (`reference`)

mod arguments;
mod catalog;
mod compiler;
mod config;
mod construct;
mod converter;
mod expression;
mod ir;
mod locator;
mod numeric;
mod operators;
mod reference;
mod signature;
mod stack;
mod types;

pub use arguments::*;
pub use catalog::*;
pub use compiler::*;
pub use config::*;
pub use construct::*;
pub use converter::*;
pub use expression::*;
pub use ir::*;
pub use locator::*;
pub use numeric::{Bitwise, Numeric};
pub use operators::*;
pub use reference::*;
pub use signature::*;
pub use stack::*;
pub use types::*;

use thiserror::Error;

/// Errors raised while a lowered callable runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivideByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueType, actual: ValueType },
    #[error("missing argument at position {0}")]
    MissingArgument(usize),
    #[error("evaluation stack underflow")]
    StackUnderflow,
}

/// Unified error type for Foldrust operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("division by zero: {dividend} {operator} 0")]
    DivideByZero { operator: BinaryOp, dividend: String },
    #[error("cannot fold `{operator}` over {}: {source}", format_values(.operands))]
    ConstantFolding {
        operator: String,
        operands: Vec<Value>,
        #[source]
        source: EvalError,
    },
    #[error("type converter cannot turn {from} into {to}")]
    TypeConversion { from: ValueType, to: ValueType },
    #[error("no construct registered for `{symbol}` over {}", format_types(.operands))]
    UnsupportedConstruct { symbol: String, operands: Vec<ValueType> },
    #[error("operand stack underflow in {construct}: needs {required}, has {available}")]
    StackUnderflow { construct: String, required: usize, available: usize },
    #[error("operand stack exceeded its depth limit of {limit}")]
    StackOverflow { limit: usize },
    #[error("instruction sequence left {remaining} nodes on the stack, expected 1")]
    UnbalancedStack { remaining: usize },
    #[error("parameter index {0} is outside the signature")]
    UnknownParameter(usize),
    #[error("{construct} expects {expected} operands, got {actual}")]
    OperandType { construct: String, expected: ValueType, actual: ValueType },
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("argument {index} should be {expected}, got {actual}")]
    ArgumentType { index: usize, expected: ValueType, actual: ValueType },
    #[error("argument {0} was never set")]
    MissingArgument(usize),
    #[error("no parameter named `{0}`")]
    UnknownParameterName(String),
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

impl ExprError {
    /// Whether this error is a contract violation between the parser and the
    /// engine rather than a problem with the expression itself.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ExprError::StackUnderflow { .. }
                | ExprError::UnbalancedStack { .. }
                | ExprError::UnknownParameter(_)
                | ExprError::OperandType { .. }
                | ExprError::Evaluation(EvalError::StackUnderflow)
        )
    }
}

fn format_types(types: &[ValueType]) -> String {
    types.iter().map(ValueType::name).collect::<Vec<_>>().join(", ")
}

fn format_values(values: &[Value]) -> String {
    values.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
}
