//! Expression module: the callable produced by a compilation.
//!
//! This module provides the CompiledExpression type.

use crate::arguments::Arguments;
use crate::compiler::lower;
use crate::ir::{Node, Program};
use crate::signature::ParameterSignature;
use crate::types::{Value, ValueType};
use crate::ExprError;
use std::fmt;
use std::sync::Arc;

/// A compiled expression, ready to be called from any number of threads.
pub struct CompiledExpression {
    root: Node,
    signature: Arc<ParameterSignature>,
    program: Program,
}

impl CompiledExpression {
    pub(crate) fn new(root: Node, signature: Arc<ParameterSignature>) -> Self {
        let program = lower(&root);
        Self { root, signature, program }
    }

    /// Call the expression with a positional argument vector.
    pub fn call(&self, args: &[Value]) -> Result<Value, ExprError> {
        self.signature.check(args)?;
        Ok(self.program.run(args)?)
    }

    /// Call the expression with arguments assembled by name.
    pub fn call_with(&self, arguments: &Arguments) -> Result<Value, ExprError> {
        self.call(&arguments.to_vec()?)
    }

    pub fn result_type(&self) -> ValueType {
        self.root.ty()
    }

    pub fn signature(&self) -> &ParameterSignature {
        &self.signature
    }

    /// The optimized IR this expression was lowered from.
    pub fn ir(&self) -> &Node {
        &self.root
    }

    pub fn is_constant(&self) -> bool {
        self.root.is_constant()
    }

    /// The postfix program `call` runs.
    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("ir", &format_args!("{}", self.root))
            .field("result_type", &self.root.ty())
            .field("signature", &self.signature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConstructCatalog;
    use crate::compiler::{Compiler, Instruction};
    use crate::ir::BinaryOp;

    fn signature() -> Arc<ParameterSignature> {
        Arc::new(
            ParameterSignature::builder()
                .parameter("price", ValueType::Float64)
                .parameter("quantity", ValueType::Float64)
                .build(),
        )
    }

    fn total() -> CompiledExpression {
        let catalog = ConstructCatalog::builtin().unwrap();
        let program = [
            Instruction::parameter(0),
            Instruction::parameter(1),
            Instruction::Apply(catalog.binary(BinaryOp::Multiply, ValueType::Float64, ValueType::Float64).unwrap()),
        ];
        Compiler::default().compile(&program, signature()).unwrap()
    }

    #[test]
    fn test_call_positional() {
        let expr = total();
        assert_eq!(expr.result_type(), ValueType::Float64);
        assert!(!expr.is_constant());
        assert_eq!(expr.call(&[Value::Float64(2.5), Value::Float64(4.0)]).unwrap(), Value::Float64(10.0));
    }

    #[test]
    fn test_call_checks_signature() {
        let expr = total();
        assert_eq!(
            expr.call(&[Value::Float64(2.5)]).unwrap_err(),
            ExprError::ArgumentCount { expected: 2, actual: 1 }
        );
        assert_eq!(
            expr.call(&[Value::Float64(2.5), Value::Int32(4)]).unwrap_err(),
            ExprError::ArgumentType { index: 1, expected: ValueType::Float64, actual: ValueType::Int32 }
        );
    }

    #[test]
    fn test_call_with_named_arguments() {
        let expr = total();
        let mut args = Arguments::new(expr.signature());
        args.set("quantity", Value::Float64(3.0), expr.signature()).unwrap();
        assert_eq!(expr.call_with(&args).unwrap_err(), ExprError::MissingArgument(0));
        args.set("price", Value::Float64(1.5), expr.signature()).unwrap();
        assert_eq!(expr.call_with(&args).unwrap(), Value::Float64(4.5));
    }

    #[test]
    fn test_debug_shows_ir() {
        let rendered = format!("{:?}", total());
        assert!(rendered.contains("($0 * $1)"));
    }
}
