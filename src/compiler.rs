//! Compiler module: drives an instruction sequence into IR and lowers it into a program.
//!
//! The parser is trusted to emit arity- and type-consistent sequences; the
//! compiler still reports violations as internal errors instead of patching them.

use crate::config::CompilerConfig;
use crate::construct::Construct;
use crate::expression::CompiledExpression;
use crate::ir::{Node, Program};
use crate::signature::ParameterSignature;
use crate::stack::OperandStack;
use crate::types::Value;
use crate::ExprError;
use std::sync::Arc;

/// One step emitted by the parser.
#[derive(Debug, Clone)]
pub enum Instruction {
    PushLiteral(Value),
    /// Push a reference to the parameter at this position of the signature.
    PushParameter(usize),
    Apply(Arc<dyn Construct>),
}

impl Instruction {
    pub fn literal(value: impl Into<Value>) -> Self {
        Instruction::PushLiteral(value.into())
    }

    pub fn parameter(index: usize) -> Self {
        Instruction::PushParameter(index)
    }

    pub fn apply(construct: &Arc<dyn Construct>) -> Self {
        Instruction::Apply(Arc::clone(construct))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Assembles the IR tree for `instructions` without lowering it.
    pub fn build(&self, instructions: &[Instruction], signature: &ParameterSignature) -> Result<Node, ExprError> {
        let mut stack = OperandStack::with_config(&self.config);
        for instruction in instructions {
            match instruction {
                Instruction::PushLiteral(value) => stack.push(Node::Constant(*value))?,
                Instruction::PushParameter(index) => {
                    let ty = signature.parameter_type(*index).ok_or_else(|| {
                        tracing::warn!(index, parameters = signature.len(), "parameter index outside signature");
                        ExprError::UnknownParameter(*index)
                    })?;
                    stack.push(Node::parameter(*index, ty))?
                }
                Instruction::Apply(construct) => construct.process(&mut stack)?,
            }
        }
        stack.into_single()
    }

    pub fn compile(&self, instructions: &[Instruction], signature: Arc<ParameterSignature>) -> Result<CompiledExpression, ExprError> {
        tracing::debug!(instructions = instructions.len(), parameters = signature.len(), "compiling expression");
        let root = self.build(instructions, &signature)?;
        tracing::debug!(result_type = %root.ty(), nodes = root.size(), ir = %root, "expression compiled");
        Ok(CompiledExpression::new(root, signature))
    }
}

/// Turns an IR tree into a postfix program over a value stack.
pub fn lower(node: &Node) -> Program {
    let program = Program::from_node(node);
    tracing::trace!(steps = program.steps().len(), max_depth = program.max_depth(), "lowered expression");
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConstructCatalog;
    use crate::ir::{BinaryOp, DynamicExpr, UnaryOp};
    use crate::EvalError;
    use crate::types::ValueType;
    use rust_decimal::Decimal;

    fn catalog() -> ConstructCatalog {
        ConstructCatalog::builtin().unwrap()
    }

    fn binary(op: BinaryOp, ty: ValueType) -> Instruction {
        Instruction::Apply(catalog().binary(op, ty, ty).unwrap())
    }

    fn signature(ty: ValueType) -> Arc<ParameterSignature> {
        Arc::new(ParameterSignature::builder().parameter("x", ty).build())
    }

    #[test]
    fn test_compile_constant_sum() {
        let program = [Instruction::literal(3), Instruction::literal(4), binary(BinaryOp::Add, ValueType::Int32)];
        let compiled = Compiler::default().compile(&program, Arc::new(ParameterSignature::empty())).unwrap();
        assert!(compiled.is_constant());
        assert_eq!(compiled.call(&[]).unwrap(), Value::Int32(7));
    }

    #[test]
    fn test_compile_identity_is_folded_away() {
        let program = [Instruction::literal(0), Instruction::parameter(0), binary(BinaryOp::Add, ValueType::Int32)];
        let compiler = Compiler::default();
        let root = compiler.build(&program, &signature(ValueType::Int32)).unwrap();
        assert!(matches!(root.as_dynamic(), Some(DynamicExpr::Parameter { index: 0 })));
    }

    #[test]
    fn test_compile_nested_expression() {
        // -(x * 2) + 1
        let catalog = catalog();
        let program = [
            Instruction::parameter(0),
            Instruction::literal(2i64),
            Instruction::Apply(catalog.binary(BinaryOp::Multiply, ValueType::Int64, ValueType::Int64).unwrap()),
            Instruction::Apply(catalog.unary(UnaryOp::Negate, ValueType::Int64).unwrap()),
            Instruction::literal(1i64),
            Instruction::Apply(catalog.binary(BinaryOp::Add, ValueType::Int64, ValueType::Int64).unwrap()),
        ];
        let compiled = Compiler::default().compile(&program, signature(ValueType::Int64)).unwrap();
        assert_eq!(compiled.ir().to_string(), "(-($0 * 2L) + 1L)");
        assert_eq!(compiled.call(&[Value::Int64(5)]).unwrap(), Value::Int64(-9));
    }

    #[test]
    fn test_divide_by_constant_zero_aborts() {
        let program = [
            Instruction::parameter(0),
            Instruction::literal(Decimal::ZERO),
            binary(BinaryOp::Divide, ValueType::Decimal),
        ];
        let err = Compiler::default().compile(&program, signature(ValueType::Decimal)).unwrap_err();
        assert!(matches!(err, ExprError::DivideByZero { .. }));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_malformed_sequences_are_internal_errors() {
        let compiler = Compiler::default();
        let empty = ParameterSignature::empty();

        let err = compiler.build(&[], &empty).unwrap_err();
        assert_eq!(err, ExprError::UnbalancedStack { remaining: 0 });

        let err = compiler.build(&[Instruction::literal(1), Instruction::literal(2)], &empty).unwrap_err();
        assert_eq!(err, ExprError::UnbalancedStack { remaining: 2 });

        let err = compiler
            .build(&[Instruction::literal(1), binary(BinaryOp::Add, ValueType::Int32)], &empty)
            .unwrap_err();
        assert!(matches!(err, ExprError::StackUnderflow { required: 2, available: 1, .. }));

        let err = compiler.build(&[Instruction::parameter(0)], &empty).unwrap_err();
        assert_eq!(err, ExprError::UnknownParameter(0));
        assert!(err.is_internal());
    }

    #[test]
    fn test_folding_disabled_keeps_tree() {
        let program = [Instruction::literal(3), Instruction::literal(4), binary(BinaryOp::Add, ValueType::Int32)];
        let compiler = Compiler::new(CompilerConfig::new().with_constant_folding(false));
        let compiled = compiler.compile(&program, Arc::new(ParameterSignature::empty())).unwrap();
        assert!(!compiled.is_constant());
        assert_eq!(compiled.call(&[]).unwrap(), Value::Int32(7));
    }

    #[test]
    fn test_lower_reports_runtime_errors() {
        let program = [Instruction::literal(1), Instruction::parameter(0), binary(BinaryOp::Divide, ValueType::Int32)];
        let compiled = Compiler::default().compile(&program, signature(ValueType::Int32)).unwrap();
        assert_eq!(compiled.call(&[Value::Int32(0)]), Err(ExprError::Evaluation(EvalError::DivideByZero)));
        assert_eq!(compiled.call(&[Value::Int32(2)]).unwrap(), Value::Int32(0));
    }

    #[test]
    fn test_lower_matches_tree_walk() {
        let catalog = catalog();
        let program = [
            Instruction::parameter(0),
            Instruction::Apply(catalog.converter(ValueType::Int32, ValueType::Float64).unwrap()),
            Instruction::literal(0.5),
            Instruction::Apply(catalog.binary(BinaryOp::Compare, ValueType::Float64, ValueType::Float64).unwrap()),
        ];
        let root = Compiler::default().build(&program, &signature(ValueType::Int32)).unwrap();
        let lowered = lower(&root);
        for arg in [-1, 0, 1] {
            let args = [Value::Int32(arg)];
            assert_eq!(lowered.run(&args), root.evaluate(&args));
        }
    }
}
