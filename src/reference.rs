//! Reference evaluation: runs an instruction sequence over a value stack
//! without building IR, so no folding or identity rewrite ever applies.

use crate::compiler::Instruction;
use crate::signature::ParameterSignature;
use crate::types::Value;
use crate::ExprError;

/// Evaluates `instructions` directly against `args`, one construct at a time.
pub fn evaluate_unoptimized(
    instructions: &[Instruction],
    signature: &ParameterSignature,
    args: &[Value],
) -> Result<Value, ExprError> {
    signature.check(args)?;
    let mut values: Vec<Value> = Vec::new();
    for instruction in instructions {
        match instruction {
            Instruction::PushLiteral(value) => values.push(*value),
            Instruction::PushParameter(index) => {
                let value = args.get(*index).ok_or(ExprError::UnknownParameter(*index))?;
                values.push(*value);
            }
            Instruction::Apply(construct) => {
                let arity = construct.arity();
                if values.len() < arity {
                    return Err(ExprError::StackUnderflow {
                        construct: construct.name(),
                        required: arity,
                        available: values.len(),
                    });
                }
                let operands = values.split_off(values.len() - arity);
                values.push(construct.evaluate(&operands)?);
            }
        }
    }
    match values.as_slice() {
        [result] => Ok(*result),
        _ => Err(ExprError::UnbalancedStack { remaining: values.len() }),
    }
}
