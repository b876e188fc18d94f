use foldrust::*;
use std::sync::Arc;

fn main() -> Result<(), ExprError> {
    // 1. Declare the parameters the expression accepts
    let signature = Arc::new(
        ParameterSignature::builder()
            .parameter("count", ValueType::Int32)
            .parameter("price", ValueType::Float64)
            .build(),
    );

    // 2. Load the built-in constructs
    let catalog = ConstructCatalog::builtin()?;

    // 3. Emit instructions for: compare((float64)count * price + 0.0, 100.0 * 1.0)
    let program = vec![
        Instruction::parameter(0),
        Instruction::apply(&catalog.converter(ValueType::Int32, ValueType::Float64)?),
        Instruction::parameter(1),
        Instruction::apply(&catalog.binary_symbol("*", ValueType::Float64, ValueType::Float64)?),
        Instruction::literal(0.0),
        Instruction::apply(&catalog.binary_symbol("+", ValueType::Float64, ValueType::Float64)?),
        Instruction::literal(100.0),
        Instruction::literal(1.0),
        Instruction::apply(&catalog.binary_symbol("*", ValueType::Float64, ValueType::Float64)?),
        Instruction::apply(&catalog.binary_symbol("<=>", ValueType::Float64, ValueType::Float64)?),
    ];

    // 4. Compile; identities and constant subtrees are folded away
    let compiled = Compiler::default().compile(&program, Arc::clone(&signature))?;
    println!("Optimized IR: {}", compiled.ir());

    // 5. Assemble arguments by name and call
    let mut args = Arguments::new(&signature);
    args.set("count", Value::Int32(3), &signature)?;
    args.set("price", Value::Float64(40.0), &signature)?;
    match compiled.call_with(&args) {
        Ok(val) => println!("Result: {}", val),
        Err(e) => println!("Evaluation error: {}", e),
    }
    Ok(())
}
