//! Arguments module: assembles argument vectors by parameter name.
//!
//! This module provides the Arguments type, which type-checks every value
//! against a ParameterSignature as it is set.

use crate::signature::ParameterSignature;
use crate::types::Value;
use crate::ExprError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(signature: &ParameterSignature) -> Self {
        Self {
            values: vec![None; signature.len()],
        }
    }

    pub fn set(&mut self, name: &str, value: Value, signature: &ParameterSignature) -> Result<(), ExprError> {
        let index = signature
            .index_of(name)
            .ok_or_else(|| ExprError::UnknownParameterName(name.to_string()))?;
        let expected = signature
            .parameter_type(index)
            .ok_or_else(|| ExprError::UnknownParameterName(name.to_string()))?;
        if value.value_type() != expected {
            return Err(ExprError::ArgumentType { index, expected, actual: value.value_type() });
        }
        if index >= self.values.len() {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// The positional argument vector; every parameter must have been set.
    pub fn to_vec(&self) -> Result<Vec<Value>, ExprError> {
        self.values
            .iter()
            .enumerate()
            .map(|(index, value)| value.ok_or(ExprError::MissingArgument(index)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;
    use serde_json;

    fn signature() -> ParameterSignature {
        ParameterSignature::builder()
            .parameter("price", ValueType::Decimal)
            .parameter("qty", ValueType::Int32)
            .build()
    }

    #[test]
    fn test_set_and_get_value() {
        let sig = signature();
        let mut args = Arguments::new(&sig);
        args.set("qty", Value::Int32(3), &sig).unwrap();
        assert_eq!(args.get(1), Some(&Value::Int32(3)));
        assert_eq!(args.get(0), None);
    }

    #[test]
    fn test_type_checking() {
        let sig = signature();
        let mut args = Arguments::new(&sig);
        let res = args.set("qty", Value::Int64(3), &sig);
        assert_eq!(
            res,
            Err(ExprError::ArgumentType { index: 1, expected: ValueType::Int32, actual: ValueType::Int64 })
        );
        assert!(args.set("qty", Value::Int32(1), &sig).is_ok());
    }

    #[test]
    fn test_parameter_not_found() {
        let sig = signature();
        let mut args = Arguments::new(&sig);
        let res = args.set("unknown", Value::Int32(1), &sig);
        assert!(matches!(res, Err(ExprError::UnknownParameterName(_))));
    }

    #[test]
    fn test_to_vec_requires_every_argument() {
        let sig = signature();
        let mut args = Arguments::new(&sig);
        args.set("qty", Value::Int32(2), &sig).unwrap();
        assert_eq!(args.to_vec(), Err(ExprError::MissingArgument(0)));
        args.set("price", Value::Decimal(rust_decimal::Decimal::new(995, 2)), &sig).unwrap();
        assert_eq!(
            args.to_vec().unwrap(),
            vec![Value::Decimal(rust_decimal::Decimal::new(995, 2)), Value::Int32(2)]
        );
    }

    #[test]
    fn test_serialization_deserialization() {
        let sig = signature();
        let mut args = Arguments::new(&sig);
        args.set("qty", Value::Int32(7), &sig).unwrap();
        let json = serde_json::to_string(&args).unwrap();
        let deserialized: Arguments = serde_json::from_str(&json).unwrap();
        assert_eq!(args, deserialized);
    }
}
