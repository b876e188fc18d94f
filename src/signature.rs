//! Signature module: declares the parameters a compiled expression accepts.
//!
//! This module provides the ParameterSignature type and a builder for it.
//! Parameters are positional; a parameter's index is its declaration order.

use crate::types::{Value, ValueType};
use crate::ExprError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSignature {
    names: Vec<String>,
    types: Vec<ValueType>,
    ids: HashMap<String, usize>,
}

impl ParameterSignature {
    /// A signature with no parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> ParameterSignatureBuilder {
        ParameterSignatureBuilder::new()
    }

    pub fn parameter_type(&self, index: usize) -> Option<ValueType> {
        self.types.get(index).copied()
    }

    /// Get the index for a given parameter name, if it exists.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|s| s.as_str())
    }

    pub fn types(&self) -> &[ValueType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Checks an argument vector against the declared arity and types.
    pub fn check(&self, args: &[Value]) -> Result<(), ExprError> {
        if args.len() != self.types.len() {
            return Err(ExprError::ArgumentCount { expected: self.types.len(), actual: args.len() });
        }
        for (index, (arg, expected)) in args.iter().zip(&self.types).enumerate() {
            if arg.value_type() != *expected {
                return Err(ExprError::ArgumentType {
                    index,
                    expected: *expected,
                    actual: arg.value_type(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ParameterSignatureBuilder {
    parameters: Vec<(String, ValueType)>,
}

impl ParameterSignatureBuilder {
    pub fn new() -> Self {
        Self { parameters: Vec::new() }
    }

    /// Appends a parameter. Redeclaring a name replaces its type in place.
    pub fn parameter(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        let name = name.into();
        match self.parameters.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = ty,
            None => self.parameters.push((name, ty)),
        }
        self
    }

    pub fn build(self) -> ParameterSignature {
        let mut signature = ParameterSignature::default();
        for (index, (name, ty)) in self.parameters.into_iter().enumerate() {
            signature.ids.insert(name.clone(), index);
            signature.names.push(name);
            signature.types.push(ty);
        }
        signature
    }
}
