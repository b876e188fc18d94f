//! Catalog module: maps operator symbols and operand types to constructs.
//!
//! A catalog is assembled once through [`ConstructCatalogBuilder`] and then
//! frozen. Compilations only read from it, so it can be shared freely.

use crate::construct::{BinaryConstruct, BinaryOperator, Construct, UnaryConstruct, UnaryOperator};
use crate::converter::{conversion_kernel, Cast, ConverterConstruct, TypeConversion};
use crate::ir::{BinaryOp, UnaryOp};
use crate::locator::MethodLocator;
use crate::numeric::{Bitwise, Numeric};
use crate::operators::*;
use crate::types::ValueType;
use crate::ExprError;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKey {
    Binary { op: BinaryOp, left: ValueType, right: ValueType },
    Unary { op: UnaryOp, operand: ValueType },
    /// `source` is `None` for converters accepting any operand type.
    Convert { source: Option<ValueType>, target: ValueType },
}

#[derive(Debug, Clone)]
pub struct ConstructCatalog {
    constructs: HashMap<ConstructKey, Arc<dyn Construct>>,
}

impl ConstructCatalog {
    pub fn builder() -> ConstructCatalogBuilder {
        ConstructCatalogBuilder::new()
    }

    /// A catalog holding every built-in operator and converter.
    pub fn builtin() -> Result<Self, ExprError> {
        let mut builder = ConstructCatalogBuilder::new();
        register_builtins(&mut builder)?;
        Ok(builder.build())
    }

    pub fn get(&self, key: &ConstructKey) -> Option<&Arc<dyn Construct>> {
        self.constructs.get(key)
    }

    pub fn binary(&self, op: BinaryOp, left: ValueType, right: ValueType) -> Result<Arc<dyn Construct>, ExprError> {
        self.lookup(ConstructKey::Binary { op, left, right }, op.symbol(), vec![left, right])
    }

    pub fn unary(&self, op: UnaryOp, operand: ValueType) -> Result<Arc<dyn Construct>, ExprError> {
        self.lookup(ConstructKey::Unary { op, operand }, op.symbol(), vec![operand])
    }

    /// Looks up a binary operator by its symbol, e.g. `"+"`.
    pub fn binary_symbol(&self, symbol: &str, left: ValueType, right: ValueType) -> Result<Arc<dyn Construct>, ExprError> {
        match symbol.parse::<BinaryOp>() {
            Ok(op) => self.binary(op, left, right),
            Err(_) => Err(unsupported(symbol, vec![left, right])),
        }
    }

    pub fn unary_symbol(&self, symbol: &str, operand: ValueType) -> Result<Arc<dyn Construct>, ExprError> {
        match symbol.parse::<UnaryOp>() {
            Ok(op) => self.unary(op, operand),
            Err(_) => Err(unsupported(symbol, vec![operand])),
        }
    }

    /// Prefers a converter registered for exactly `source`, then one accepting any
    /// source. The latter only applies when a conversion route between the two
    /// types exists.
    pub fn converter(&self, source: ValueType, target: ValueType) -> Result<Arc<dyn Construct>, ExprError> {
        if let Some(exact) = self.constructs.get(&ConstructKey::Convert { source: Some(source), target }) {
            return Ok(Arc::clone(exact));
        }
        if source != target && conversion_kernel(source, target).is_none() {
            return Err(unsupported("convert", vec![source, target]));
        }
        self.constructs
            .get(&ConstructKey::Convert { source: None, target })
            .cloned()
            .ok_or_else(|| unsupported("convert", vec![source, target]))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConstructKey> {
        self.constructs.keys()
    }

    pub fn len(&self) -> usize {
        self.constructs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructs.is_empty()
    }

    fn lookup(&self, key: ConstructKey, symbol: &str, operands: Vec<ValueType>) -> Result<Arc<dyn Construct>, ExprError> {
        self.constructs.get(&key).cloned().ok_or_else(|| unsupported(symbol, operands))
    }
}

fn unsupported(symbol: &str, operands: Vec<ValueType>) -> ExprError {
    ExprError::UnsupportedConstruct { symbol: symbol.to_string(), operands }
}

#[derive(Debug, Default)]
pub struct ConstructCatalogBuilder {
    constructs: HashMap<ConstructKey, Arc<dyn Construct>>,
    locator: MethodLocator,
}

impl ConstructCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `locator` to resolve comparisons for types registered afterwards.
    pub fn with_locator(mut self, locator: MethodLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Registers a construct under `key`. A later registration replaces an earlier one.
    pub fn register(&mut self, key: ConstructKey, construct: Arc<dyn Construct>) -> &mut Self {
        self.constructs.insert(key, construct);
        self
    }

    pub fn register_binary<O: BinaryOperator>(&mut self, operator: O) -> &mut Self {
        let key = ConstructKey::Binary {
            op: operator.op(),
            left: operator.left_type(),
            right: operator.right_type(),
        };
        self.register(key, Arc::new(BinaryConstruct::new(operator)))
    }

    pub fn register_unary<O: UnaryOperator>(&mut self, operator: O) -> &mut Self {
        let key = ConstructKey::Unary {
            op: operator.op(),
            operand: operator.argument_type(),
        };
        self.register(key, Arc::new(UnaryConstruct::new(operator)))
    }

    pub fn register_converter<C: TypeConversion>(&mut self, converter: C) -> &mut Self {
        let key = ConstructKey::Convert {
            source: converter.source_type(),
            target: converter.target_type(),
        };
        self.register(key, Arc::new(ConverterConstruct::new(converter)))
    }

    /// Registers arithmetic, comparison, negation and the cast to `T`.
    pub fn register_numeric<T: Numeric>(&mut self) -> Result<&mut Self, ExprError> {
        let compare = Compare::<T>::new(&self.locator)?;
        Ok(self
            .register_binary(Add::<T>::new())
            .register_binary(Subtract::<T>::new())
            .register_binary(Multiply::<T>::new())
            .register_binary(Divide::<T>::new())
            .register_binary(Modulo::<T>::new())
            .register_binary(compare)
            .register_binary(Equal::<T>::new())
            .register_binary(NotEqual::<T>::new())
            .register_binary(Greater::<T>::new())
            .register_binary(GreaterOrEqual::<T>::new())
            .register_binary(Less::<T>::new())
            .register_binary(LessOrEqual::<T>::new())
            .register_unary(Negate::<T>::new())
            .register_converter(Cast::<T>::new()))
    }

    /// Registers `&`, `|`, `^` and `!` over `T`.
    pub fn register_bitwise<T: Bitwise>(&mut self) -> &mut Self {
        self.register_binary(And::<T>::new())
            .register_binary(Or::<T>::new())
            .register_binary(Xor::<T>::new())
            .register_unary(Not::<T>::new())
    }

    pub fn build(self) -> ConstructCatalog {
        tracing::debug!(constructs = self.constructs.len(), "construct catalog frozen");
        ConstructCatalog { constructs: self.constructs }
    }
}

macro_rules! builtin_catalog {
    (numeric: [$($num:ty),* $(,)?], bitwise: [$($bits:ty),* $(,)?], equality: [$($eq:ty),* $(,)?] $(,)?) => {
        /// Registers every built-in operator and converter on `builder`.
        pub fn register_builtins(builder: &mut ConstructCatalogBuilder) -> Result<(), ExprError> {
            $(builder.register_numeric::<$num>()?;)*
            $(builder.register_bitwise::<$bits>();)*
            $(builder.register_binary(Equal::<$eq>::new()).register_binary(NotEqual::<$eq>::new());)*
            Ok(())
        }
    };
}

builtin_catalog! {
    numeric: [i32, i64, f32, f64, Decimal],
    bitwise: [i32, i64, bool],
    equality: [bool],
}
