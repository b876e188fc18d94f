//! Operand stack used while assembling the IR from an instruction sequence.

use crate::config::CompilerConfig;
use crate::ir::Node;
use crate::ExprError;

/// The LIFO buffer shared between the driver and the constructs of one compilation.
#[derive(Debug)]
pub struct OperandStack {
    nodes: Vec<Node>,
    constant_folding: bool,
    max_depth: Option<usize>,
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl OperandStack {
    pub fn new() -> Self {
        Self::with_config(&CompilerConfig::default())
    }

    pub fn with_config(config: &CompilerConfig) -> Self {
        Self {
            nodes: Vec::new(),
            constant_folding: config.constant_folding,
            max_depth: config.max_stack_depth,
        }
    }

    /// Whether constructs may fold constants and eliminate identities.
    pub fn folding_enabled(&self) -> bool {
        self.constant_folding
    }

    pub fn push(&mut self, node: Node) -> Result<(), ExprError> {
        if let Some(limit) = self.max_depth {
            if self.nodes.len() >= limit {
                return Err(ExprError::StackOverflow { limit });
            }
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Pops the top node. An empty stack means the instruction sequence was
    /// not arity-consistent.
    pub fn pop(&mut self) -> Result<Node, ExprError> {
        self.nodes.pop().ok_or_else(|| {
            tracing::warn!("operand stack underflow");
            ExprError::StackUnderflow { construct: "pop".to_string(), required: 1, available: 0 }
        })
    }

    /// Checks that at least `arity` operands are available for `construct`.
    pub fn require(&self, arity: usize, construct: &str) -> Result<(), ExprError> {
        if self.nodes.len() < arity {
            tracing::warn!(construct, required = arity, available = self.nodes.len(), "operand stack underflow");
            return Err(ExprError::StackUnderflow {
                construct: construct.to_string(),
                required: arity,
                available: self.nodes.len(),
            });
        }
        Ok(())
    }

    pub fn peek(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consumes the stack, which must hold exactly one node.
    pub fn into_single(mut self) -> Result<Node, ExprError> {
        if self.nodes.len() != 1 {
            tracing::warn!(remaining = self.nodes.len(), "instruction sequence left an unbalanced stack");
            return Err(ExprError::UnbalancedStack { remaining: self.nodes.len() });
        }
        self.pop()
    }
}
