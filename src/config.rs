//! Config module: compiler options.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Fold constants and eliminate algebraic identities while building the IR.
    pub constant_folding: bool,
    /// Upper bound on operand stack depth during IR assembly.
    pub max_stack_depth: Option<usize>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            constant_folding: true,
            max_stack_depth: None,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.constant_folding = enabled;
        self
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = Some(depth);
        self
    }
}
