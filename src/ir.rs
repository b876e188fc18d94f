//! Intermediate Representation (IR) for the expression engine.
//!
//! Nodes are immutable and cheap to clone: a node is either a literal constant
//! or a dynamic expression shared behind an `Arc`. Constructs never mutate a
//! node, they only wrap existing nodes in new ones.

use crate::types::{Value, ValueType};
use crate::EvalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use std::str::FromStr;
use std::sync::Arc;

/// Native evaluation of a binary operator over two values.
pub type BinaryKernel = fn(&Value, &Value) -> Result<Value, EvalError>;
/// Native evaluation of a unary operator or conversion.
pub type UnaryKernel = fn(&Value) -> Result<Value, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Compare,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 15] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Modulo,
        BinaryOp::Compare,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
        BinaryOp::Greater,
        BinaryOp::GreaterOrEqual,
        BinaryOp::Less,
        BinaryOp::LessOrEqual,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Compare => "<=>",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }
}

impl FromStr for BinaryOp {
    type Err = String;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        BinaryOp::ALL
            .into_iter()
            .find(|op| op.symbol() == symbol)
            .ok_or_else(|| format!("unknown binary operator `{}`", symbol))
    }
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl FromStr for UnaryOp {
    type Err = String;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        match symbol {
            "-" => Ok(UnaryOp::Negate),
            "!" | "~" => Ok(UnaryOp::Not),
            _ => Err(format!("unknown unary operator `{}`", symbol)),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A typed node in the expression tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// A literal whose value is known at compile time.
    Constant(Value),
    /// Anything whose value is only known when the callable runs.
    Dynamic { ty: ValueType, expr: Arc<DynamicExpr> },
}

#[derive(Debug)]
pub enum DynamicExpr {
    Parameter {
        index: usize,
    },
    Binary {
        op: BinaryOp,
        kernel: BinaryKernel,
        left: Node,
        right: Node,
    },
    Unary {
        op: UnaryOp,
        kernel: UnaryKernel,
        operand: Node,
    },
    Convert {
        kernel: UnaryKernel,
        operand: Node,
    },
}

impl Node {
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant(value.into())
    }

    pub fn parameter(index: usize, ty: ValueType) -> Self {
        Self::dynamic(ty, DynamicExpr::Parameter { index })
    }

    pub fn binary(op: BinaryOp, ty: ValueType, kernel: BinaryKernel, left: Node, right: Node) -> Self {
        Self::dynamic(ty, DynamicExpr::Binary { op, kernel, left, right })
    }

    pub fn unary(op: UnaryOp, ty: ValueType, kernel: UnaryKernel, operand: Node) -> Self {
        Self::dynamic(ty, DynamicExpr::Unary { op, kernel, operand })
    }

    pub fn convert(ty: ValueType, kernel: UnaryKernel, operand: Node) -> Self {
        Self::dynamic(ty, DynamicExpr::Convert { kernel, operand })
    }

    fn dynamic(ty: ValueType, expr: DynamicExpr) -> Self {
        Node::Dynamic { ty, expr: Arc::new(expr) }
    }

    /// The static value type of this node.
    pub fn ty(&self) -> ValueType {
        match self {
            Node::Constant(value) => value.value_type(),
            Node::Dynamic { ty, .. } => *ty,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Node::Constant(_))
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Node::Constant(value) => Some(value),
            Node::Dynamic { .. } => None,
        }
    }

    pub fn as_dynamic(&self) -> Option<&DynamicExpr> {
        match self {
            Node::Constant(_) => None,
            Node::Dynamic { expr, .. } => Some(expr),
        }
    }

    /// Identity check: the same shared dynamic node, or bitwise-identical constants.
    pub fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Constant(a), Node::Constant(b)) => a.identical(b),
            (Node::Dynamic { expr: a, .. }, Node::Dynamic { expr: b, .. }) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of nodes in the tree rooted here.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            match node.as_dynamic() {
                None | Some(DynamicExpr::Parameter { .. }) => {}
                Some(DynamicExpr::Binary { left, right, .. }) => pending.extend([right, left]),
                Some(DynamicExpr::Unary { operand, .. }) | Some(DynamicExpr::Convert { operand, .. }) => {
                    pending.push(operand)
                }
            }
        }
        count
    }

    /// Evaluates the tree directly against an argument vector.
    pub fn evaluate(&self, args: &[Value]) -> Result<Value, EvalError> {
        Program::from_node(self).run(args)
    }
}

impl DynamicExpr {
    /// Moves the child nodes out, leaving placeholder constants behind.
    fn take_children(&mut self, out: &mut Vec<Node>) {
        let placeholder = || Node::Constant(Value::Bool(false));
        match self {
            DynamicExpr::Parameter { .. } => {}
            DynamicExpr::Binary { left, right, .. } => {
                out.push(mem::replace(left, placeholder()));
                out.push(mem::replace(right, placeholder()));
            }
            DynamicExpr::Unary { operand, .. } | DynamicExpr::Convert { operand, .. } => {
                out.push(mem::replace(operand, placeholder()))
            }
        }
    }
}

// Deep chains would otherwise drop recursively, one frame per level.
impl Drop for DynamicExpr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(node) = pending.pop() {
            if let Node::Dynamic { expr, .. } = node {
                if let Some(mut inner) = Arc::into_inner(expr) {
                    inner.take_children(&mut pending);
                }
            }
        }
    }
}

enum Piece<'a> {
    Node(&'a Node),
    Text(&'static str),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![Piece::Node(self)];
        while let Some(piece) = pending.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node) => node,
            };
            let (ty, expr) = match node {
                Node::Constant(value) => {
                    write!(f, "{}", value)?;
                    continue;
                }
                Node::Dynamic { ty, expr } => (ty, expr),
            };
            // pushed in reverse: the last piece is written first
            match expr.as_ref() {
                DynamicExpr::Parameter { index } => write!(f, "${}", index)?,
                DynamicExpr::Binary { op: BinaryOp::Compare, left, right, .. } => pending.extend([
                    Piece::Text(")"),
                    Piece::Node(right),
                    Piece::Text(", "),
                    Piece::Node(left),
                    Piece::Text("compare("),
                ]),
                DynamicExpr::Binary { op, left, right, .. } => pending.extend([
                    Piece::Text(")"),
                    Piece::Node(right),
                    Piece::Text(" "),
                    Piece::Text(op.symbol()),
                    Piece::Text(" "),
                    Piece::Node(left),
                    Piece::Text("("),
                ]),
                DynamicExpr::Unary { op, operand, .. } => {
                    pending.extend([Piece::Node(operand), Piece::Text(op.symbol())])
                }
                DynamicExpr::Convert { operand, .. } => pending.extend([
                    Piece::Node(operand),
                    Piece::Text(")"),
                    Piece::Text(ty.name()),
                    Piece::Text("("),
                ]),
            }
        }
        Ok(())
    }
}

/// A single step of a lowered program.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Push a literal onto the value stack.
    Load(Value),
    /// Push the argument at this position.
    LoadParameter(usize),
    /// Pop two values, push the kernel's result.
    Binary(BinaryKernel),
    /// Pop one value, push the kernel's result.
    Unary(UnaryKernel),
}

/// The flat postfix form of an IR tree, executed on a value stack.
#[derive(Debug, Clone)]
pub struct Program {
    steps: Vec<Step>,
    max_depth: usize,
}

impl Program {
    /// Lowers `root` into postfix steps, left operand first.
    pub fn from_node(root: &Node) -> Self {
        enum Visit<'a> {
            Enter(&'a Node),
            Emit(Step),
        }

        let mut steps = Vec::new();
        let (mut depth, mut max_depth) = (0usize, 0usize);
        let mut pending = vec![Visit::Enter(root)];
        while let Some(visit) = pending.pop() {
            let node = match visit {
                Visit::Emit(step) => {
                    if let Step::Binary(_) = step {
                        depth -= 1;
                    }
                    steps.push(step);
                    continue;
                }
                Visit::Enter(node) => node,
            };
            let expr = match node {
                Node::Constant(value) => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                    steps.push(Step::Load(*value));
                    continue;
                }
                Node::Dynamic { expr, .. } => expr,
            };
            match expr.as_ref() {
                DynamicExpr::Parameter { index } => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                    steps.push(Step::LoadParameter(*index));
                }
                DynamicExpr::Binary { kernel, left, right, .. } => {
                    pending.extend([Visit::Emit(Step::Binary(*kernel)), Visit::Enter(right), Visit::Enter(left)])
                }
                DynamicExpr::Unary { kernel, operand, .. } | DynamicExpr::Convert { kernel, operand } => {
                    pending.extend([Visit::Emit(Step::Unary(*kernel)), Visit::Enter(operand)])
                }
            }
        }
        Self { steps, max_depth }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Largest number of values on the stack at any point of a run.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn run(&self, args: &[Value]) -> Result<Value, EvalError> {
        let mut stack: Vec<Value> = Vec::with_capacity(self.max_depth);
        for step in &self.steps {
            let value = match *step {
                Step::Load(value) => value,
                Step::LoadParameter(index) => args.get(index).copied().ok_or(EvalError::MissingArgument(index))?,
                Step::Binary(kernel) => {
                    let right = stack.pop().ok_or(EvalError::StackUnderflow)?;
                    let left = stack.pop().ok_or(EvalError::StackUnderflow)?;
                    kernel(&left, &right)?
                }
                Step::Unary(kernel) => kernel(&stack.pop().ok_or(EvalError::StackUnderflow)?)?,
            };
            stack.push(value);
        }
        match stack.as_slice() {
            [result] => Ok(*result),
            _ => Err(EvalError::StackUnderflow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{add_kernel, cast_kernel, negate_kernel, three_way_kernel};

    fn x() -> Node {
        Node::parameter(0, ValueType::Int32)
    }

    #[test]
    fn test_symbols_round_trip() {
        for op in BinaryOp::ALL {
            assert_eq!(op.symbol().parse::<BinaryOp>(), Ok(op));
        }
        assert_eq!("-".parse::<UnaryOp>(), Ok(UnaryOp::Negate));
        assert_eq!("~".parse::<UnaryOp>(), Ok(UnaryOp::Not));
        assert!("**".parse::<BinaryOp>().is_err());
    }

    #[test]
    fn test_node_types() {
        assert_eq!(Node::constant(1.5f64).ty(), ValueType::Float64);
        assert_eq!(x().ty(), ValueType::Int32);
        let widened = Node::convert(ValueType::Int64, cast_kernel::<i64>, x());
        assert_eq!(widened.ty(), ValueType::Int64);
        assert!(!widened.is_constant());
    }

    #[test]
    fn test_same_uses_identity_for_dynamic_nodes() {
        let a = x();
        let b = x();
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert!(Node::constant(3).same(&Node::constant(3)));
        assert!(!Node::constant(3).same(&Node::constant(3i64)));
    }

    #[test]
    fn test_same_float_constants_by_bits() {
        assert!(Node::constant(f64::NAN).same(&Node::constant(f64::NAN)));
        assert!(Node::constant(f32::NAN).same(&Node::constant(f32::NAN)));
        assert!(!Node::constant(-0.0f64).same(&Node::constant(0.0f64)));
        assert!(!Node::constant(-0.0f32).same(&Node::constant(0.0f32)));
        assert!(Node::constant(2.5f64).same(&Node::constant(2.5f64)));
    }

    #[test]
    fn test_evaluate_and_display() {
        let sum = Node::binary(BinaryOp::Add, ValueType::Int32, add_kernel::<i32>, x(), Node::constant(3));
        let neg = Node::unary(UnaryOp::Negate, ValueType::Int32, negate_kernel::<i32>, sum);
        assert_eq!(neg.evaluate(&[Value::Int32(4)]), Ok(Value::Int32(-7)));
        assert_eq!(neg.evaluate(&[]), Err(EvalError::MissingArgument(0)));
        assert_eq!(neg.to_string(), "-($0 + 3)");
        assert_eq!(neg.size(), 4);

        let cmp = Node::binary(BinaryOp::Compare, ValueType::Int32, three_way_kernel::<i32>, x(), Node::constant(0));
        assert_eq!(cmp.to_string(), "compare($0, 0)");
        let conv = Node::convert(ValueType::Float64, cast_kernel::<f64>, x());
        assert_eq!(conv.to_string(), "(float64)$0");
    }

    #[test]
    fn test_program_is_postfix() {
        let sum = Node::binary(BinaryOp::Add, ValueType::Int32, add_kernel::<i32>, x(), Node::constant(3));
        let neg = Node::unary(UnaryOp::Negate, ValueType::Int32, negate_kernel::<i32>, sum);
        let program = Program::from_node(&neg);
        assert!(matches!(
            program.steps(),
            [Step::LoadParameter(0), Step::Load(Value::Int32(3)), Step::Binary(_), Step::Unary(_)]
        ));
        assert_eq!(program.max_depth(), 2);
        assert_eq!(program.run(&[Value::Int32(1)]), Ok(Value::Int32(-4)));

        let constant = Program::from_node(&Node::constant(true));
        assert_eq!(constant.max_depth(), 1);
        assert_eq!(constant.run(&[]), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_program_keeps_operand_order() {
        let cmp = Node::binary(BinaryOp::Compare, ValueType::Int32, three_way_kernel::<i32>, Node::constant(5), x());
        let program = Program::from_node(&cmp);
        assert_eq!(program.run(&[Value::Int32(9)]), Ok(Value::Int32(-1)));
        assert_eq!(program.run(&[Value::Int32(1)]), Ok(Value::Int32(1)));
    }

    #[test]
    fn test_malformed_program_underflows() {
        let program = Program { steps: vec![Step::Binary(add_kernel::<i32>)], max_depth: 0 };
        assert_eq!(program.run(&[]), Err(EvalError::StackUnderflow));
        let program = Program { steps: vec![Step::Load(Value::Int32(1)), Step::Load(Value::Int32(2))], max_depth: 2 };
        assert_eq!(program.run(&[]), Err(EvalError::StackUnderflow));
        let program = Program { steps: Vec::new(), max_depth: 0 };
        assert_eq!(program.run(&[]), Err(EvalError::StackUnderflow));
    }

    const DEEP: usize = 100_000;

    #[test]
    fn test_deep_left_chain() {
        let mut node = x();
        for _ in 0..DEEP {
            node = Node::binary(BinaryOp::Add, ValueType::Int32, add_kernel::<i32>, node, Node::constant(1));
        }
        assert_eq!(node.size(), 2 * DEEP + 1);
        assert_eq!(node.evaluate(&[Value::Int32(0)]), Ok(Value::Int32(DEEP as i32)));
        assert_eq!(Program::from_node(&node).max_depth(), 2);

        let rendered = node.to_string();
        assert!(rendered.starts_with("((("));
        assert!(rendered.contains("($0 + 1) + 1) + 1)"));
        assert_eq!(rendered.matches('(').count(), DEEP);
        drop(rendered);
        drop(node);
    }

    #[test]
    fn test_deep_right_chain() {
        let mut node = x();
        for _ in 0..DEEP {
            let neg = Node::unary(UnaryOp::Negate, ValueType::Int32, negate_kernel::<i32>, node);
            node = Node::binary(BinaryOp::Add, ValueType::Int32, add_kernel::<i32>, Node::constant(1), neg);
        }
        assert_eq!(node.size(), 3 * DEEP + 1);
        let program = Program::from_node(&node);
        assert_eq!(program.max_depth(), DEEP + 1);
        // each level computes 1 - previous, so an even count lands back on the argument
        assert_eq!(program.run(&[Value::Int32(7)]), Ok(Value::Int32(7)));
        assert!(node.to_string().starts_with("(1 + -(1 + -("));
    }

    #[test]
    fn test_shared_subtree_survives_drop_of_parent() {
        let mut node = x();
        for _ in 0..DEEP {
            node = Node::unary(UnaryOp::Negate, ValueType::Int32, negate_kernel::<i32>, node);
        }
        let shared = node.clone();
        let parent = Node::binary(BinaryOp::Add, ValueType::Int32, add_kernel::<i32>, node, Node::constant(1));
        drop(parent);
        assert_eq!(shared.size(), DEEP + 1);
        assert_eq!(shared.evaluate(&[Value::Int32(3)]), Ok(Value::Int32(3)));
    }
}
