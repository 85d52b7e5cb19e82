use crate::arena::Arena;
use crate::evolution::tree::Node;
use crate::vm::op::{Command, FunctionKind, TerminalKind};
use thiserror::Error;

/// Deepest nesting the executor will follow before giving up on a tree.
const MAX_EXECUTION_DEPTH: usize = 256;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VmError {
    #[error("{command} expects {expected} children, found {found}")]
    ArityMismatch {
        command: Command,
        expected: usize,
        found: usize,
    },
    #[error("Execution nested deeper than {0} levels")]
    DepthLimitExceeded(usize),
}

/// Runs program trees against a live arena.
///
/// Evaluating a node actuates the robot and returns the `Command` that fired. The value
/// only routes control back to the parent, it never carries data.
pub struct VirtualMachine {
    max_depth: usize,
    actuations: u64,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualMachine {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_EXECUTION_DEPTH,
            actuations: 0,
        }
    }

    /// Total terminal actuations performed since this machine was created.
    pub fn actuations(&self) -> u64 {
        self.actuations
    }

    /// One decision tick: evaluates `root` once.
    pub fn execute(&mut self, root: &Node, arena: &mut Arena) -> Result<Command, VmError> {
        self.eval(root, arena, 0)
    }

    fn eval(&mut self, node: &Node, arena: &mut Arena, depth: usize) -> Result<Command, VmError> {
        if depth > self.max_depth {
            return Err(VmError::DepthLimitExceeded(self.max_depth));
        }
        match node {
            Node::Terminal(kind) => {
                self.actuate(*kind, arena);
                Ok(node.command())
            }
            Node::Function { kind, children } => {
                if children.len() != kind.arity() {
                    return Err(VmError::ArityMismatch {
                        command: node.command(),
                        expected: kind.arity(),
                        found: children.len(),
                    });
                }
                match kind {
                    FunctionKind::Seq2 | FunctionKind::Seq3 => children
                        .iter()
                        .try_fold(node.command(), |_, child| self.eval(child, arena, depth + 1)),
                    FunctionKind::IfWall => {
                        let branch = if arena.is_near_wall() { 0 } else { 1 };
                        self.eval(&children[branch], arena, depth + 1)
                    }
                    FunctionKind::IfBall => {
                        let branch = if arena.can_see_ball() { 0 } else { 1 };
                        self.eval(&children[branch], arena, depth + 1)
                    }
                }
            }
        }
    }

    #[inline]
    fn actuate(&mut self, kind: TerminalKind, arena: &mut Arena) {
        self.actuations += 1;
        match kind {
            TerminalKind::MoveForward => arena.move_forward(),
            TerminalKind::MoveBackward => arena.move_backward(),
            TerminalKind::TurnLeft => arena.turn_left(),
            TerminalKind::TurnRight => arena.turn_right(),
            TerminalKind::AlignToBall => arena.align_to_ball(),
        }
    }
}
