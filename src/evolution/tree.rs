use crate::config::GaConfig;
use crate::vm::op::{Command, FunctionKind, TerminalKind};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Program text is empty")]
    EmptyProgram,
    #[error("Invalid command symbol '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },
    #[error("Program text ended while children were still expected")]
    UnexpectedEnd,
    #[error("Program text has trailing symbols starting at position {position}")]
    TrailingSymbols { position: usize },
    #[error("{command} expects {expected} children, found {found}")]
    ArityMismatch {
        command: Command,
        expected: usize,
        found: usize,
    },
    #[error("Tree depth {depth} exceeds the limit of {limit}")]
    DepthLimitExceeded { depth: usize, limit: usize },
    #[error("Tree has {nodes} nodes, exceeding the limit of {limit}")]
    NodeLimitExceeded { nodes: usize, limit: usize },
}

/// A program node. Internal nodes own their children, leaves are bare actuations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Function {
        kind: FunctionKind,
        children: Vec<Node>,
    },
    Terminal(TerminalKind),
}

impl Node {
    pub fn function(kind: FunctionKind, children: Vec<Node>) -> Self {
        Node::Function { kind, children }
    }

    pub fn terminal(kind: TerminalKind) -> Self {
        Node::Terminal(kind)
    }

    pub fn command(&self) -> Command {
        match self {
            Node::Function { kind, .. } => Command::Function(*kind),
            Node::Terminal(kind) => Command::Terminal(*kind),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Function { children, .. } => children,
            Node::Terminal(_) => &[],
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }

    /// Longest root-to-leaf path counted in edges, a lone terminal has depth 0.
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Checks that every node carries exactly as many children as its command requires.
    pub fn check_arity(&self) -> Result<(), TreeError> {
        let command = self.command();
        let found = self.children().len();
        if found != command.arity() {
            return Err(TreeError::ArityMismatch {
                command,
                expected: command.arity(),
                found,
            });
        }
        self.children().iter().try_for_each(Node::check_arity)
    }

    fn write_prefix(&self, out: &mut String) {
        out.push(self.command().symbol());
        for child in self.children() {
            child.write_prefix(out);
        }
    }

    fn nth(&self, index: &mut usize) -> Option<&Node> {
        if *index == 0 {
            return Some(self);
        }
        *index -= 1;
        for child in self.children() {
            let size = child.node_count();
            if *index < size {
                return child.nth(index);
            }
            *index -= size;
        }
        None
    }

    fn nth_mut(&mut self, index: &mut usize) -> Option<&mut Node> {
        if *index == 0 {
            return Some(self);
        }
        *index -= 1;
        if let Node::Function { children, .. } = self {
            for child in children.iter_mut() {
                let size = child.node_count();
                if *index < size {
                    return child.nth_mut(index);
                }
                *index -= size;
            }
        }
        None
    }
}

/// Size and depth bounds every tree in a run must honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl TreeLimits {
    pub fn new(max_depth: usize, max_nodes: usize) -> Self {
        Self {
            max_depth,
            max_nodes,
        }
    }

    pub fn admits(&self, tree: &ProgramTree) -> bool {
        self.check(tree).is_ok()
    }

    pub fn check(&self, tree: &ProgramTree) -> Result<(), TreeError> {
        let nodes = tree.node_count();
        if nodes > self.max_nodes {
            return Err(TreeError::NodeLimitExceeded {
                nodes,
                limit: self.max_nodes,
            });
        }
        let depth = tree.depth();
        if depth > self.max_depth {
            return Err(TreeError::DepthLimitExceeded {
                depth,
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

impl From<&GaConfig> for TreeLimits {
    fn from(config: &GaConfig) -> Self {
        Self::new(config.max_tree_depth, config.max_tree_nodes)
    }
}

/// A well-formed robot program.
///
/// Construction checks arity at every node, so a `ProgramTree` can always be executed.
/// Size and depth bounds are run parameters and are checked separately with [`TreeLimits`].
/// Nodes are addressed by their position in a pre-order walk, the root being index 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramTree {
    root: Node,
}

impl ProgramTree {
    pub fn new(root: Node) -> Result<Self, TreeError> {
        root.check_arity()?;
        Ok(Self { root })
    }

    /// A program made of a single terminal, always well-formed.
    pub fn leaf(kind: TerminalKind) -> Self {
        Self {
            root: Node::terminal(kind),
        }
    }

    /// Parses the single-character encoding and checks it against `limits`.
    pub fn parse(text: &str, limits: &TreeLimits) -> Result<Self, TreeError> {
        let tree: ProgramTree = text.parse()?;
        limits.check(&tree)?;
        Ok(tree)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Subtree rooted at pre-order `index`.
    pub fn subtree(&self, index: usize) -> Option<&Node> {
        let mut remaining = index;
        self.root.nth(&mut remaining)
    }

    /// Swaps the subtree at pre-order `index` for `replacement`, returning the one removed.
    /// Leaves the tree untouched and hands `replacement` back as the error when `index` is
    /// out of range or `replacement` is malformed.
    pub fn replace_subtree(&mut self, index: usize, replacement: Node) -> Result<Node, Node> {
        if replacement.check_arity().is_err() {
            return Err(replacement);
        }
        let mut remaining = index;
        match self.root.nth_mut(&mut remaining) {
            Some(slot) => Ok(std::mem::replace(slot, replacement)),
            None => Err(replacement),
        }
    }

    /// The single-character pre-order encoding, e.g. `2FL` for `SEQ2(MOVE_FORWARD, TURN_LEFT)`.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.node_count());
        self.root.write_prefix(&mut out);
        out
    }
}

impl fmt::Display for ProgramTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_node(symbols: &[char], position: &mut usize) -> Result<Node, TreeError> {
    let symbol = *symbols.get(*position).ok_or(TreeError::UnexpectedEnd)?;
    let command = Command::from_symbol(symbol).ok_or(TreeError::InvalidSymbol {
        symbol,
        position: *position,
    })?;
    *position += 1;
    match command {
        Command::Terminal(kind) => Ok(Node::Terminal(kind)),
        Command::Function(kind) => {
            let children = (0..kind.arity())
                .map(|_| parse_node(symbols, position))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Function { kind, children })
        }
    }
}

impl FromStr for ProgramTree {
    type Err = TreeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<char> = text.trim().chars().collect();
        if symbols.is_empty() {
            return Err(TreeError::EmptyProgram);
        }
        let mut position = 0;
        let root = parse_node(&symbols, &mut position)?;
        if position != symbols.len() {
            return Err(TreeError::TrailingSymbols { position });
        }
        Ok(Self { root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::op::FunctionKind::*;
    use crate::vm::op::TerminalKind::*;

    fn t(kind: TerminalKind) -> Node {
        Node::terminal(kind)
    }

    // SEQ3(IF_WALL(TURN_LEFT, MOVE_FORWARD), ALIGN_TO_BALL, SEQ2(MOVE_BACKWARD, TURN_RIGHT))
    fn sample_tree() -> ProgramTree {
        ProgramTree::new(Node::function(
            Seq3,
            vec![
                Node::function(IfWall, vec![t(TurnLeft), t(MoveForward)]),
                t(AlignToBall),
                Node::function(Seq2, vec![t(MoveBackward), t(TurnRight)]),
            ],
        ))
        .unwrap()
    }

    #[test]
    fn test_metrics() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 8);
        assert_eq!(tree.depth(), 2);

        let leaf = ProgramTree::new(t(MoveForward)).unwrap();
        assert_eq!(leaf.node_count(), 1);
        assert_eq!(leaf.depth(), 0);
        assert_eq!(ProgramTree::leaf(MoveForward), leaf);
        assert_eq!(ProgramTree::leaf(AlignToBall).encode(), "A");
    }

    #[test]
    fn test_encode() {
        assert_eq!(sample_tree().encode(), "3ILFA2BR");
        assert_eq!(sample_tree().to_string(), "3ILFA2BR");
    }

    #[test]
    fn test_decode_round_trip() {
        let tree = sample_tree();
        let decoded: ProgramTree = tree.encode().parse().unwrap();
        assert_eq!(decoded, tree);

        let text = "C2AFI3LRBF";
        assert_eq!(text.parse::<ProgramTree>().unwrap().encode(), text);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!("".parse::<ProgramTree>(), Err(TreeError::EmptyProgram));
        assert_eq!("2F".parse::<ProgramTree>(), Err(TreeError::UnexpectedEnd));
        assert_eq!(
            "FL".parse::<ProgramTree>(),
            Err(TreeError::TrailingSymbols { position: 1 })
        );
        assert_eq!(
            "2FX".parse::<ProgramTree>(),
            Err(TreeError::InvalidSymbol {
                symbol: 'X',
                position: 2
            })
        );
    }

    #[test]
    fn test_parse_enforces_limits() {
        let limits = TreeLimits::new(1, 100);
        assert!(ProgramTree::parse("2FL", &limits).is_ok());
        assert_eq!(
            ProgramTree::parse("22FLR", &limits),
            Err(TreeError::DepthLimitExceeded { depth: 2, limit: 1 })
        );

        let limits = TreeLimits::new(17, 4);
        assert_eq!(
            ProgramTree::parse("3FL2AB", &limits),
            Err(TreeError::NodeLimitExceeded { nodes: 6, limit: 4 })
        );
    }

    #[test]
    fn test_arity_checked_on_construction() {
        let malformed = Node::function(Seq3, vec![t(TurnLeft)]);
        assert_eq!(
            ProgramTree::new(malformed),
            Err(TreeError::ArityMismatch {
                command: Command::Function(Seq3),
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn test_preorder_addressing() {
        let tree = sample_tree();
        let expected = "3ILFA2BR";
        for (i, symbol) in expected.chars().enumerate() {
            assert_eq!(tree.subtree(i).unwrap().command().symbol(), symbol);
        }
        assert!(tree.subtree(expected.len()).is_none());
        assert_eq!(tree.subtree(1).unwrap().node_count(), 3);
    }

    #[test]
    fn test_replace_subtree() {
        let mut tree = sample_tree();
        let removed = tree.replace_subtree(5, t(TurnLeft)).unwrap();
        assert_eq!(removed.node_count(), 3);
        assert_eq!(tree.encode(), "3ILFAL");

        let removed = tree.replace_subtree(0, t(AlignToBall)).unwrap();
        assert_eq!(removed.node_count(), 6);
        assert_eq!(tree.encode(), "A");
    }

    #[test]
    fn test_replace_subtree_rejects_bad_input() {
        let mut tree = sample_tree();
        assert!(tree.replace_subtree(42, t(TurnLeft)).is_err());
        assert!(tree.replace_subtree(2, Node::function(Seq2, vec![])).is_err());
        assert_eq!(tree, sample_tree());
    }
}
