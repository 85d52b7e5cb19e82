use std::fmt;

/// Internal commands. Each one routes control to a fixed number of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Run three children in order.
    Seq3,
    /// Run two children in order.
    Seq2,
    /// First child if the robot is near a wall, second otherwise.
    IfWall,
    /// First child if the robot can see the ball, second otherwise.
    IfBall,
}

/// Leaf commands. Each one is a single robot actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    AlignToBall,
}

/// The closed vocabulary a robot program is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Function(FunctionKind),
    Terminal(TerminalKind),
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 4] = [
        FunctionKind::Seq3,
        FunctionKind::Seq2,
        FunctionKind::IfWall,
        FunctionKind::IfBall,
    ];

    pub fn arity(self) -> usize {
        match self {
            FunctionKind::Seq3 => 3,
            FunctionKind::Seq2 | FunctionKind::IfWall | FunctionKind::IfBall => 2,
        }
    }
}

impl TerminalKind {
    pub const ALL: [TerminalKind; 5] = [
        TerminalKind::MoveForward,
        TerminalKind::MoveBackward,
        TerminalKind::TurnLeft,
        TerminalKind::TurnRight,
        TerminalKind::AlignToBall,
    ];
}

impl Command {
    /// Number of children a node carrying this command must have.
    pub fn arity(self) -> usize {
        match self {
            Command::Function(kind) => kind.arity(),
            Command::Terminal(_) => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Command::Terminal(_))
    }

    /// Single-character form used by the program text encoding.
    pub fn symbol(self) -> char {
        match self {
            Command::Function(FunctionKind::Seq3) => '3',
            Command::Function(FunctionKind::Seq2) => '2',
            Command::Function(FunctionKind::IfWall) => 'I',
            Command::Function(FunctionKind::IfBall) => 'C',
            Command::Terminal(TerminalKind::MoveForward) => 'F',
            Command::Terminal(TerminalKind::MoveBackward) => 'B',
            Command::Terminal(TerminalKind::TurnLeft) => 'L',
            Command::Terminal(TerminalKind::TurnRight) => 'R',
            Command::Terminal(TerminalKind::AlignToBall) => 'A',
        }
    }

    /// Inverse of [`Command::symbol`]. Returns `None` for characters outside the vocabulary.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let command = match symbol {
            '3' => Command::Function(FunctionKind::Seq3),
            '2' => Command::Function(FunctionKind::Seq2),
            'I' => Command::Function(FunctionKind::IfWall),
            'C' => Command::Function(FunctionKind::IfBall),
            'F' => Command::Terminal(TerminalKind::MoveForward),
            'B' => Command::Terminal(TerminalKind::MoveBackward),
            'L' => Command::Terminal(TerminalKind::TurnLeft),
            'R' => Command::Terminal(TerminalKind::TurnRight),
            'A' => Command::Terminal(TerminalKind::AlignToBall),
            _ => return None,
        };
        Some(command)
    }
}

impl From<FunctionKind> for Command {
    fn from(kind: FunctionKind) -> Self {
        Command::Function(kind)
    }
}

impl From<TerminalKind> for Command {
    fn from(kind: TerminalKind) -> Self {
        Command::Terminal(kind)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Function(FunctionKind::Seq3) => "SEQ3",
            Command::Function(FunctionKind::Seq2) => "SEQ2",
            Command::Function(FunctionKind::IfWall) => "IF_WALL",
            Command::Function(FunctionKind::IfBall) => "IF_BALL",
            Command::Terminal(TerminalKind::MoveForward) => "MOVE_FORWARD",
            Command::Terminal(TerminalKind::MoveBackward) => "MOVE_BACKWARD",
            Command::Terminal(TerminalKind::TurnLeft) => "TURN_LEFT",
            Command::Terminal(TerminalKind::TurnRight) => "TURN_RIGHT",
            Command::Terminal(TerminalKind::AlignToBall) => "ALIGN_TO_BALL",
        };
        f.write_str(name)
    }
}
