use crate::arena::Arena;
use crate::arena::grid::Grid;

/// Cell-level record of one episode, the data needed to replay or draw it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trajectory {
    /// Robot cell before the first tick and after every tick
    pub robot: Vec<(i64, i64)>,
    /// Ball cell sampled at the same instants as `robot`
    pub ball: Vec<(i64, i64)>,
    /// Steps at which a hit was scored
    pub hits: Vec<usize>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, arena: &Arena) {
        self.robot.push(Grid::cell_of(arena.robot.row, arena.robot.col));
        self.ball.push(Grid::cell_of(arena.ball.row, arena.ball.col));
    }

    pub fn record_hit(&mut self, step: usize) {
        self.hits.push(step);
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.robot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robot.is_empty()
    }

    /// Distinct cells the robot visited.
    pub fn cells_visited(&self) -> usize {
        let mut cells = self.robot.clone();
        cells.sort_unstable();
        cells.dedup();
        cells.len()
    }
}
