pub mod ball;
pub mod grid;
pub mod robot;

use crate::arena::ball::Ball;
use crate::arena::grid::{Cell, Grid};
use crate::arena::robot::Robot;
use crate::config::{ArenaConfig, SimulationConfig};
use rand::Rng;

/// One self-contained world: the grid plus the two actors living on it.
///
/// Every evaluation owns its own `Arena`, nothing in here is shared between individuals.
#[derive(Debug, Clone)]
pub struct Arena {
    pub grid: Grid,
    pub robot: Robot,
    pub ball: Ball,
    turn_angle: i32,
    view_angle: i32,
}

impl Arena {
    /// Builds the grid. Actors sit at the origin until [`Arena::reset`] places them.
    pub fn new(arena: &ArenaConfig, simulation: &SimulationConfig) -> Self {
        Self {
            grid: Grid::new(arena),
            robot: Robot::default(),
            ball: Ball::default(),
            turn_angle: simulation.turn_angle,
            view_angle: simulation.view_angle,
        }
    }

    /// Starts a fresh episode: clean grid, robot placed first, then the ball on another cell.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid.reset();
        self.robot.initialize(rng, &mut self.grid, self.turn_angle);
        self.ball.place(rng, &mut self.grid);
    }

    /// Puts the robot at a fixed pose, keeping grid occupancy consistent.
    pub fn place_robot(&mut self, row: f64, col: f64, heading: i32) {
        self.grid.mark_at(self.robot.row, self.robot.col, Cell::Empty);
        self.robot = Robot::at(row, col, heading);
        self.grid.mark_at(row, col, Cell::Occupied);
    }

    /// Puts the ball at a fixed position, keeping grid occupancy consistent.
    pub fn place_ball(&mut self, row: f64, col: f64) {
        self.grid.mark_at(self.ball.row, self.ball.col, Cell::Empty);
        self.ball = Ball::at(row, col, 0);
        self.grid.mark_at(row, col, Cell::Occupied);
    }

    /// Euclidean robot-ball distance.
    pub fn distance(&self) -> f64 {
        (self.ball.row - self.robot.row).hypot(self.ball.col - self.robot.col)
    }

    pub fn move_forward(&mut self) {
        self.robot.move_forward(&mut self.grid);
    }

    pub fn move_backward(&mut self) {
        self.robot.move_backward(&mut self.grid);
    }

    pub fn turn_left(&mut self) {
        self.robot.turn_left(self.turn_angle);
    }

    pub fn turn_right(&mut self) {
        self.robot.turn_right(self.turn_angle);
    }

    pub fn align_to_ball(&mut self) {
        self.robot
            .align_to_ball(&self.grid, self.ball.row, self.ball.col, self.view_angle);
    }

    pub fn is_near_wall(&self) -> bool {
        self.robot.is_near_wall(&self.grid)
    }

    pub fn can_see_ball(&self) -> bool {
        self.robot
            .can_see_ball(&self.grid, self.ball.row, self.ball.col, self.view_angle)
    }

    /// Knocks the ball away along the robot's heading. Returns the bounce sub-steps taken.
    pub fn strike_ball(&mut self) -> usize {
        self.ball.bounce(&mut self.grid, self.robot.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_reset_places_both_actors_on_distinct_free_cells() {
        let config = Config::default();
        let mut arena = Arena::new(&config.arena, &config.simulation);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            arena.reset(&mut rng);
            let robot_cell = Grid::cell_of(arena.robot.row, arena.robot.col);
            let ball_cell = Grid::cell_of(arena.ball.row, arena.ball.col);
            assert_ne!(robot_cell, ball_cell);
            assert_eq!(arena.grid.get_cell(robot_cell.0, robot_cell.1), Cell::Occupied);
            assert_eq!(arena.grid.get_cell(ball_cell.0, ball_cell.1), Cell::Occupied);
            assert_eq!(arena.grid.count(Cell::Occupied), 2);
            assert!(arena.distance() >= 1.0);
        }
    }

    #[test]
    fn test_reset_twice_keeps_invariants() {
        let config = Config::default();
        let mut arena = Arena::new(&config.arena, &config.simulation);
        let mut rng = StdRng::seed_from_u64(2);

        arena.reset(&mut rng);
        let walls = arena.grid.count(Cell::Wall);
        arena.reset(&mut rng);
        assert_eq!(arena.grid.count(Cell::Wall), walls);
        assert_eq!(arena.grid.count(Cell::Occupied), 2);
    }

    #[test]
    fn test_place_helpers_move_occupancy() {
        let config = Config::default();
        let mut arena = Arena::new(&ArenaConfig::open(6, 6), &config.simulation);
        arena.place_robot(2.0, 2.0, 0);
        arena.place_ball(3.0, 4.0);
        arena.place_robot(1.0, 1.0, 90);
        assert_eq!(arena.grid.get_cell(2, 2), Cell::Empty);
        assert_eq!(arena.grid.get_cell(1, 1), Cell::Occupied);
        assert_eq!(arena.grid.get_cell(3, 4), Cell::Occupied);
        assert_eq!(arena.grid.count(Cell::Occupied), 2);
    }

    #[test]
    fn test_turns_use_configured_angle() {
        let mut config = Config::default();
        config.simulation.turn_angle = 90;
        let mut arena = Arena::new(&ArenaConfig::open(6, 6), &config.simulation);
        arena.place_robot(2.0, 2.0, 0);
        arena.turn_left();
        assert_eq!(arena.robot.heading, 90);
        arena.turn_right();
        arena.turn_right();
        assert_eq!(arena.robot.heading, 270);
    }
}
