use crate::arena::grid::{Cell, Grid, direction};
use rand::Rng;

/// How many cells ahead the wall sense looks.
const WALL_SENSE_STEPS: u32 = 2;

/// Brings any angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid may round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Bearing from `(from_row, from_col)` to `(to_row, to_col)` in degrees.
///
/// The raw `atan2` angle is remapped with `360 - a` when the target lies at a non-negative
/// column offset and `180 - a` otherwise. For targets to the right this yields the movement
/// convention (0 = increasing column, 90 = decreasing row); for targets to the left it yields the
/// mirror image about the vertical axis. Robot senses are tuned against exactly this mapping.
pub fn bearing(from_row: f64, from_col: f64, to_row: f64, to_col: f64) -> f64 {
    let dy = to_row - from_row;
    let dx = to_col - from_col;
    let angle = dy.atan2(dx).to_degrees();
    let angle = if dx >= 0.0 { 360.0 - angle } else { 180.0 - angle };
    normalize_degrees(angle)
}

/// Integer-truncated angular difference, the comparison every robot sense uses.
fn truncated_difference(a: f64, b: f64) -> i32 {
    (a - b) as i32
}

/// The controlled actor. Position is real-valued, the occupied cell is its floor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Robot {
    pub row: f64,
    pub col: f64,
    /// Degrees in `[0, 360)`, 0 points to increasing columns
    pub heading: i32,
}

impl Robot {
    pub fn at(row: f64, col: f64, heading: i32) -> Self {
        Self { row, col, heading }
    }

    /// Places the robot on a random free interior cell with a random heading that is a multiple
    /// of `turn_angle`, then marks the cell occupied.
    ///
    /// A sampled cell that is not free gets one more chance: a coin flip picks either the column
    /// or the row to redraw before the cell is checked again. Only then is the whole sample
    /// thrown away.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R, grid: &mut Grid, turn_angle: i32) {
        let height = grid.height() as i64;
        let width = grid.width() as i64;
        loop {
            self.heading = turn_angle * rng.random_range(0..360 / turn_angle);
            let mut col = rng.random_range(1..width - 1);
            let mut row = rng.random_range(1..height - 1);

            if grid.get_cell(row, col) != Cell::Empty {
                if rng.random_bool(0.5) {
                    col = rng.random_range(1..width - 1);
                } else {
                    row = rng.random_range(1..height - 1);
                }
            }

            if grid.get_cell(row, col) == Cell::Empty {
                self.row = row as f64;
                self.col = col as f64;
                break;
            }
        }
        grid.mark_at(self.row, self.col, Cell::Occupied);
    }

    pub fn move_forward(&mut self, grid: &mut Grid) -> bool {
        self.step(grid, self.heading)
    }

    pub fn move_backward(&mut self, grid: &mut Grid) -> bool {
        self.step(grid, self.heading + 180)
    }

    /// One unit along `angle`. Walls silently stop the move; returns whether it happened.
    fn step(&mut self, grid: &mut Grid, angle: i32) -> bool {
        let (d_row, d_col) = direction(f64::from(angle));
        let next_row = self.row + d_row;
        let next_col = self.col + d_col;
        if grid.cell_at(next_row, next_col) == Cell::Wall {
            return false;
        }
        grid.mark_at(self.row, self.col, Cell::Empty);
        self.row = next_row;
        self.col = next_col;
        grid.mark_at(self.row, self.col, Cell::Occupied);
        true
    }

    pub fn turn_left(&mut self, turn_angle: i32) {
        self.heading = (self.heading + turn_angle).rem_euclid(360);
    }

    pub fn turn_right(&mut self, turn_angle: i32) {
        self.heading = (self.heading - turn_angle).rem_euclid(360);
    }

    /// Snaps the heading onto the ball's bearing when the ball lies inside the vision cone and
    /// the first cell towards it is not a wall. Otherwise the heading only gets re-normalized.
    pub fn align_to_ball(&mut self, grid: &Grid, ball_row: f64, ball_col: f64, view_angle: i32) {
        let target = bearing(self.row, self.col, ball_row, ball_col);
        self.heading = self.heading.rem_euclid(360);
        if truncated_difference(target, f64::from(self.heading)).abs() <= view_angle
            && grid.is_path_clear(self.row, self.col, target, 1)
        {
            self.heading = target as i32;
        }
    }

    pub fn is_near_wall(&self, grid: &Grid) -> bool {
        !grid.is_path_clear(self.row, self.col, f64::from(self.heading), WALL_SENSE_STEPS)
    }

    /// Ball visibility sense.
    ///
    /// The ball counts as hidden only when it lies outside the vision cone *and* the first cell
    /// towards it is clear. A ball outside the cone behind a blocked first cell still reads as
    /// visible. Evolved programs depend on this exact truth table.
    pub fn can_see_ball(&self, grid: &Grid, ball_row: f64, ball_col: f64, view_angle: i32) -> bool {
        let target = bearing(self.row, self.col, ball_row, ball_col);
        let diff = truncated_difference(target, f64::from(self.heading));
        let outside_cone = diff > view_angle || diff < -view_angle;
        !(outside_cone && grid.is_path_clear(self.row, self.col, target, 1))
    }
}
