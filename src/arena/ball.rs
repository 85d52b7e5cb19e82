use crate::arena::grid::{Cell, Grid, direction};
use rand::Rng;

/// Sub-steps the ball travels after every hit, whatever the arena size.
pub const BOUNCE_SUBSTEPS: usize = 40;

/// Distance covered by a single bounce sub-step.
const SUBSTEP_LENGTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ball {
    pub row: f64,
    pub col: f64,
    pub heading: i32,
}

impl Ball {
    pub fn at(row: f64, col: f64, heading: i32) -> Self {
        Self { row, col, heading }
    }

    /// Draws interior cells until an empty one turns up and occupies it. The robot is placed
    /// first, so its cell is never picked.
    pub fn place<R: Rng + ?Sized>(&mut self, rng: &mut R, grid: &mut Grid) {
        let height = grid.height() as i64;
        let width = grid.width() as i64;
        loop {
            let col = rng.random_range(1..width - 1);
            let row = rng.random_range(1..height - 1);
            if grid.get_cell(row, col) == Cell::Empty {
                self.row = row as f64;
                self.col = col as f64;
                self.heading = 0;
                break;
            }
        }
        grid.mark_at(self.row, self.col, Cell::Occupied);
    }

    fn ahead(&self) -> (f64, f64) {
        let (d_row, d_col) = direction(f64::from(self.heading));
        (
            self.row + SUBSTEP_LENGTH * d_row,
            self.col + SUBSTEP_LENGTH * d_col,
        )
    }

    /// Sends the ball off along `heading` for exactly [`BOUNCE_SUBSTEPS`] sub-steps.
    ///
    /// A sub-step whose target is a wall (or outside the grid) reverses the heading and
    /// retargets. If the reversed target is blocked as well the ball holds its cell for that
    /// sub-step. Occupancy is rewritten on every sub-step. Returns the number of sub-steps run.
    pub fn bounce(&mut self, grid: &mut Grid, heading: i32) -> usize {
        self.heading = heading.rem_euclid(360);
        for _ in 0..BOUNCE_SUBSTEPS {
            let (mut next_row, mut next_col) = self.ahead();
            if grid.cell_at(next_row, next_col) == Cell::Wall {
                self.heading = (self.heading + 180) % 360;
                (next_row, next_col) = self.ahead();
                if grid.cell_at(next_row, next_col) == Cell::Wall {
                    (next_row, next_col) = (self.row, self.col);
                }
            }
            grid.mark_at(self.row, self.col, Cell::Empty);
            self.row = next_row;
            self.col = next_col;
            grid.mark_at(self.row, self.col, Cell::Occupied);
        }
        BOUNCE_SUBSTEPS
    }
}
