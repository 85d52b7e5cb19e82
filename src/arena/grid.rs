use crate::config::ArenaConfig;

/// State of a single arena cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Holds the robot or the ball
    Occupied,
    Wall,
}

/// Components below this are rounding noise from `sin`/`cos` at multiples of 90 degrees.
const DIRECTION_EPSILON: f64 = 1e-12;

/// Unit step `(d_row, d_col)` for a heading in degrees. 0 points to increasing columns and 90 to
/// decreasing rows. Near-zero components are flushed to exactly zero so axis-aligned moves never
/// drift across a cell boundary.
pub fn direction(angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.to_radians().sin_cos();
    let flush = |v: f64| if v.abs() < DIRECTION_EPSILON { 0.0 } else { v };
    (-flush(sin), flush(cos))
}

/// Bounded cell grid the actors move on.
///
/// The outer ring is always `Wall`. Interior walls come from the configured obstacles and are
/// re-stamped on every [`Grid::reset`]. Reads outside the grid see `Wall`, writes outside the grid
/// are dropped, so actors never need to bounds-check.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Cell>,
    config: ArenaConfig,
}

impl Grid {
    pub fn new(config: &ArenaConfig) -> Self {
        let mut grid = Self {
            height: config.height,
            width: config.width,
            cells: vec![Cell::Empty; config.height * config.width],
            config: config.clone(),
        };
        grid.reset();
        grid
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Clears every actor mark and restores border and obstacle walls.
    pub fn reset(&mut self) {
        for row in 0..self.height {
            for col in 0..self.width {
                let border =
                    row == 0 || row == self.height - 1 || col == 0 || col == self.width - 1;
                self.cells[row * self.width + col] =
                    if border || self.config.is_obstacle(row, col) {
                        Cell::Wall
                    } else {
                        Cell::Empty
                    };
            }
        }
    }

    fn index(&self, row: i64, col: i64) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.height && col < self.width).then(|| row * self.width + col)
    }

    pub fn get_cell(&self, row: i64, col: i64) -> Cell {
        self.index(row, col)
            .map(|i| self.cells[i])
            .unwrap_or(Cell::Wall)
    }

    /// Writes `state` into the cell. Out of bounds and wall cells are left untouched, so the
    /// border can never be erased by an actor.
    pub fn set_cell(&mut self, row: i64, col: i64, state: Cell) {
        if let Some(i) = self.index(row, col) {
            if self.cells[i] != Cell::Wall {
                self.cells[i] = state;
            }
        }
    }

    /// Cell containing a real-valued position.
    pub fn cell_of(row: f64, col: f64) -> (i64, i64) {
        (row.floor() as i64, col.floor() as i64)
    }

    /// Cell state at a real-valued position.
    pub fn cell_at(&self, row: f64, col: f64) -> Cell {
        let (r, c) = Self::cell_of(row, col);
        self.get_cell(r, c)
    }

    /// Marks the cell holding a real-valued position.
    pub fn mark_at(&mut self, row: f64, col: f64, state: Cell) {
        let (r, c) = Self::cell_of(row, col);
        self.set_cell(r, c, state);
    }

    /// Samples the ray leaving `(row, col)` at `angle` degrees, one unit per step, for `steps`
    /// samples. The angle convention matches actor movement: 0 points to increasing columns and
    /// 90 to decreasing rows. Any sample landing outside the grid or on a wall blocks the path.
    /// Zero steps is vacuously clear.
    pub fn is_path_clear(&self, row: f64, col: f64, angle: f64, steps: u32) -> bool {
        let (d_row, d_col) = direction(angle);
        (1..=steps).all(|step| {
            let step = f64::from(step);
            self.cell_at(row + step * d_row, col + step * d_col) != Cell::Wall
        })
    }

    /// Number of cells in the given state.
    pub fn count(&self, state: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Obstacle;

    fn open_grid(height: usize, width: usize) -> Grid {
        Grid::new(&ArenaConfig::open(height, width))
    }

    #[test]
    fn test_border_is_wall() {
        let grid = open_grid(5, 6);
        for col in 0..6 {
            assert_eq!(grid.get_cell(0, col), Cell::Wall);
            assert_eq!(grid.get_cell(4, col), Cell::Wall);
        }
        for row in 0..5 {
            assert_eq!(grid.get_cell(row, 0), Cell::Wall);
            assert_eq!(grid.get_cell(row, 5), Cell::Wall);
        }
        assert_eq!(grid.count(Cell::Empty), 3 * 4);
    }

    #[test]
    fn test_out_of_bounds_reads_wall_and_writes_are_dropped() {
        let mut grid = open_grid(5, 5);
        assert_eq!(grid.get_cell(-1, 2), Cell::Wall);
        assert_eq!(grid.get_cell(2, 5), Cell::Wall);
        assert_eq!(grid.get_cell(100, 100), Cell::Wall);

        let before = grid.clone();
        grid.set_cell(-3, 0, Cell::Occupied);
        grid.set_cell(5, 5, Cell::Empty);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_walls_cannot_be_overwritten() {
        let mut grid = open_grid(5, 5);
        grid.set_cell(0, 0, Cell::Empty);
        grid.set_cell(0, 2, Cell::Occupied);
        assert_eq!(grid.get_cell(0, 0), Cell::Wall);
        assert_eq!(grid.get_cell(0, 2), Cell::Wall);
    }

    #[test]
    fn test_reset_clears_actors_and_is_idempotent() {
        let config = ArenaConfig {
            height: 10,
            width: 10,
            obstacles: vec![Obstacle {
                row: 4,
                col: 4,
                size: 2,
            }],
        };
        let mut grid = Grid::new(&config);
        let pristine = grid.clone();
        grid.set_cell(2, 2, Cell::Occupied);
        grid.reset();
        assert_eq!(grid, pristine);
        grid.reset();
        assert_eq!(grid, pristine);
        assert_eq!(grid.get_cell(5, 5), Cell::Wall);
        assert_eq!(grid.get_cell(6, 6), Cell::Empty);
    }

    #[test]
    fn test_direction_is_exact_on_axes() {
        assert_eq!(direction(0.0), (0.0, 1.0));
        assert_eq!(direction(90.0), (-1.0, 0.0));
        assert_eq!(direction(180.0), (0.0, -1.0));
        assert_eq!(direction(270.0), (1.0, 0.0));
        let (d_row, d_col) = direction(45.0);
        assert!((d_row + std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((d_col - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_path_clear_zero_steps() {
        let grid = open_grid(5, 5);
        // Even from a wall cell, no samples means nothing blocks.
        assert!(grid.is_path_clear(0.0, 0.0, 0.0, 0));
        assert!(grid.is_path_clear(2.0, 2.0, 45.0, 0));
    }

    #[test]
    fn test_path_clear_east_and_north() {
        let grid = open_grid(5, 5);
        // East: (2,3) is free, (2,4) is the border
        assert!(grid.is_path_clear(2.0, 2.0, 0.0, 1));
        assert!(!grid.is_path_clear(2.0, 2.0, 0.0, 2));
        // North: 90 degrees decreases the row
        assert!(grid.is_path_clear(2.5, 2.5, 90.0, 1));
        assert!(!grid.is_path_clear(2.5, 2.5, 90.0, 2));
        // West and south
        assert!(grid.is_path_clear(2.5, 2.5, 180.0, 1));
        assert!(!grid.is_path_clear(2.5, 2.5, 180.0, 2));
        assert!(grid.is_path_clear(2.5, 2.5, 270.0, 1));
        assert!(!grid.is_path_clear(2.5, 2.5, 270.0, 2));
    }

    #[test]
    fn test_path_blocked_by_obstacle_midway() {
        let config = ArenaConfig {
            height: 10,
            width: 10,
            obstacles: vec![Obstacle {
                row: 5,
                col: 4,
                size: 1,
            }],
        };
        let grid = Grid::new(&config);
        // The obstacle sits on the second sample, later samples are clear
        assert!(!grid.is_path_clear(5.5, 2.5, 0.0, 4));
        assert!(grid.is_path_clear(5.5, 2.5, 0.0, 1));
    }

    #[test]
    fn test_occupied_cells_do_not_block_rays() {
        let mut grid = open_grid(6, 6);
        grid.set_cell(2, 3, Cell::Occupied);
        assert!(grid.is_path_clear(2.5, 2.5, 0.0, 1));
    }

    #[test]
    fn test_path_clear_is_deterministic() {
        let grid = Grid::new(&ArenaConfig::default());
        for angle in (0..360).step_by(15) {
            let a = grid.is_path_clear(100.3, 50.7, f64::from(angle), 30);
            let b = grid.is_path_clear(100.3, 50.7, f64::from(angle), 30);
            assert_eq!(a, b);
        }
    }
}
