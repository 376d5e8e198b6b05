/// A grid cell index `(column, row)`.
pub type Cell = (usize, usize);

/// Rasterized occupancy map used for constant-time collision queries.
///
/// Each cell counts how many trail writes landed in it. Counters only ever
/// grow; a grid lives for exactly one round and is dropped with its
/// simulation.
#[derive(Debug, Clone)]
pub struct CollisionGrid {
    cell_size: f32,
    columns: usize,
    rows: usize,
    cells: Vec<u16>,
}

impl CollisionGrid {
    /// Allocate an all-zero grid covering `width` x `height` with square
    /// cells of `cell_size`.
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let columns = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            cell_size,
            columns,
            rows,
            cells: vec![0; columns * rows],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Map a world position to its cell, rounding to the nearest cell corner.
    /// Returns `None` when the position falls outside the grid.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<Cell> {
        let gx = 0.5 + x / self.cell_size;
        let gy = 0.5 + y / self.cell_size;
        // Checked before truncation, which would fold (-1, 0) onto zero.
        if gx < 0.0 || gy < 0.0 {
            return None;
        }
        let (gx, gy) = (gx.trunc() as usize, gy.trunc() as usize);
        (gx < self.columns && gy < self.rows).then_some((gx, gy))
    }

    /// Current occupancy of a cell. Out-of-range cells read as empty.
    pub fn get(&self, cell: Cell) -> u16 {
        self.index(cell).map_or(0, |i| self.cells[i])
    }

    /// Increment a cell and return its new occupancy.
    /// Out-of-range cells are ignored and read as empty.
    pub fn insert(&mut self, cell: Cell) -> u16 {
        match self.index(cell) {
            Some(i) => {
                self.cells[i] = self.cells[i].saturating_add(1);
                self.cells[i]
            },
            None => 0,
        }
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Number of cells with nonzero occupancy.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|&&c| c > 0).count()
    }

    fn index(&self, (x, y): Cell) -> Option<usize> {
        (x < self.columns && y < self.rows).then(|| y * self.columns + x)
    }
}
