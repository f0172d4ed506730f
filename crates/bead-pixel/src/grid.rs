//! Pixel grid: the shared output model of synthesis and recognition
//!
//! Both directions of the tool converge on a rows x cols matrix of
//! [`PixelCell`]: either empty, or a bead bound to a palette entry.

use crate::color::Rgb8;
use crate::palette::PaletteId;

/// One cell of a design grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PixelCell {
    /// No bead in this cell
    #[default]
    Empty,
    /// A bead matched to a palette entry
    Bead {
        /// The sampled or extracted sRGB color
        rgb: Rgb8,
        /// Identity of the matched palette entry
        id: PaletteId,
        /// Match confidence in `[0, 1]`
        confidence: f32,
    },
}

impl PixelCell {
    /// True when the cell holds a bead.
    #[inline]
    pub fn is_bead(&self) -> bool {
        matches!(self, PixelCell::Bead { .. })
    }
}

/// A dense rows x cols matrix of [`PixelCell`], row-major.
///
/// Invariants: `rows >= 1`, `cols >= 1`, and the matrix is rectangular by
/// construction. Mutation happens only through explicit per-cell
/// assignment ([`set`](Self::set)).
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    rows: usize,
    cols: usize,
    cells: Vec<PixelCell>,
}

impl PixelGrid {
    /// Create a grid of empty cells.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero; grid sizes are validated at the
    /// pipeline boundary before construction.
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows >= 1 && cols >= 1, "grid must be at least 1x1");
        Self {
            rows,
            cols,
            cells: vec![PixelCell::Empty; rows * cols],
        }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &PixelCell {
        assert!(row < self.rows && col < self.cols);
        &self.cells[row * self.cols + col]
    }

    /// Assign the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: PixelCell) {
        assert!(row < self.rows && col < self.cols);
        self.cells[row * self.cols + col] = cell;
    }

    /// Iterate cells with their coordinates in row-major `(row, col)` order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &PixelCell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (i / self.cols, i % self.cols, c))
    }

    /// Count of cells holding a bead.
    pub fn bead_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_bead()).count()
    }
}
