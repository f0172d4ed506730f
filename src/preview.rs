//! PNG preview rendering
//!
//! Renders a pixel grid to a flat-color raster: one square per cell, a
//! light checker for empty cells, and optional reference lines every ten
//! cells. This is a working preview, not the full annotated export.

use image::{Rgba, RgbaImage};

use bead_pixel::{PixelCell, PixelGrid};

/// Empty-cell checker colors.
const CHECKER_LIGHT: Rgba<u8> = Rgba([235, 235, 235, 255]);
const CHECKER_DARK: Rgba<u8> = Rgba([215, 215, 215, 255]);

/// Reference line overlay color.
const REFERENCE_LINE: Rgba<u8> = Rgba([60, 60, 60, 255]);

/// Cells between reference lines.
const REFERENCE_EVERY: usize = 10;

/// Render `grid` with `cell_size`-pixel cells.
pub fn render_preview(grid: &PixelGrid, cell_size: u32, show_reference_lines: bool) -> RgbaImage {
    let cell = cell_size.max(1);
    let width = grid.cols() as u32 * cell;
    let height = grid.rows() as u32 * cell;
    let mut img = RgbaImage::new(width, height);

    for (row, col, content) in grid.cells() {
        let color = match content {
            PixelCell::Bead { rgb, .. } => Rgba([rgb.r, rgb.g, rgb.b, 255]),
            PixelCell::Empty => {
                if (row + col) % 2 == 0 {
                    CHECKER_LIGHT
                } else {
                    CHECKER_DARK
                }
            }
        };
        let x0 = col as u32 * cell;
        let y0 = row as u32 * cell;
        for y in y0..y0 + cell {
            for x in x0..x0 + cell {
                img.put_pixel(x, y, color);
            }
        }
    }

    if show_reference_lines {
        for col in (REFERENCE_EVERY..grid.cols()).step_by(REFERENCE_EVERY) {
            let x = col as u32 * cell;
            for y in 0..height {
                img.put_pixel(x, y, REFERENCE_LINE);
            }
        }
        for row in (REFERENCE_EVERY..grid.rows()).step_by(REFERENCE_EVERY) {
            let y = row as u32 * cell;
            for x in 0..width {
                img.put_pixel(x, y, REFERENCE_LINE);
            }
        }
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use bead_pixel::{PaletteId, Rgb8};

    fn grid_with_bead() -> PixelGrid {
        let mut grid = PixelGrid::new(12, 15);
        grid.set(
            1,
            2,
            PixelCell::Bead {
                rgb: Rgb8::new(220, 40, 40),
                id: PaletteId::new("Classic", "Red"),
                confidence: 1.0,
            },
        );
        grid
    }

    #[test]
    fn test_preview_dimensions() {
        let img = render_preview(&grid_with_bead(), 8, false);
        assert_eq!(img.width(), 15 * 8);
        assert_eq!(img.height(), 12 * 8);
    }

    #[test]
    fn test_bead_cell_painted_with_its_color() {
        let img = render_preview(&grid_with_bead(), 8, false);
        // Center of cell (1, 2)
        assert_eq!(*img.get_pixel(2 * 8 + 4, 8 + 4), Rgba([220, 40, 40, 255]));
        // An empty cell gets the checker
        let p = *img.get_pixel(4, 4);
        assert!(p == CHECKER_LIGHT || p == CHECKER_DARK);
    }

    #[test]
    fn test_reference_lines() {
        let img = render_preview(&grid_with_bead(), 8, true);
        // Vertical line at cell column 10
        assert_eq!(*img.get_pixel(10 * 8, 3), REFERENCE_LINE);
        // Horizontal line at cell row 10
        assert_eq!(*img.get_pixel(3, 10 * 8), REFERENCE_LINE);
    }

    #[test]
    fn test_zero_cell_size_clamped() {
        let img = render_preview(&grid_with_bead(), 0, false);
        assert_eq!(img.width(), 15);
        assert_eq!(img.height(), 12);
    }
}
