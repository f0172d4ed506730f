//! Shared helpers for synthesizing test images.

use crate::color::Rgb8;

/// Build an RGBA8 buffer from a closure over `(x, y)`.
pub fn synth_rgba(width: usize, height: usize, f: impl Fn(usize, usize) -> Rgb8) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let p = f(x, y);
            data.extend_from_slice(&[p.r, p.g, p.b, 255]);
        }
    }
    data
}

/// A gray lattice photo: `disks x disks` dark disks of the given radius on a
/// light background, centers on a square lattice of the given pitch starting
/// at `(start, start)`. `keep` decides which lattice sites get a disk.
pub fn synth_lattice(
    width: usize,
    height: usize,
    disks: usize,
    radius: f32,
    pitch: f32,
    start: f32,
    keep: impl Fn(usize, usize) -> bool,
) -> Vec<u8> {
    synth_rgba(width, height, |x, y| {
        for row in 0..disks {
            for col in 0..disks {
                if !keep(row, col) {
                    continue;
                }
                let cx = start + col as f32 * pitch;
                let cy = start + row as f32 * pitch;
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    return Rgb8::new(30, 30, 30);
                }
            }
        }
        Rgb8::new(220, 220, 220)
    })
}

/// A bead-board photo: colored annuli (bright saturated ring, dark hole,
/// neutral background) on a square lattice. `color` returns the bead color
/// for a lattice site, or `None` for an unoccupied cell.
pub fn synth_bead_board(
    width: usize,
    height: usize,
    sites: usize,
    pitch: f32,
    start: f32,
    color: impl Fn(usize, usize) -> Option<Rgb8>,
) -> Vec<u8> {
    let hole_r = pitch * 0.18;
    let bead_r = pitch * 0.45;
    synth_rgba(width, height, |x, y| {
        for row in 0..sites {
            for col in 0..sites {
                let Some(c) = color(row, col) else { continue };
                let cx = start + col as f32 * pitch;
                let cy = start + row as f32 * pitch;
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if d <= hole_r {
                    return Rgb8::new(40, 40, 40);
                }
                if d <= bead_r {
                    return c;
                }
            }
        }
        Rgb8::new(120, 120, 120)
    })
}
