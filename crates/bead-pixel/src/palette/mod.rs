//! Palette types and nearest-color matching
//!
//! A [`Palette`] is the closed set of bead colors a design may use. Entries
//! carry a `(brand, name)` identity and a precomputed Lab value so that
//! per-cell matching is a pure distance scan.

mod error;
#[allow(clippy::module_inception)]
mod palette;

pub use error::PaletteError;
pub use palette::{match_confidence, Palette, PaletteEntry, PaletteId};
