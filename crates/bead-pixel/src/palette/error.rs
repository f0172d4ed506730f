//! Error types for palette construction and queries

use std::fmt;

use crate::color::ParseColorError;

/// Error type for palette validation and lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteError {
    /// A nearest-color query ran against a palette with no entries
    EmptyPalette,
    /// Two entries share the same `(brand, name)` identity
    DuplicateId {
        /// Brand of the duplicated entry
        brand: String,
        /// Color name of the duplicated entry
        name: String,
    },
    /// Invalid hex color string
    ParseColor(ParseColorError),
}

impl From<ParseColorError> for PaletteError {
    fn from(err: ParseColorError) -> Self {
        PaletteError::ParseColor(err)
    }
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteError::EmptyPalette => {
                write!(f, "palette has no entries")
            }
            PaletteError::DuplicateId { brand, name } => {
                write!(f, "duplicate palette entry {brand}/{name}")
            }
            PaletteError::ParseColor(err) => {
                write!(f, "invalid color: {}", err)
            }
        }
    }
}

impl std::error::Error for PaletteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PaletteError::ParseColor(err) => Some(err),
            _ => None,
        }
    }
}
