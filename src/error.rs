use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid hex color {color:?} for {brand}/{name}")]
    BadCatalogColor {
        brand: String,
        name: String,
        color: String,
    },

    #[error("Catalog file {path}: {source}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown brand {0:?} in palette selection")]
    UnknownBrand(String),

    #[error("Unknown color {brand}/{name} in palette selection")]
    UnknownColor { brand: String, name: String },

    #[error("Design {0} not found")]
    DesignNotFound(String),

    #[error("Corrupt design record {path}: {source}")]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Palette error: {0}")]
    Palette(#[from] bead_pixel::PaletteError),

    #[error("Quantize error: {0}")]
    Quantize(#[from] bead_pixel::QuantizeError),

    #[error("Recognition error: {0}")]
    Recognize(#[from] bead_pixel::RecognizeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
