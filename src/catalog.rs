//! Bead color catalogs
//!
//! A catalog file is a JSON object keyed by brand name; each brand maps to
//! a list of `{name, color}` records where `color` is 6-digit uppercase hex
//! without a `#`. The loader validates the hex, deduplicates repeated
//! `(brand, name)` entries (first wins), and builds `bead_pixel` palettes
//! restricted to an optional brand/name selection.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use bead_pixel::{Palette, PaletteId, Rgb8};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    color: String,
}

/// Selection of catalog colors: brand name to color names. An empty name
/// list selects the whole brand.
pub type PaletteSelection = BTreeMap<String, Vec<String>>;

/// An ordered set of brands, each an ordered list of named colors.
#[derive(Debug, Clone)]
pub struct Catalog {
    brands: BTreeMap<String, Vec<(String, Rgb8)>>,
}

/// The built-in starter catalog: a classic 24-color set, available without
/// any catalog file.
const BUILTIN: &[(&str, &str)] = &[
    ("White", "FFFFFF"),
    ("Cream", "F5E6C8"),
    ("Yellow", "F0DC28"),
    ("Orange", "F07818"),
    ("Red", "DC2828"),
    ("Pink", "F0A0C8"),
    ("Purple", "783C96"),
    ("Dark Blue", "28288C"),
    ("Blue", "2850C8"),
    ("Light Blue", "64A0DC"),
    ("Green", "187818"),
    ("Light Green", "50C850"),
    ("Pastel Green", "A0DCA0"),
    ("Brown", "784614"),
    ("Light Brown", "B48C50"),
    ("Tan", "DCC8A0"),
    ("Gray", "808080"),
    ("Dark Gray", "464646"),
    ("Black", "000000"),
    ("Pastel Blue", "A0C8F0"),
    ("Pastel Yellow", "F0F0A0"),
    ("Pastel Pink", "F0C8DC"),
    ("Turquoise", "28B4B4"),
    ("Burgundy", "962832"),
];

impl Catalog {
    /// The embedded starter catalog under the brand "Classic".
    pub fn builtin() -> Self {
        let colors = BUILTIN
            .iter()
            .map(|(name, hex)| {
                let rgb = parse_catalog_hex(hex).expect("builtin catalog is well-formed");
                (name.to_string(), rgb)
            })
            .collect();
        let mut brands = BTreeMap::new();
        brands.insert("Classic".to_string(), colors);
        Self { brands }
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        let raw: BTreeMap<String, Vec<CatalogEntry>> =
            serde_json::from_str(&text).map_err(|source| AppError::CatalogParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut brands = BTreeMap::new();
        for (brand, entries) in raw {
            let mut colors: Vec<(String, Rgb8)> = Vec::with_capacity(entries.len());
            for entry in entries {
                if colors.iter().any(|(name, _)| *name == entry.name) {
                    tracing::warn!(
                        brand = %brand,
                        name = %entry.name,
                        "duplicate catalog entry ignored"
                    );
                    continue;
                }
                let rgb = parse_catalog_hex(&entry.color).ok_or_else(|| {
                    AppError::BadCatalogColor {
                        brand: brand.clone(),
                        name: entry.name.clone(),
                        color: entry.color.clone(),
                    }
                })?;
                colors.push((entry.name, rgb));
            }
            brands.insert(brand, colors);
        }
        Ok(Self { brands })
    }

    /// Brand names with their color counts, in brand order.
    pub fn brands(&self) -> impl Iterator<Item = (&str, usize)> {
        self.brands.iter().map(|(b, c)| (b.as_str(), c.len()))
    }

    /// Build a palette from the selection, or from every brand when the
    /// selection is `None`.
    ///
    /// Selection semantics: each selected brand contributes either its
    /// whole color list (empty name list) or the named colors in catalog
    /// order.
    pub fn to_palette(&self, selection: Option<&PaletteSelection>) -> Result<Palette, AppError> {
        let mut colors: Vec<(PaletteId, Rgb8)> = Vec::new();

        match selection {
            None => {
                for (brand, entries) in &self.brands {
                    for (name, rgb) in entries {
                        colors.push((PaletteId::new(brand, name), *rgb));
                    }
                }
            }
            Some(selection) => {
                for (brand, names) in selection {
                    let entries = self
                        .brands
                        .get(brand)
                        .ok_or_else(|| AppError::UnknownBrand(brand.clone()))?;
                    if names.is_empty() {
                        for (name, rgb) in entries {
                            colors.push((PaletteId::new(brand, name), *rgb));
                        }
                    } else {
                        for name in names {
                            let rgb = entries
                                .iter()
                                .find(|(n, _)| n == name)
                                .map(|(_, rgb)| *rgb)
                                .ok_or_else(|| AppError::UnknownColor {
                                    brand: brand.clone(),
                                    name: name.clone(),
                                })?;
                            colors.push((PaletteId::new(brand, name), rgb));
                        }
                    }
                }
            }
        }

        Ok(Palette::new(colors)?)
    }
}

/// Parse the catalog hex format: exactly six uppercase hex digits, no `#`.
/// The convenience `#` prefix is added internally before parsing.
fn parse_catalog_hex(hex: &str) -> Option<Rgb8> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()) {
        return None;
    }
    format!("#{hex}").parse().ok()
}
