//! Palette struct with precomputed Lab values and nearest-color matching.

use std::fmt;
use std::str::FromStr;

use super::error::PaletteError;
use crate::color::{Lab, Rgb8};

/// Identity of a palette entry: bead brand plus color name.
///
/// Uniqueness is enforced per palette. Two entries of different brands may
/// share a color name, and two entries may share the same RGB value (brands
/// sell near-identical colors); only the `(brand, name)` pair must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaletteId {
    /// Bead brand, e.g. "Hama"
    pub brand: String,
    /// Color name within the brand, e.g. "Pastel Blue"
    pub name: String,
}

impl PaletteId {
    /// Create a new id from brand and color name.
    pub fn new(brand: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PaletteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.brand, self.name)
    }
}

/// One palette color: identity, sRGB value, and the Lab value derived from
/// it at construction time.
///
/// The Lab value is cached because palette colors never change and matching
/// runs once per grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    /// Unique `(brand, name)` identity
    pub id: PaletteId,
    /// The sRGB color of the bead
    pub rgb: Rgb8,
    /// Lab value of `rgb`, precomputed
    pub lab: Lab,
}

impl PaletteEntry {
    /// Create an entry, deriving the cached Lab value from `rgb`.
    pub fn new(id: PaletteId, rgb: Rgb8) -> Self {
        let lab = Lab::from(rgb);
        Self { id, rgb, lab }
    }
}

/// An ordered set of palette entries with unique ids.
///
/// Entry order matters: nearest-color ties are broken in favor of the
/// earlier entry, so matching is fully deterministic for a given palette.
///
/// # Example
///
/// ```
/// use bead_pixel::{Lab, Palette, PaletteId, Rgb8};
///
/// let palette = Palette::new(vec![
///     (PaletteId::new("Hama", "Red"), Rgb8::new(255, 0, 0)),
///     (PaletteId::new("Hama", "Blue"), Rgb8::new(0, 0, 255)),
/// ]).unwrap();
///
/// let (entry, delta_e) = palette.nearest(Lab::from(Rgb8::new(250, 10, 10))).unwrap();
/// assert_eq!(entry.id.name, "Red");
/// assert!(delta_e < 5.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Build a palette from `(id, rgb)` pairs, in order.
    ///
    /// An empty palette is representable (selection filters can produce one);
    /// queries against it fail with [`PaletteError::EmptyPalette`].
    ///
    /// # Errors
    ///
    /// [`PaletteError::DuplicateId`] if two entries share a `(brand, name)`.
    pub fn new(colors: impl IntoIterator<Item = (PaletteId, Rgb8)>) -> Result<Self, PaletteError> {
        let mut entries: Vec<PaletteEntry> = Vec::new();
        for (id, rgb) in colors {
            if entries.iter().any(|e| e.id == id) {
                return Err(PaletteError::DuplicateId {
                    brand: id.brand,
                    name: id.name,
                });
            }
            entries.push(PaletteEntry::new(id, rgb));
        }
        Ok(Self { entries })
    }

    /// Build a palette from `(brand, name, hex)` triples.
    ///
    /// # Errors
    ///
    /// [`PaletteError::ParseColor`] for malformed hex strings,
    /// [`PaletteError::DuplicateId`] for repeated identities.
    pub fn from_hex<'a>(
        colors: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Result<Self, PaletteError> {
        let parsed = colors
            .into_iter()
            .map(|(brand, name, hex)| {
                let rgb = Rgb8::from_str(hex).map_err(PaletteError::ParseColor)?;
                Ok((PaletteId::new(brand, name), rgb))
            })
            .collect::<Result<Vec<_>, PaletteError>>()?;
        Palette::new(parsed)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the palette has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    #[inline]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Look up an entry by identity.
    pub fn get(&self, id: &PaletteId) -> Option<&PaletteEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Find the entry nearest to `lab` by CIEDE2000, with its distance.
    ///
    /// Linear scan; palettes are tens of entries, not thousands. Ties are
    /// broken by insertion order (strict `<` keeps the earlier entry).
    ///
    /// # Errors
    ///
    /// [`PaletteError::EmptyPalette`] if there are no entries.
    pub fn nearest(&self, lab: Lab) -> Result<(&PaletteEntry, f32), PaletteError> {
        let mut best: Option<(&PaletteEntry, f32)> = None;
        for entry in &self.entries {
            let de = lab.delta_e_2000(entry.lab);
            match best {
                Some((_, best_de)) if de >= best_de => {}
                _ => best = Some((entry, de)),
            }
        }
        best.ok_or(PaletteError::EmptyPalette)
    }
}

/// Map a CIEDE2000 match distance to a reported confidence in `[0, 1]`.
///
/// Distances below 2.0 are perceptually exact and report full confidence;
/// beyond that confidence falls off linearly and reaches zero at 17.0.
#[inline]
pub fn match_confidence(delta_e: f32) -> f32 {
    if delta_e < 2.0 {
        1.0
    } else {
        (1.0 - (delta_e - 2.0) / 15.0).max(0.0)
    }
}
