//! File-backed design store
//!
//! Each saved design is one JSON file in the store directory, named by an
//! opaque hex id. A record snapshots the pixel grid plus the parameters it
//! was built with, so a design can be re-rendered or re-quantized later.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use bead_pixel::{PaletteId, PixelCell, PixelGrid, Rgb8};

use crate::catalog::PaletteSelection;
use crate::error::AppError;

/// One grid cell in a persisted record; `None` is an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub brand: String,
    pub name: String,
    pub confidence: f32,
}

/// A persisted design: grid snapshot plus construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRecord {
    /// Opaque store id (12 hex chars)
    pub id: String,
    pub rows: usize,
    pub cols: usize,
    /// Cell edge length for rendering, in pixels
    pub cell_size: u32,
    /// Sampling mode name the grid was quantized with
    pub mode: String,
    pub edge_trim: bool,
    /// The palette selection the design is restricted to
    pub palette_selection: PaletteSelection,
    pub show_text: bool,
    pub show_reference_lines: bool,
    /// Milliseconds since epoch
    pub created_at: i64,
    /// Milliseconds since epoch
    pub updated_at: i64,
    /// Row-major cells; `None` is empty
    pub cells: Vec<Option<CellRecord>>,
}

impl DesignRecord {
    /// Snapshot a grid with its construction parameters. Timestamps are
    /// set to now; the id is assigned by [`DesignStore::save`].
    pub fn from_grid(
        grid: &PixelGrid,
        cell_size: u32,
        mode: &str,
        edge_trim: bool,
        palette_selection: PaletteSelection,
    ) -> Self {
        let cells = grid
            .cells()
            .map(|(_, _, cell)| match cell {
                PixelCell::Empty => None,
                PixelCell::Bead {
                    rgb,
                    id,
                    confidence,
                } => Some(CellRecord {
                    r: rgb.r,
                    g: rgb.g,
                    b: rgb.b,
                    brand: id.brand.clone(),
                    name: id.name.clone(),
                    confidence: *confidence,
                }),
            })
            .collect();

        let now = Utc::now().timestamp_millis();
        Self {
            id: String::new(),
            rows: grid.rows(),
            cols: grid.cols(),
            cell_size,
            mode: mode.to_string(),
            edge_trim,
            palette_selection,
            show_text: false,
            show_reference_lines: true,
            created_at: now,
            updated_at: now,
            cells,
        }
    }

    /// Rebuild the pixel grid from the snapshot.
    pub fn to_grid(&self) -> PixelGrid {
        let mut grid = PixelGrid::new(self.rows.max(1), self.cols.max(1));
        for (i, cell) in self.cells.iter().enumerate() {
            let (row, col) = (i / self.cols.max(1), i % self.cols.max(1));
            if row >= grid.rows() {
                break;
            }
            if let Some(c) = cell {
                grid.set(
                    row,
                    col,
                    PixelCell::Bead {
                        rgb: Rgb8::new(c.r, c.g, c.b),
                        id: PaletteId::new(c.brand.clone(), c.name.clone()),
                        confidence: c.confidence,
                    },
                );
            }
        }
        grid
    }
}

/// Directory-of-JSON-files design store.
#[derive(Debug, Clone)]
pub struct DesignStore {
    dir: PathBuf,
}

impl DesignStore {
    /// Open (and create if needed) a store at `dir`.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Persist a record. A record without an id gets a fresh one; an
    /// existing id overwrites its file with `updated_at` refreshed and
    /// `created_at` preserved from the stored copy.
    pub fn save(&self, mut record: DesignRecord) -> Result<DesignRecord, AppError> {
        if record.id.is_empty() {
            record.id = new_id();
        } else if let Ok(existing) = self.load(&record.id) {
            record.created_at = existing.created_at;
        }
        record.updated_at = Utc::now().timestamp_millis();

        let path = self.record_path(&record.id);
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)?;
        tracing::debug!(id = %record.id, path = %path.display(), "design saved");
        Ok(record)
    }

    /// Load a record by id.
    pub fn load(&self, id: &str) -> Result<DesignRecord, AppError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(AppError::DesignNotFound(id.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|source| AppError::CorruptRecord { path, source })
    }

    /// All records, newest `updated_at` first. Corrupt files fail the
    /// listing rather than being silently dropped.
    pub fn list(&self) -> Result<Vec<DesignRecord>, AppError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            let record: DesignRecord = serde_json::from_str(&text)
                .map_err(|source| AppError::CorruptRecord { path, source })?;
            records.push(record);
        }
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Delete a record by id.
    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(AppError::DesignNotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

/// A fresh opaque id: 12 hex chars from a random u64.
fn new_id() -> String {
    let n: u64 = rand::thread_rng().gen();
    format!("{:012x}", n & 0xFFFF_FFFF_FFFF)
}
