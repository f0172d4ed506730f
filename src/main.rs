use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod error;
mod preview;
mod store;

use bead_pixel::{
    CancelToken, ImageView, PixelCell, PixelGrid, Quantizer, Recognizer, SampleMode,
};
use catalog::{Catalog, PaletteSelection};
use store::{DesignRecord, DesignStore};

#[derive(Parser)]
#[command(name = "beadboard")]
#[command(about = "Beadboard - pixel-art design and board recognition for bead crafts")]
struct Cli {
    /// Catalog file (JSON, brands to colors); built-in set when omitted
    #[arg(long, global = true)]
    palette: Option<PathBuf>,

    /// Design store directory
    #[arg(long, global = true, default_value = "./designs")]
    store_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an image into a bead pattern
    Quantize {
        /// Source image (png, jpeg, webp, bmp)
        image: PathBuf,

        /// Pattern width in cells
        #[arg(short = 'W', long, default_value_t = 32)]
        width: usize,

        /// Pattern height in cells
        #[arg(short = 'H', long, default_value_t = 32)]
        height: usize,

        /// Block sampling mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::Dominant)]
        mode: ModeArg,

        /// Disable 15% block edge trimming
        #[arg(long)]
        no_edge_trim: bool,

        /// Restrict the palette to these brands (repeatable)
        #[arg(short, long)]
        brand: Vec<String>,

        /// Write a PNG preview here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preview cell size in pixels
        #[arg(long, default_value_t = 16)]
        cell_size: u32,

        /// Persist the pattern to the design store
        #[arg(long)]
        save: bool,
    },

    /// Recognize a photographed bead board
    Recognize {
        /// Board photograph (roughly frontal)
        photo: PathBuf,

        /// Restrict the palette to these brands (repeatable)
        #[arg(short, long)]
        brand: Vec<String>,

        /// Write a PNG preview here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preview cell size in pixels
        #[arg(long, default_value_t = 16)]
        cell_size: u32,

        /// Persist the recognized pattern to the design store
        #[arg(long)]
        save: bool,
    },

    /// List catalog brands and color counts
    Palettes,

    /// Manage saved designs
    Designs {
        #[command(subcommand)]
        command: DesignsCommand,
    },
}

#[derive(Subcommand)]
enum DesignsCommand {
    /// List saved designs, newest first
    List,
    /// Show one design's summary and color usage
    Show { id: String },
    /// Delete a design
    Delete { id: String },
}

/// CLI surface of [`SampleMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Dominant,
    Average,
    Center,
    Diagonal,
    Original,
}

impl ModeArg {
    fn as_sample_mode(self) -> SampleMode {
        match self {
            ModeArg::Dominant => SampleMode::Dominant,
            ModeArg::Average => SampleMode::Average,
            ModeArg::Center => SampleMode::Center,
            ModeArg::Diagonal => SampleMode::Diagonal45,
            ModeArg::Original => SampleMode::Original,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ModeArg::Dominant => "dominant",
            ModeArg::Average => "average",
            ModeArg::Center => "center",
            ModeArg::Diagonal => "diagonal",
            ModeArg::Original => "original",
        }
    }
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beadboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let cli = Cli::parse();
    let catalog = load_catalog(cli.palette.as_deref())?;

    match cli.command {
        Commands::Quantize {
            image,
            width,
            height,
            mode,
            no_edge_trim,
            brand,
            output,
            cell_size,
            save,
        } => run_quantize(
            &catalog,
            &cli.store_dir,
            &image,
            height,
            width,
            mode,
            !no_edge_trim,
            &brand,
            output.as_deref(),
            cell_size,
            save,
        ),
        Commands::Recognize {
            photo,
            brand,
            output,
            cell_size,
            save,
        } => run_recognize(
            &catalog,
            &cli.store_dir,
            &photo,
            &brand,
            output.as_deref(),
            cell_size,
            save,
        ),
        Commands::Palettes => {
            run_palettes(&catalog);
            Ok(())
        }
        Commands::Designs { command } => run_designs(&cli.store_dir, command),
    }
}

fn load_catalog(path: Option<&std::path::Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(p) => Ok(Catalog::load(p)?),
        None => Ok(Catalog::builtin()),
    }
}

fn brand_selection(brands: &[String]) -> Option<PaletteSelection> {
    if brands.is_empty() {
        return None;
    }
    Some(
        brands
            .iter()
            .map(|b| (b.clone(), Vec::new()))
            .collect::<PaletteSelection>(),
    )
}

#[allow(clippy::too_many_arguments)]
fn run_quantize(
    catalog: &Catalog,
    store_dir: &std::path::Path,
    image_path: &std::path::Path,
    rows: usize,
    cols: usize,
    mode: ModeArg,
    edge_trim: bool,
    brands: &[String],
    output: Option<&std::path::Path>,
    cell_size: u32,
    save: bool,
) -> anyhow::Result<()> {
    let selection = brand_selection(brands);
    let palette = catalog.to_palette(selection.as_ref())?;
    tracing::info!(colors = palette.len(), "palette loaded");

    let decoded = image::open(image_path)?.to_rgba8();
    let (iw, ih) = decoded.dimensions();
    let img = ImageView::new(decoded.as_raw(), iw as usize, ih as usize)
        .map_err(bead_pixel::QuantizeError::InvalidImage)
        .map_err(error::AppError::Quantize)?;
    tracing::info!(width = iw, height = ih, "image decoded");

    let grid = Quantizer::new()
        .mode(mode.as_sample_mode())
        .edge_trim(edge_trim)
        .quantize(&img, rows, cols, &palette)
        .map_err(error::AppError::Quantize)?;

    print_grid_summary(&grid);
    finish_grid(
        grid,
        store_dir,
        output,
        cell_size,
        mode.as_str(),
        edge_trim,
        selection.unwrap_or_default(),
        save,
    )
}

fn run_recognize(
    catalog: &Catalog,
    store_dir: &std::path::Path,
    photo_path: &std::path::Path,
    brands: &[String],
    output: Option<&std::path::Path>,
    cell_size: u32,
    save: bool,
) -> anyhow::Result<()> {
    let selection = brand_selection(brands);
    let palette = catalog.to_palette(selection.as_ref())?;
    tracing::info!(colors = palette.len(), "palette loaded");

    let decoded = image::open(photo_path)?.to_rgba8();
    let (iw, ih) = decoded.dimensions();
    tracing::info!(width = iw, height = ih, "photo decoded");

    let cancel = CancelToken::new();
    let result = Recognizer::new()
        .recognize(
            decoded.as_raw(),
            iw as usize,
            ih as usize,
            &palette,
            |phase, fraction| {
                eprint!("\r{phase:<8} {:>3.0}%", fraction * 100.0);
                let _ = std::io::stderr().flush();
            },
            &cancel,
        )
        .map_err(error::AppError::Recognize)?;
    eprintln!();

    tracing::info!(
        rows = result.model.rows,
        cols = result.model.cols,
        pitch = result.model.pitch_x,
        confidence = result.model.confidence,
        "grid detected"
    );

    print_grid_summary(&result.grid);
    finish_grid(
        result.grid,
        store_dir,
        output,
        cell_size,
        "recognized",
        false,
        selection.unwrap_or_default(),
        save,
    )
}

#[allow(clippy::too_many_arguments)]
fn finish_grid(
    grid: PixelGrid,
    store_dir: &std::path::Path,
    output: Option<&std::path::Path>,
    cell_size: u32,
    mode: &str,
    edge_trim: bool,
    selection: PaletteSelection,
    save: bool,
) -> anyhow::Result<()> {
    if let Some(path) = output {
        let img = preview::render_preview(&grid, cell_size, true);
        img.save(path)?;
        println!("Preview written to {}", path.display());
    }

    if save {
        let store = DesignStore::open(store_dir)?;
        let record = DesignRecord::from_grid(&grid, cell_size, mode, edge_trim, selection);
        let saved = store.save(record)?;
        println!("Design saved as {}", saved.id);
    }

    Ok(())
}

fn print_grid_summary(grid: &PixelGrid) {
    println!(
        "{}x{} pattern, {} beads",
        grid.rows(),
        grid.cols(),
        grid.bead_count()
    );

    // Per-color usage, most used first
    let mut usage: Vec<(String, usize)> = Vec::new();
    for (_, _, cell) in grid.cells() {
        if let PixelCell::Bead { id, .. } = cell {
            let key = id.to_string();
            match usage.iter_mut().find(|(k, _)| *k == key) {
                Some((_, n)) => *n += 1,
                None => usage.push((key, 1)),
            }
        }
    }
    usage.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (color, count) in usage {
        println!("  {count:>5}  {color}");
    }
}

fn run_palettes(catalog: &Catalog) {
    println!("Brands:");
    for (brand, count) in catalog.brands() {
        println!("  {brand}  ({count} colors)");
    }
}

fn run_designs(store_dir: &std::path::Path, command: DesignsCommand) -> anyhow::Result<()> {
    let store = DesignStore::open(store_dir)?;
    match command {
        DesignsCommand::List => {
            let records = store.list()?;
            if records.is_empty() {
                println!("No saved designs.");
                return Ok(());
            }
            for r in records {
                let beads = r.cells.iter().filter(|c| c.is_some()).count();
                println!(
                    "{}  {:>3}x{:<3}  {:>5} beads  mode={}  updated={}",
                    r.id, r.rows, r.cols, beads, r.mode, r.updated_at
                );
            }
            Ok(())
        }
        DesignsCommand::Show { id } => {
            let record = store.load(&id)?;
            let grid = record.to_grid();
            println!("Design {}", record.id);
            println!(
                "  size: {}x{}  cell: {}px  mode: {}  edge_trim: {}",
                record.rows, record.cols, record.cell_size, record.mode, record.edge_trim
            );
            println!(
                "  created: {}  updated: {}",
                record.created_at, record.updated_at
            );
            print_grid_summary(&grid);
            Ok(())
        }
        DesignsCommand::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted {id}");
            Ok(())
        }
    }
}
