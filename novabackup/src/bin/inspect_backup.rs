//! Inspect a launcher backup from the command line
//!
//! Prints the page list and an ASCII picture of one screen, or the whole
//! resolved layout as JSON.
//!
//! Run with: cargo run --bin inspect-backup -- backup.zip --screen 2

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use novabackup::grid::{self, GridPlacement, GridUnit};
use novabackup::{BackupSource, LoadError, LoaderConfig, Session};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backup zip to read
    path: PathBuf,

    /// Print the resolved layout and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Loader configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the fallback grid rows
    #[arg(long)]
    rows: Option<usize>,

    /// Override the fallback grid columns
    #[arg(long)]
    cols: Option<usize>,

    /// Override the fallback dock width
    #[arg(long)]
    dock_cols: Option<usize>,

    /// Screen id to draw (defaults to the backup's default page)
    #[arg(short, long)]
    screen: Option<i64>,
}

struct FileSource(PathBuf);

#[async_trait]
impl BackupSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(&self.0)
            .await
            .map_err(|e| LoadError::Source(format!("{}: {}", self.0.display(), e)))
    }
}

fn load_config(args: &Args) -> Result<LoaderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            LoaderConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => LoaderConfig::default(),
    };
    if let Some(rows) = args.rows {
        config.fallback_rows = rows;
    }
    if let Some(cols) = args.cols {
        config.fallback_cols = cols;
    }
    if let Some(dock_cols) = args.dock_cols {
        config.fallback_dock_cols = dock_cols;
    }
    Ok(config)
}

fn cell_label(unit: &GridUnit) -> String {
    match unit {
        GridUnit::Empty => ".".to_string(),
        GridUnit::Item(view) => {
            let title = view.title.as_deref().unwrap_or("?");
            let mut label: String = title.chars().take(10).collect();
            if !view.folder.is_empty() {
                label = format!("[{}]", label);
            }
            if view.span_x > 1 || view.span_y > 1 {
                label = format!("{} {}x{}", label, view.span_x, view.span_y);
            }
            label
        }
    }
}

fn print_grid(name: &str, placement: &GridPlacement) {
    println!("{} ({} x {})", name, placement.rows, placement.cols);
    for unit in &placement.units {
        println!("  {}", cell_label(unit));
        if let GridUnit::Item(view) = unit {
            for child in &view.folder {
                println!("    - {}", child.title.as_deref().unwrap_or("?"));
            }
        }
    }
    for diagnostic in &placement.diagnostics {
        println!("  ! {:?}", diagnostic);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let session = Session::new(load_config(&args)?);
    let layout = match session.load_from(&FileSource(args.path.clone())).await {
        Ok(layout) => layout,
        Err(e) => bail!("{}: {}", e.user_message(), e),
    };
    let diagnostics = session.diagnostics();

    let screen_id = args.screen.unwrap_or_else(|| layout.default_screen());
    let Some(render) = grid::render_screen(&layout, screen_id) else {
        bail!("backup has no screen {}", screen_id);
    };

    if args.json {
        let output = serde_json::json!({
            "layout": &*layout,
            "navigation": layout.navigation(),
            "screen": render,
            "diagnostics": diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let settings = layout.settings;
    println!(
        "Grid {} x {}, dock {}, {} favorites, {} apps",
        settings.rows,
        settings.cols,
        settings.dock_cols,
        layout.favorites().len(),
        layout.apps().len()
    );
    for page in layout.navigation() {
        let marker = if page.screen_id == screen_id { "*" } else { " " };
        println!("{} page {} (screen {})", marker, page.page_number, page.screen_id);
    }
    println!();
    print_grid("Desktop", &render.desktop);
    print_grid("Dock", &render.hotseat);

    if !diagnostics.is_empty() {
        println!();
        println!("{} load diagnostics", diagnostics.len());
        for diagnostic in &diagnostics {
            println!("  {:?}", diagnostic);
        }
    }
    Ok(())
}
