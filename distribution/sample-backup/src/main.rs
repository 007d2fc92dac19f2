//! Writes the demo launcher backup to disk
//!
//! Run with: cargo run -p sample-backup -- --output demo-backup.zip

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sample_backup::SampleBackup;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where to write the zip
    #[arg(short, long, default_value = "demo-backup.zip")]
    output: PathBuf,

    /// Leave the preferences file out of the archive
    #[arg(long)]
    no_preferences: bool,

    /// Also write the raw SQLite image next to the zip
    #[arg(long)]
    database: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut backup = SampleBackup::demo();
    if args.no_preferences {
        backup.preferences = None;
    }

    let archive = backup.to_zip().context("building sample backup")?;
    fs::write(&args.output, &archive)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Wrote {} ({} bytes)", args.output.display(), archive.len());

    if args.database {
        let path = args.output.with_extension("db");
        fs::write(&path, backup.database_image()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
