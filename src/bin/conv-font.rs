use anyhow::{Context, Result};
use clap::Parser;
use fixed_height_font::conv::{extract, ttf::TtfSource};
use std::path::PathBuf;

/// Converts a bitmap OpenType font into a fixed-height font file
#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
    /// Font with EBLC/EBDT bitmap strikes
    font: PathBuf,
    #[clap(short, long)]
    /// Output file (default: input with .fhft extension)
    output: Option<PathBuf>,
    #[clap(long)]
    /// Name to store instead of the font's full name
    name: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let font_data = std::fs::read(&args.font)
        .with_context(|| format!("cannot read {}", args.font.display()))?;
    let mut source = TtfSource::new(&font_data)?;
    if let Some(name) = &args.name {
        source = source.with_name(name);
    }

    let out_path = args.output.clone().unwrap_or_else(|| args.font.with_extension("fhft"));
    let font = extract::convert_to_file(&source, &out_path)?;
    log::info!("'{}': {} characters, {} shapes, height {}",
        font.metadata.name, font.cmap.len(), font.glyphs.shapes.len(), font.glyphs.metadata.height);
    Ok(())
}
