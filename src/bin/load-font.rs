use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use fixed_height_font::fhft::{reader::{FontFile, RawChunk}, render};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Subcommand)]
enum CliCommand {
    /// Prints the chunk tree
    View { },
    /// Renders text into C arrays
    Render {
        #[clap(short = 'c', long, conflicts_with = "charfile")]
        /// Text to render
        chars: Option<String>,
        #[clap(short = 'C', long)]
        /// File holding the text to render
        charfile: Option<PathBuf>,
        #[clap(short, long)]
        /// C source output
        output: PathBuf,
        #[clap(long)]
        /// Optional BMP preview
        bmp: Option<PathBuf>,
    },
}

/// Inspects fixed-height font files
#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
    /// Font file
    font: PathBuf,
    #[command(subcommand)]
    command: CliCommand
}

fn main() -> Result<()> {
    let args = Cli::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let font_data = std::fs::read(&args.font)
        .with_context(|| format!("cannot read {}", args.font.display()))?;

    match args.command {
        CliCommand::View{ } => {
            let root = RawChunk::parse(&font_data)?;
            root.dump(&mut std::io::stdout().lock())
        },
        CliCommand::Render{ chars, charfile, output, bmp } => {
            let text = match (chars, charfile) {
                (Some(chars), _) => chars,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => { return Err(anyhow!("either --chars or --charfile is required")); }
            };
            let font = FontFile::parse(&font_data)?;
            let rendered = render::render_text(&font, &text);

            let mut out = BufWriter::new(File::create(&output)
                .with_context(|| format!("cannot create {}", output.display()))?);
            rendered.write_c_source(&mut out)?;
            out.flush()?;
            if let Some(bmp_path) = bmp {
                rendered.save_bmp(&bmp_path, font.height())?;
            }
            Ok(())
        },
    }
}
