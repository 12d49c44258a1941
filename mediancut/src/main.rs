use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use mediancut::{Error, MappingMode, Quantizer};
use rayon::prelude::*;
use tracing::{error, info};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Gif,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Gif => "gif",
        }
    }
}

/// Reduces images to a small palette using median cut.
#[derive(Parser)]
struct Args {
    /// Images to quantize.
    #[clap(required = true)]
    images: Vec<PathBuf>,
    /// Maximum number of colors in the palette (1 to 256).
    #[clap(short, long, default_value_t = 256)]
    colors: usize,
    /// Map every color to its nearest palette entry instead of the box it was split into.
    /// Slower, but gives better results with small palettes.
    #[clap(long)]
    exact: bool,
    /// Output format.
    #[clap(short, long, value_enum, default_value = "png")]
    format: Format,
    /// Directory to write results to. Defaults to the directory of each input image.
    #[clap(short, long)]
    out_dir: Option<PathBuf>,
}

fn output_path(input: &Path, out_dir: Option<&Path>, format: Format) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let file_name = format!("{stem}.quantized.{}", format.extension());
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

fn run(quantizer: &Quantizer, args: &Args, input: &Path) -> Result<(), Error> {
    info!(?input, "quantizing");
    let paletted = quantizer.quantize_file(input).map_err(|e| {
        error!(?input, "{e}");
        e
    })?;

    let output = output_path(input, args.out_dir.as_deref(), args.format);
    match args.format {
        Format::Png => mediancut::encode_png_to_file(&paletted, &output)?,
        Format::Gif => mediancut::encode_gif_to_file(&paletted, &output)?,
    }
    info!(
        ?output,
        colors = paletted.palette().len(),
        "wrote quantized image"
    );

    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    let mode = if args.exact {
        MappingMode::Exact
    } else {
        MappingMode::Fast
    };
    let quantizer = Quantizer::new(args.colors, mode)?;

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)?;
    }

    // Every image gets its own histogram and cube list, so runs are independent.
    args.images
        .par_iter()
        .try_for_each(|input| run(&quantizer, &args, input))
}
