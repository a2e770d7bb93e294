use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use micr_core::config::Config;
use micr_core::request::{Facade, ImageBuffer, ScanImage, ScanRequest};
use micr_core::{assets, logging, raster};

#[derive(Parser, Debug)]
#[command(version, about = "Locates and reads the MICR line on a cheque image.")]
struct Args {
    /// Image to scan
    image: PathBuf,
    /// Reference glyph sheet (binary, glyphs left-to-right)
    #[arg(long)]
    glyph_sheet: PathBuf,
    /// Comma-separated glyph descriptors matching the sheet's layout,
    /// e.g. "1,2,3,4,5,6,7,8,9,0,T:3,U:3,A:3,D:3"
    #[arg(long, default_value = "1,2,3,4,5,6,7,8,9,0,T:3,U:3,A:3,D:3")]
    glyph_descriptors: String,
    /// Optional TOML config file overlaying the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init(&config.log_level);

    let sheet_bytes =
        fs::read(&args.glyph_sheet).with_context(|| format!("could not read glyph sheet {}", args.glyph_sheet.display()))?;
    let sheet_mat = opencv::imgcodecs::imdecode(
        &opencv::core::Vector::from_slice(&sheet_bytes),
        opencv::imgcodecs::IMREAD_GRAYSCALE,
    )
    .with_context(|| format!("could not decode glyph sheet {}", args.glyph_sheet.display()))?;
    let sheet = raster::Raster::new(sheet_mat, raster::Polarity::ForegroundDark);

    let descriptors: Vec<assets::GlyphDescriptor> = args
        .glyph_descriptors
        .split(',')
        .map(assets::GlyphDescriptor::parse)
        .collect();
    let glyphs = assets::GlyphSet::load(&sheet, &descriptors).context("failed to load reference glyph set")?;

    let facade = Facade::new(glyphs, config);

    let image_bytes =
        fs::read(&args.image).with_context(|| format!("could not read image {}", args.image.display()))?;
    let request = ScanRequest {
        image: ScanImage {
            buffer: ImageBuffer::Raw(image_bytes),
        },
        crop: None,
    };

    let response = facade.scan(request).await.context("scan failed")?;

    println!("overlap corrected: {}", response.overlap);
    match response.micr_rect {
        Some(rect) => println!("MICR rectangle: x={} y={} w={} h={}", rect.x, rect.y, rect.width, rect.height),
        None => println!("no MICR line detected"),
    }
    for (name, output) in response.translators {
        println!(
            "[{name}] routing={} account={} check={} line={}",
            output.result.routing_number, output.result.account_number, output.result.check_number, output.result.micr_line
        );
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(p) => Config::from_toml_file(p).with_context(|| format!("could not read config {}", p.display()))?,
        None => Config::default(),
    };
    Ok(config.apply_env()?)
}
