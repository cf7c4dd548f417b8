use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dicom_seg::{DecodeOptions, SegLoader, enums::Processor};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dicom-seg")]
#[command(about = "Decode a DICOM segmentation into a label volume")]
struct Cli {
    /// Segmentation file
    input: PathBuf,

    /// Write slices on a single thread
    #[arg(long)]
    serial: bool,

    /// Directory to write every axial slice to as PNG
    #[arg(long)]
    png: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let options = DecodeOptions {
        processor: if cli.serial {
            Processor::Serial
        } else {
            Processor::Parallel
        },
    };

    let decoded = SegLoader::load_from_file(&cli.input, options)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;
    if !decoded.warnings.is_empty() {
        warn!("Decoded with {} warnings", decoded.warnings.len());
    }

    let volume = decoded.volume;
    let (slices, rows, columns) = volume.dim();
    info!(
        "{} segments, {slices} slices of {columns}x{rows}, spacing {:?}, orientation {}",
        volume.metadata().segments.len(),
        volume.geometry().spacing,
        volume.geometry().orientation.orientation_code()
    );

    if let Some(dir) = cli.png {
        std::fs::create_dir_all(&dir)?;
        for index in 0..slices {
            let path = dir.join(format!("slice_{index:04}.png"));
            if volume.is_rgb() {
                if let Some(image) = volume.get_rgb_image(index) {
                    image.save(&path)?;
                }
            } else if let Some(image) = volume.get_gray_image(index) {
                image.save(&path)?;
            }
        }
        info!("Wrote {slices} slices to {}", dir.display());
    }

    Ok(())
}
