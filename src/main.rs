#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pgs_parser::{decode_all_display_sets_parallel, decode_all_display_sets_with, DecodeOptions};

/// Decode a PGS (*.sup) subtitle stream.
#[derive(Parser)]
#[command(name = "pgs-parser", version)]
struct Cli {
    /// Input *.sup file
    input: PathBuf,

    /// Write one PNG per display set with an image into this directory
    #[arg(long)]
    png_dir: Option<PathBuf>,

    /// Reject out-of-order object parts instead of keeping the latest
    #[arg(long)]
    strict: bool,

    /// Decode display sets on this many threads
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut f = File::open(&cli.input)
        .with_context(|| format!("could not open {}", cli.input.display()))?;
    let mut buffer = Vec::with_capacity(f.metadata()?.len() as usize);
    f.read_to_end(&mut buffer)
        .with_context(|| format!("could not read {}", cli.input.display()))?;

    let mut options = DecodeOptions::default().strict_sequencing(cli.strict);
    let report = match cli.jobs {
        Some(1) => decode_all_display_sets_with(&buffer, &options),
        Some(jobs) => {
            options = options.workers(jobs);
            decode_all_display_sets_parallel(&buffer, &options)
        }
        None => decode_all_display_sets_parallel(&buffer, &options),
    };

    if let Some(dir) = &cli.png_dir {
        fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;
    }

    for (i, set) in report.display_sets.iter().enumerate() {
        println!(
            "{:5} pts={}ms dts={}ms at {},{} {}x{} image={}",
            i,
            set.presentation_time_ms(),
            set.decoding_time_ms(),
            set.x(),
            set.y(),
            set.width(),
            set.height(),
            set.has_image()
        );

        if let (Some(dir), true) = (&cli.png_dir, set.has_image()) {
            let path = dir.join(format!("{:05}.png", i));
            let img = set
                .to_rgba_image()
                .with_context(|| format!("could not decode display set {}", i))?;
            img.save(&path)
                .with_context(|| format!("could not write {}", path.display()))?;
        }
    }

    for failure in &report.failures {
        eprintln!(
            "display set {} at 0x{:x} failed: {}",
            failure.index, failure.offset, failure.error
        );
    }

    Ok(())
}
