use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use histenhance_core::{enhance, EnhancementParams, Histogram, Image, Method, TileGrid};
use log::LevelFilter;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

mod imageio;

use imageio::{is_image_file, load_image, save_image};

#[derive(Parser)]
#[command(
    name = "histenhance",
    about = "Enhance images with equalization, CLAHE, gamma correction, contrast adjustment or histogram matching"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance a single image
    Single {
        /// Input image path
        input: PathBuf,

        /// Output image path (default: results/<input file name>)
        output: Option<PathBuf>,

        #[command(flatten)]
        enhance: EnhanceArgs,
    },

    /// Enhance all images in a directory
    Batch {
        /// Input directory
        input_dir: PathBuf,

        /// Output directory (default: input_dir/enhanced)
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        enhance: EnhanceArgs,

        /// Number of parallel jobs (default: num_cpus)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Reprocess even if output is up-to-date
        #[arg(long)]
        force: bool,
    },

    /// Print per-channel histogram statistics
    Histogram {
        /// Input image path
        input: PathBuf,

        /// Also print the 256 bin counts
        #[arg(long)]
        bins: bool,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone)]
struct EnhanceArgs {
    /// Enhancement method: equalize, clahe, gamma, contrast, match
    #[arg(long, default_value = "equalize", value_parser = parse_method)]
    method: Method,

    /// CLAHE clip limit, as a multiple of the average bin height per tile
    #[arg(long, default_value_t = 2.0)]
    clip_limit: f64,

    /// CLAHE tile grid as ROWS,COLS
    #[arg(long, default_value = "8,8", value_parser = parse_tile_grid)]
    tile_grid: TileGrid,

    /// Gamma value for gamma correction
    #[arg(long, default_value_t = 1.0)]
    gamma: f64,

    /// Contrast gain for contrast adjustment
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    alpha: f64,

    /// Brightness offset for contrast adjustment
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    beta: f64,

    /// Reference image for histogram matching
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Only transform these channels, e.g. "0,2" (equalize, clahe, gamma)
    #[arg(long, value_parser = parse_channels)]
    channels: Option<Vec<usize>>,
}

impl EnhanceArgs {
    /// Build core parameters, loading the reference image when matching.
    fn to_params(&self) -> Result<EnhancementParams> {
        let params = EnhancementParams {
            method: self.method,
            clip_limit: self.clip_limit,
            tile_grid: self.tile_grid,
            gamma: self.gamma,
            alpha: self.alpha,
            beta: self.beta,
            reference: None,
            channels: self.channels.clone(),
        };

        match (self.method, &self.reference) {
            (Method::Match, None) => {
                bail!("When selecting --method match, you must provide --reference")
            }
            (Method::Match, Some(path)) => Ok(params.with_reference(load_image(path)?)),
            (_, Some(_)) => {
                log::warn!("--reference is only used with --method match; ignoring it");
                Ok(params)
            }
            (_, None) => Ok(params),
        }
    }
}

fn parse_method(s: &str) -> Result<Method, String> {
    s.parse::<Method>().map_err(|e| e.to_string())
}

fn parse_tile_grid(s: &str) -> Result<TileGrid, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!("expected ROWS,COLS (e.g. '8,8'), got '{}'", s));
    }
    let rows = parts[0]
        .parse::<usize>()
        .map_err(|_| format!("invalid tile rows '{}'", parts[0]))?;
    let cols = parts[1]
        .parse::<usize>()
        .map_err(|_| format!("invalid tile cols '{}'", parts[1]))?;
    Ok(TileGrid::new(rows, cols))
}

fn parse_channels(s: &str) -> Result<Vec<usize>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<usize>().map_err(|_| format!("invalid channel index '{}'", p)))
        .collect()
}

fn default_output_path(input: &Path) -> PathBuf {
    let name = input.file_name().unwrap_or_else(|| input.as_os_str());
    PathBuf::from("results").join(name)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn cmd_single(input: &Path, output: Option<&Path>, args: &EnhanceArgs) -> Result<()> {
    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(input));

    let params = args.to_params()?;

    eprintln!(
        "Processing: {} -> {}",
        input.display(),
        output_path.display()
    );
    eprintln!("Method: {}", params.method);

    let img = load_image(input)?;
    let result = enhance(&img, &params).with_context(|| format!("{}", input.display()))?;
    save_image(&result, &output_path)?;
    eprintln!("Processed image saved at: {}", output_path.display());
    Ok(())
}

/// True when `output` exists and is newer than `input`.
fn is_up_to_date(input: &Path, output: &Path) -> bool {
    let (Ok(in_meta), Ok(out_meta)) = (input.metadata(), output.metadata()) else {
        return false;
    };
    match (in_meta.modified(), out_meta.modified()) {
        (Ok(in_time), Ok(out_time)) => out_time > in_time,
        _ => false,
    }
}

fn cmd_batch(
    input_dir: &Path,
    output_dir: &Path,
    args: &EnhanceArgs,
    jobs: Option<usize>,
    force: bool,
) -> Result<()> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read directory {}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    images.sort();

    if images.is_empty() {
        eprintln!("No source images found in {}", input_dir.display());
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;

    // Reference is decoded once and shared by every job
    let params = args.to_params()?;

    if let Some(n) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok();
    }

    let pending: Vec<(PathBuf, PathBuf)> = images
        .iter()
        .filter_map(|input| {
            let output = output_dir.join(input.file_name()?);
            if !force && is_up_to_date(input, &output) {
                return None;
            }
            Some((input.clone(), output))
        })
        .collect();
    let skipped = images.len() - pending.len();

    eprintln!(
        "Found {} source images, {} to process, skipping {} up-to-date",
        images.len(),
        pending.len(),
        skipped
    );

    let errors: Vec<String> = pending
        .par_iter()
        .filter_map(|(input, output)| {
            let run = || -> Result<()> {
                let img = load_image(input)?;
                let result = enhance(&img, &params)?;
                save_image(&result, output)
            };
            match run() {
                Ok(()) => {
                    eprintln!("  Done: {}", output.display());
                    None
                }
                Err(e) => {
                    let msg = format!("{}: {:#}", input.display(), e);
                    eprintln!("  Error: {}", msg);
                    Some(msg)
                }
            }
        })
        .collect();

    eprintln!(
        "\nDone! Processed: {}, Skipped: {}, Errors: {}",
        pending.len() - errors.len(),
        skipped,
        errors.len()
    );
    for e in &errors {
        eprintln!("  {}", e);
    }

    Ok(())
}

fn channel_report(channel: usize, hist: &Histogram, bins: bool) -> serde_json::Value {
    let mut report = serde_json::json!({
        "channel": channel,
        "pixels": hist.total(),
        "min": hist.min(),
        "max": hist.max(),
        "mean": hist.mean(),
    });
    if bins {
        report["bins"] = serde_json::json!(hist.counts().to_vec());
    }
    report
}

fn cmd_histogram(input: &Path, bins: bool, json: bool) -> Result<()> {
    let img: Image = load_image(input)?;
    let hists = img.histograms();

    if json {
        let channels: Vec<_> = hists
            .iter()
            .enumerate()
            .map(|(c, h)| channel_report(c, h, bins))
            .collect();
        let report = serde_json::json!({
            "file": input.display().to_string(),
            "width": img.width(),
            "height": img.height(),
            "channels": channels,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}: {}x{}, {} channel(s)",
        input.display(),
        img.width(),
        img.height(),
        img.channels()
    );
    for (c, hist) in hists.iter().enumerate() {
        println!(
            "channel {}: pixels={} min={} max={} mean={:.2}",
            c,
            hist.total(),
            hist.min().unwrap_or(0),
            hist.max().unwrap_or(0),
            hist.mean().unwrap_or(0.0)
        );
        if bins {
            for (i, row) in hist.counts().chunks(16).enumerate() {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("  {:3}: {}", i * 16, line.join(" "));
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Single {
            input,
            output,
            enhance,
        } => {
            cmd_single(&input, output.as_deref(), &enhance)?;
        }

        Commands::Batch {
            input_dir,
            output_dir,
            enhance,
            jobs,
            force,
        } => {
            let output = output_dir.unwrap_or_else(|| input_dir.join("enhanced"));
            cmd_batch(&input_dir, &output, &enhance, jobs, force)?;
        }

        Commands::Histogram { input, bins, json } => {
            cmd_histogram(&input, bins, json)?;
        }
    }

    Ok(())
}
