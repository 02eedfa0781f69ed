use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use pixgen_client::{GenerationClient, GenerationRequest, Prompt};
use pixgen_matte::{remove_backgrounds, NearBlack};

mod catalog;
mod config;
mod driver;

use catalog::Catalog;
use config::Config;

#[derive(Parser)]
#[command(name = "pixgen", about = "Pixel-art asset generation and background removal")]
struct Cli {
    /// Settings file (optional; defaults apply when it is missing)
    #[arg(long, global = true, default_value = "pixgen.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single image
    Generate(GenerateArgs),
    /// Generate every asset listed in a catalog file
    Batch {
        /// Path to the catalog TOML file
        catalog: PathBuf,
        /// Remove backgrounds once all assets are generated
        #[arg(long)]
        strip: bool,
    },
    /// Make border-connected near-black backgrounds transparent
    Strip {
        /// Directories of PNG files (default: the ones in the settings file)
        dirs: Vec<PathBuf>,
        /// R, G and B must all be below this to count as background
        #[arg(long)]
        threshold: Option<u8>,
        /// File-name fragment to leave untouched (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Text prompt or JSON object string (auto-detected)
    #[arg(long)]
    prompt: String,
    /// Output PNG path (directories are created)
    #[arg(long)]
    save_path: PathBuf,
    #[arg(long, default_value_t = pixgen_client::DEFAULT_SIZE)]
    width: u32,
    #[arg(long, default_value_t = pixgen_client::DEFAULT_SIZE)]
    height: u32,
    /// Random seed (default: chosen by the server)
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    steps: Option<u32>,
    #[arg(long)]
    guidance_scale: Option<f64>,
    /// Reference image paths for image-to-image
    #[arg(long, num_args = 1..)]
    input_images: Vec<String>,
    /// API base URL
    #[arg(long)]
    server: Option<String>,
    /// Max wait in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Seconds between status checks
    #[arg(long)]
    poll_interval: Option<u64>,
}

/// How a command ended; maps onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

type CmdResult = Result<Outcome, Box<dyn Error>>;

fn main() -> ExitCode {
    env_logger::init();

    run(Cli::parse()).into()
}

fn run(cli: Cli) -> Outcome {
    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", cli.config.display(), e);
            return Outcome::Failure;
        }
    };

    let result = match cli.command {
        Commands::Generate(args) => cmd_generate(&config, args),
        Commands::Batch { catalog, strip } => cmd_batch(&config, &catalog, strip),
        Commands::Strip {
            dirs,
            threshold,
            exclude,
        } => cmd_strip(&config, dirs, threshold, exclude),
    };

    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}", e);
            Outcome::Failure
        }
    }
}

fn cmd_generate(config: &Config, args: GenerateArgs) -> CmdResult {
    let mut options = config.server.client_options();
    if let Some(server) = args.server {
        options.base_url = server;
    }
    if let Some(secs) = args.timeout {
        options.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.poll_interval {
        options.poll_interval = Duration::from_secs(secs);
    }

    let request = GenerationRequest::new(Prompt::detect(&args.prompt))
        .with_size(args.width, args.height)
        .with_steps(args.steps.unwrap_or(config.server.steps))
        .with_guidance_scale(args.guidance_scale.unwrap_or(config.server.guidance_scale))
        .with_seed(args.seed)
        .with_input_images(args.input_images);

    let client = GenerationClient::new(options)?;
    let generated = client.generate(&request, &args.save_path)?;
    println!("{}", serde_json::to_string(&generated)?);

    Ok(Outcome::Success)
}

fn cmd_batch(config: &Config, catalog_path: &Path, strip: bool) -> CmdResult {
    let assets = Catalog::load(catalog_path)?.descriptors();
    let client = GenerationClient::new(config.server.client_options())?;

    let report = driver::run_batch(&client, &assets, &config.server.request_defaults());

    println!(
        "\nAll done! Generated {}/{} assets.",
        report.generated.len(),
        assets.len()
    );
    for (path, reason) in &report.failed {
        println!("  failed: {} ({})", path.display(), reason);
    }

    if strip {
        return cmd_strip(config, Vec::new(), None, Vec::new());
    }
    Ok(Outcome::Success)
}

fn cmd_strip(
    config: &Config,
    dirs: Vec<PathBuf>,
    threshold: Option<u8>,
    exclude: Vec<String>,
) -> CmdResult {
    let mut options = config.matte.matte_options();
    if let Some(threshold) = threshold {
        options.near_black = NearBlack::new(threshold);
    }
    if !exclude.is_empty() {
        options.exclude = exclude;
    }
    let dirs = if dirs.is_empty() {
        config.matte.dirs.clone()
    } else {
        dirs
    };

    let report = remove_backgrounds(&dirs, &options)?;

    if report.is_clean() {
        println!("\nDone! Backgrounds removed from {} files.", report.processed.len());
        return Ok(Outcome::Success);
    }

    println!(
        "\nProcessed {} files, {} failed:",
        report.processed.len(),
        report.failed.len()
    );
    for (path, e) in &report.failed {
        println!("  {}: {}", path.display(), e);
    }
    Ok(Outcome::Failure)
}
