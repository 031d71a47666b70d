//! `dpgmm` - Dirichlet process Gaussian mixture density estimation.
//!
//! Commands:
//! - `fit`: reconstruct a density from samples, emitting posterior draws
//! - `hier`: population-level density from several events' draws
//! - `eval`: evaluate persisted draws at a point
//! - `sample`: posterior-predictive samples from persisted draws
//! - `config`: show or validate the session configuration
//!
//! Command payloads go to stdout as JSON; logs and errors go to stderr.

use clap::{Args, Parser, Subcommand};
use dpgmm_core::config::{load_config, ConfigError, ConfigOptions, ResolvedConfig};
use dpgmm_core::exit_codes::ExitCode;
use dpgmm_core::io::{load_draws, load_samples, parse_bounds, write_draws};
use dpgmm_core::logging::{event_names, init_logging, LogConfig, LogFormat, LogLevel, Stage};
use dpgmm_core::{median_pdf, percentile_pdf, sample_from_draws, Dpgmm, Draw, Hdpgmm, MixtureError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Dirichlet process Gaussian mixture density estimation
#[derive(Parser)]
#[command(name = "dpgmm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Session file (TOML or JSON); otherwise DPGMM_CONFIG, DPGMM_CONFIG_DIR, XDG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconstruct a density from samples
    Fit(FitArgs),
    /// Reconstruct a population density from per-event draws
    Hier(HierArgs),
    /// Evaluate persisted draws at a point
    Eval(EvalArgs),
    /// Draw posterior-predictive samples from persisted draws
    Sample(SampleArgs),
    /// Inspect the session configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct FitArgs {
    /// Sample file: JSON ([[x, ..], ..] or [x, ..]) or whitespace-separated text
    #[arg(long)]
    samples: PathBuf,

    /// Bounds as JSON, e.g. '[[10, 50]]'
    #[arg(long)]
    bounds: String,

    /// Number of independent draws
    #[arg(long, default_value = "1")]
    draws: usize,

    /// Seed for the session generator (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Build a draw every N points of a single pass instead of independent draws
    #[arg(long, value_name = "N")]
    history: Option<usize>,

    /// Write draws here instead of stdout
    #[arg(long, short)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HierArgs {
    /// Event files, each a JSON array of draws from `fit`
    #[arg(long, num_args = 1.., required = true)]
    events: Vec<PathBuf>,

    /// Bounds as JSON; must equal the bounds the events were fitted on
    #[arg(long)]
    bounds: String,

    /// Number of independent draws
    #[arg(long, default_value = "1")]
    draws: usize,

    /// Monte Carlo draws from the prior (overrides the config)
    #[arg(long)]
    mc_draws: Option<usize>,

    /// Seed for the session generator (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Write draws here instead of stdout
    #[arg(long, short)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Draws file
    #[arg(long)]
    draws: PathBuf,

    /// Point, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    point: Vec<f64>,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Draws file
    #[arg(long)]
    draws: PathBuf,

    /// Number of samples
    #[arg(short, long, default_value = "100")]
    n: usize,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration and where it came from
    Show,
    /// Validate a session file
    Validate {
        /// File to validate (defaults to the resolved one)
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Fit(args) => run_fit(&cli.global, args),
        Commands::Hier(args) => run_hier(&cli.global, args),
        Commands::Eval(args) => run_eval(args),
        Commands::Sample(args) => run_sample(args),
        Commands::Config(args) => run_config(&cli.global, args),
    };

    std::process::exit(exit_code.as_i32());
}

fn print_json(value: &serde_json::Value) {
    println!("{:#}", value);
}

fn output_error(code: u32, exit: ExitCode, message: String) -> ExitCode {
    let response = json!({
        "status": "error",
        "error": {
            "code": code,
            "kind": exit.code_name(),
            "message": message,
        }
    });
    eprintln!("{:#}", response);
    exit
}

fn output_mixture_error(error: &MixtureError) -> ExitCode {
    output_error(error.code(), ExitCode::from(error), error.to_string())
}

fn output_config_error(error: &ConfigError) -> ExitCode {
    output_error(error.code(), ExitCode::from(error), error.to_string())
}

fn resolve(global: &GlobalOpts) -> Result<ResolvedConfig, ConfigError> {
    load_config(&ConfigOptions {
        config_path: global.config.clone(),
    })
}

/// Print draws to stdout, or write them and print a short receipt.
fn emit_draws(draws: &[Draw], out: Option<&Path>, config_hash: &str) -> Result<(), MixtureError> {
    match out {
        Some(path) => {
            write_draws(path, draws)?;
            info!(
                event = event_names::OUTPUT_WRITTEN,
                stage = %Stage::Output,
                path = %path.display(),
                draws = draws.len(),
                "draws written"
            );
            print_json(&json!({
                "status": "ok",
                "path": path.display().to_string(),
                "draws": draws.len(),
                "clusters": draws.iter().map(Draw::n_clusters).collect::<Vec<_>>(),
                "alpha": draws.iter().map(Draw::alpha).collect::<Vec<_>>(),
                "config_hash": config_hash,
            }));
        }
        None => print_json(&serde_json::to_value(draws)?),
    }
    Ok(())
}

fn run_fit(global: &GlobalOpts, args: &FitArgs) -> ExitCode {
    let resolved = match resolve(global) {
        Ok(r) => r,
        Err(e) => return output_config_error(&e),
    };
    match fit(resolved, args) {
        Ok(()) => ExitCode::Clean,
        Err(e) => output_mixture_error(&e),
    }
}

fn fit(resolved: ResolvedConfig, args: &FitArgs) -> Result<(), MixtureError> {
    let ResolvedConfig {
        mut session,
        snapshot,
    } = resolved;
    if let Some(seed) = args.seed {
        session.sampler.seed = Some(seed);
    }
    let bounds = parse_bounds(&args.bounds)?;
    let samples = load_samples(&args.samples)?;
    info!(
        event = event_names::SAMPLES_LOADED,
        stage = %Stage::Load,
        samples = samples.len(),
        dim = bounds.dim(),
        "samples loaded"
    );

    let mut dpgmm = Dpgmm::from_session(bounds, &session, Some(&samples))?;
    info!(
        event = event_names::PRIOR_BUILT,
        stage = %Stage::Prior,
        k = dpgmm.prior().k(),
        df = dpgmm.prior().df(),
        "prior built"
    );

    let draws = match args.history {
        Some(every) => dpgmm.reconstruction_history(&samples, every)?,
        None => (0..args.draws)
            .map(|_| dpgmm.density_from_samples(&samples))
            .collect::<Result<Vec<_>, _>>()?,
    };
    emit_draws(&draws, args.out.as_deref(), &snapshot.hash)
}

fn run_hier(global: &GlobalOpts, args: &HierArgs) -> ExitCode {
    let resolved = match resolve(global) {
        Ok(r) => r,
        Err(e) => return output_config_error(&e),
    };
    match hier(resolved, args) {
        Ok(()) => ExitCode::Clean,
        Err(e) => output_mixture_error(&e),
    }
}

fn hier(resolved: ResolvedConfig, args: &HierArgs) -> Result<(), MixtureError> {
    let ResolvedConfig {
        mut session,
        snapshot,
    } = resolved;
    if let Some(seed) = args.seed {
        session.sampler.seed = Some(seed);
    }
    if let Some(m) = args.mc_draws {
        session.hierarchical.mc_draws = m;
    }
    let bounds = parse_bounds(&args.bounds)?;
    let events = args
        .events
        .iter()
        .map(|p| load_draws(p))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        event = event_names::EVENTS_LOADED,
        stage = %Stage::Load,
        events = events.len(),
        "events loaded"
    );

    let mut hdpgmm = Hdpgmm::from_session(bounds, &session)?;
    let draws = (0..args.draws)
        .map(|_| hdpgmm.density_from_events(&events))
        .collect::<Result<Vec<_>, _>>()?;
    emit_draws(&draws, args.out.as_deref(), &snapshot.hash)
}

fn run_eval(args: &EvalArgs) -> ExitCode {
    let result = (|| -> Result<serde_json::Value, MixtureError> {
        let draws = load_draws(&args.draws)?;
        let pdf = draws
            .iter()
            .map(|d| d.pdf(&args.point))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            event = event_names::POINT_EVALUATED,
            stage = %Stage::Evaluate,
            draws = draws.len(),
            "point evaluated"
        );
        Ok(json!({
            "point": args.point,
            "pdf": pdf,
            "median": median_pdf(&draws, &args.point)?,
            "p05": percentile_pdf(&draws, &args.point, 5.0)?,
            "p95": percentile_pdf(&draws, &args.point, 95.0)?,
        }))
    })();
    match result {
        Ok(v) => {
            print_json(&v);
            ExitCode::Clean
        }
        Err(e) => output_mixture_error(&e),
    }
}

fn run_sample(args: &SampleArgs) -> ExitCode {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let result = load_draws(&args.draws).and_then(|draws| {
        let points = sample_from_draws(&draws, args.n, &mut rng)?;
        info!(
            event = event_names::PREDICTIVE_SAMPLED,
            stage = %Stage::Evaluate,
            draws = draws.len(),
            n = points.len(),
            "predictive sampled"
        );
        Ok(points)
    });
    match result {
        Ok(points) => {
            print_json(&json!(points));
            ExitCode::Clean
        }
        Err(e) => output_mixture_error(&e),
    }
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => match resolve(global) {
            Ok(resolved) => {
                print_json(&json!({
                    "source": resolved.snapshot,
                    "config": resolved.session,
                }));
                ExitCode::Clean
            }
            Err(e) => output_config_error(&e),
        },
        ConfigCommands::Validate { path } => {
            let options = ConfigOptions {
                config_path: path.clone().or_else(|| global.config.clone()),
            };
            match load_config(&options) {
                Ok(resolved) => {
                    print_json(&json!({
                        "status": "valid",
                        "path": resolved.snapshot.path,
                        "source": resolved.snapshot.source,
                        "hash": resolved.snapshot.hash,
                    }));
                    ExitCode::Clean
                }
                Err(e) => output_config_error(&e),
            }
        }
    }
}
