use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use autotiler::cli::commands;
use autotiler::config::{GenerationParams, PlannerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autotiler")]
#[command(about = "Places cities, campuses and city regions on hex maps by constrained optimization")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "autotiler.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the planning server
    Serve,

    /// Plan map files (or directories of them) in parallel
    Plan {
        /// Map files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the planned maps
        #[arg(short, long, default_value = "planned")]
        out_dir: PathBuf,
    },

    /// Generate a demo map
    Generate {
        /// Path to a generation parameters file
        #[arg(short, long)]
        params: Option<String>,

        #[arg(long)]
        rows: Option<u32>,

        #[arg(long)]
        cols: Option<u32>,

        /// Seed; 0 picks a random one
        #[arg(long)]
        seed: Option<u64>,

        /// Output map file
        #[arg(short, long, default_value = "map.bin")]
        output: PathBuf,
    },

    /// Print a map summary or a single tile
    Inspect {
        /// Map file
        map: PathBuf,

        /// Tile index to inspect
        #[arg(short, long)]
        tile: Option<usize>,
    },
}

/// Config file if present, defaults otherwise. A present but invalid file
/// is an error.
fn load_config(path: &str) -> PlannerConfig {
    let path = Path::new(path);
    if !path.exists() {
        return PlannerConfig::default();
    }
    match PlannerConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(config: &PlannerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_logging(&config);

    match cli.command {
        Commands::Serve => {
            if let Err(e) = commands::serve(config).await {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }

        Commands::Plan { inputs, out_dir } => {
            let outcomes = tokio::task::spawn_blocking(move || {
                commands::plan_files(&config, &inputs, &out_dir)
            })
            .await;
            match outcomes {
                Ok(Ok(outcomes)) => {
                    commands::print_plan_summary(&outcomes);
                    if outcomes.iter().any(|o| o.result.is_err()) {
                        std::process::exit(1);
                    }
                }
                Ok(Err(e)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Planning failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Generate {
            params,
            rows,
            cols,
            seed,
            output,
        } => {
            let mut gen_params = match params {
                Some(path) => match GenerationParams::from_file(Path::new(&path)) {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("Error loading generation params: {}", e);
                        std::process::exit(1);
                    }
                },
                None => GenerationParams::default(),
            };
            if let Some(rows) = rows {
                gen_params.rows = rows;
            }
            if let Some(cols) = cols {
                gen_params.cols = cols;
            }
            if let Some(seed) = seed {
                gen_params.seed = seed;
            }

            match commands::generate(&gen_params, &output) {
                Ok(map) => {
                    commands::print_map_summary(&map);
                    println!("\nMap saved to {}", output.display());
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Inspect { map, tile } => {
            if let Err(e) = commands::inspect(&map, tile) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
