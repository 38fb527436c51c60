use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wallpack::catalog::Catalog;
use wallpack::config::{self, CONFIG_FILENAME};
use wallpack::output;
use wallpack::pipeline::Pipeline;
use wallpack::validate::{ValidateConfig, Validator};

fn version_string() -> &'static str {
    let on_tag = env!("WALLPACK_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("WALLPACK_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "wallpack")]
#[command(about = "Build wallpaper packs and their manifest")]
#[command(long_about = "\
Build wallpaper packs and their manifest

Every subdirectory of the source root is one pack. Images are found
recursively; an optional pack_info.json describes the pack.

  assets/wallpapers/
  ├── Nature/
  │   ├── pack_info.json          # Optional pack metadata
  │   ├── 001-forest.jpg          # First image becomes the preview
  │   └── night/010-stars.webp    # Subdirectories are included
  └── Abstract/
      └── shapes.png

Output:

  static/wallpapers/
  ├── packs/nature.zip            # One archive per pack
  ├── previews/nature.jpg         # Scaled-down first image
  ├── thumbs/nature.jpg
  └── manifest.json               # Catalog of every pack

Run 'wallpack gen-config' to generate a documented wallpack.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Show debug logs, and warnings from validate
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build archives, previews and manifest.json
    Pack {
        /// Source asset tree
        #[arg(long)]
        source: Option<PathBuf>,
        /// Output root
        #[arg(long)]
        output: Option<PathBuf>,
        /// Rebuild archives and previews that already exist
        #[arg(long)]
        force: bool,
    },
    /// Check manifest.json against the packs' pack_info.json files
    Validate {
        /// Source asset tree
        #[arg(long)]
        source: Option<PathBuf>,
        /// Manifest to check (default: <output>/manifest.json)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Show mismatched values side by side
        #[arg(long)]
        diff: bool,
    },
    /// List the packs in the published manifest
    List,
    /// Print a random wallpaper from a pack
    Shuffle {
        pack_id: String,
        /// Seed for a repeatable pick
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a stock wallpack.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }
    let mut config = config::load_config(&cli.config)?;

    match cli.command {
        Command::Pack {
            source,
            output: out,
            force,
        } => {
            if let Some(source) = source {
                config.source = source;
            }
            if let Some(out) = out {
                config.output = out;
            }
            config.force |= force;
            init_thread_pool(&config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_pack_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = Pipeline::new(config).run(Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;

            match result {
                Ok(report) => {
                    output::print_pack_summary(&report);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Validate {
            source,
            manifest,
            diff,
        } => {
            if let Some(source) = source {
                config.source = source;
            }
            let mut validate_config = ValidateConfig::from_packer(&config);
            if let Some(manifest) = manifest {
                validate_config.manifest_path = manifest;
            }

            println!(
                "==> Validating {} against {}",
                validate_config.manifest_path.display(),
                validate_config.source_dir.display()
            );
            let report = Validator::new(validate_config).run();
            output::print_validation_report(&report, cli.verbose);
            if diff {
                println!();
                output::print_diff_report(&report);
            }
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List => {
            let catalog = Catalog::open(config)?;
            output::print_pack_list(catalog.list_packs());
            Ok(ExitCode::SUCCESS)
        }
        Command::Shuffle { pack_id, seed } => {
            let catalog = Catalog::open(config)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let pick = catalog.random_wallpaper(&pack_id, &mut rng)?;
            output::print_wallpaper(&pick);
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => Ok(ExitCode::SUCCESS),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let default = if verbose { "wallpack=debug" } else { "wallpack=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
