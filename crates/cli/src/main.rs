use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use confine::commands::{self, CompileOptions};
use confine::{Config, Result, System};

const CONFIG_FILE: &str = "confine.toml";
const LOG_ENV: &str = "CONFINE_LOG";

#[derive(Parser)]
#[command(name = "confine")]
#[command(about = "Compile snap interface connections into confinement policy", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./confine.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered interfaces
    Interfaces,
    /// Sanitize every declared plug and slot
    Check {
        /// System description file
        #[arg(short, long)]
        system: PathBuf,
    },
    /// Show auto-connect decisions for possible connections
    Candidates {
        /// System description file
        #[arg(short, long)]
        system: PathBuf,
    },
    /// Compile declared connections into per-tag profiles
    Compile {
        /// System description file
        #[arg(short, long)]
        system: PathBuf,
        /// Only this backend (apparmor, seccomp, udev, dbus, mount)
        #[arg(short, long)]
        backend: Option<String>,
        /// Only this security tag
        #[arg(short, long)]
        tag: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log_level);

    let registry = builtin::registry()?;
    config.declarations.validate(&registry)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Interfaces => commands::list_interfaces(&registry, &mut out),
        Commands::Check { system } => {
            let system = System::load(&system, &registry)?;
            commands::check(&system, &mut out)
        }
        Commands::Candidates { system } => {
            let system = System::load(&system, &registry)?;
            commands::candidates_report(&registry, &config.declarations, &system, &mut out)
        }
        Commands::Compile {
            system,
            backend,
            tag,
        } => {
            let options = CompileOptions {
                backend: backend.as_deref().map(commands::parse_backend).transpose()?,
                tag,
                output_dir: config.output_dir.clone(),
            };
            let system = System::load(&system, &registry)?;
            commands::compile(&registry, &system, &options, &mut out)
        }
    }
}

/// Explicit `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

/// Logs go to stderr; `CONFINE_LOG` overrides the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
