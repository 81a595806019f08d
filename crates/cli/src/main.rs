// gridmatch CLI - cross-source reconciliation of grid asset inventories

mod exit_codes;
mod lookup;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{recon_exit_code, EXIT_RECON_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};
use gridmatch_recon::ReconError;

#[derive(Parser)]
#[command(name = "gridmatch")]
#[command(about = "Reconcile power-grid asset inventories across data sources")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "gridmatch_recon=debug"
    #[arg(long, global = true, env = "GRIDMATCH_LOG")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Config-driven reconciliation between two sources
    #[command(subcommand)]
    Recon(recon::ReconCommands),

    /// Resolve free-text names against one configured source
    #[command(after_help = "\
Examples:
  gridmatch lookup grid.recon.toml --source osm --names substations.txt
  gridmatch lookup grid.recon.toml --source osm --names jao.csv --column name --json
  gridmatch lookup grid.recon.toml --source osm --names jao.csv --column name --overpass q.txt")]
    Lookup(lookup::LookupArgs),

    /// Print the normalized form of each argument
    #[command(after_help = "\
Examples:
  gridmatch normalize 'Umspannwerk Größenbach' 'Plant-X (Unit #2)'")]
    Normalize {
        /// Names to normalize
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  gridmatch-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(filter: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let result = match cli.command {
        Commands::Recon(cmd) => recon::cmd_recon(cmd),
        Commands::Lookup(args) => lookup::cmd_lookup(args),
        Commands::Normalize { names } => cmd_normalize(names),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RECON_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("check the [sources.<name>.columns] mapping against the CSV header".to_string())
            }
            ReconError::InvalidThresholds { .. } => {
                Some("mismatch_threshold_km must be below max_distance_km".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

// ============================================================================
// normalize
// ============================================================================

fn cmd_normalize(names: Vec<String>) -> Result<(), CliError> {
    for name in &names {
        println!("{}", gridmatch_recon::normalize::normalize(name));
    }
    Ok(())
}
