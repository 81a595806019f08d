//! `gridmatch recon`: config-driven bidirectional reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use gridmatch_recon::engine::load_sources;
use gridmatch_recon::export::write_outputs;
use gridmatch_recon::model::DirectionSummary;
use gridmatch_recon::ReconConfig;

use crate::exit_codes::{EXIT_ERROR, EXIT_RECON_DISCREPANCIES, EXIT_RECON_RUNTIME};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  gridmatch recon run grid.recon.toml
  gridmatch recon run grid.recon.toml --json
  gridmatch recon run grid.recon.toml --output result.json
  gridmatch recon run grid.recon.toml --out-dir out/")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write CSV/GeoJSON/QuickStatements lists here (overrides [output].dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  gridmatch recon validate grid.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, out_dir } => {
            cmd_recon_run(config, json, output, out_dir)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

/// Read and validate a config. File paths inside it resolve against the
/// returned base directory.
pub fn load_config(config_path: &Path) -> Result<(ReconConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config: {e}")))?;
    let config = ReconConfig::from_toml(&config_str)?;
    log::info!("loaded config '{}' from {}", config.name, config_path.display());
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;

    let input = load_sources(&config, &base_dir)?;
    let result = gridmatch_recon::run(&config, &input)?;

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    let list_dir = out_dir.or_else(|| config.output.dir.as_ref().map(|d| base_dir.join(d)));
    if let Some(dir) = list_dir {
        let written = write_outputs(&result, &dir, &config.output)?;
        eprintln!("wrote {} file(s) to {}", written.len(), dir.display());
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!("recon '{}': {} vs {}", result.meta.config_name, result.meta.left, result.meta.right);
    print_direction(&result.meta.left, &result.meta.right, &s.forward);
    print_direction(&result.meta.right, &result.meta.left, &s.reverse);

    if !s.is_reconciled() {
        return Err(CliError::new(EXIT_RECON_DISCREPANCIES, "discrepancies found"));
    }
    Ok(())
}

fn print_direction(source: &str, target: &str, d: &DirectionSummary) {
    eprintln!(
        "  {source} -> {target}: {} entities, {} excluded, {} matched, {} mismatched, {} missing, {} without coordinates",
        d.source_entities,
        d.excluded,
        d.matched,
        d.mismatched,
        d.missing_in_target,
        d.missing_coordinates,
    );
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;
    let (left, _) = config.left()?;
    let (right, _) = config.right()?;
    eprintln!(
        "valid: recon '{}' pairing {} with {} (max {} / mismatch {})",
        config.name,
        left,
        right,
        config.thresholds.max_distance_km,
        config.thresholds.mismatch_threshold_km,
    );
    Ok(())
}
