//! `gridmatch lookup`: substring name resolution against one source.

use std::path::{Path, PathBuf};

use clap::Args;

use gridmatch_recon::engine::read_source;
use gridmatch_recon::export::overpass_query;
use gridmatch_recon::lookup::lookup_names;

use crate::exit_codes::EXIT_ERROR;
use crate::recon::load_config;
use crate::CliError;

#[derive(Args)]
pub struct LookupArgs {
    /// Path to the .recon.toml config file
    pub config: PathBuf,

    /// Configured source to resolve names against
    #[arg(long)]
    pub source: String,

    /// File of names: one per line, or a CSV when --column is given
    #[arg(long)]
    pub names: PathBuf,

    /// CSV column holding the names
    #[arg(long)]
    pub column: Option<String>,

    /// Output JSON to stdout instead of plain lists
    #[arg(long)]
    pub json: bool,

    /// Write an Overpass query for the matched identities
    #[arg(long)]
    pub overpass: Option<PathBuf>,
}

pub fn cmd_lookup(args: LookupArgs) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&args.config)?;
    let source = config.sources.get(&args.source).ok_or_else(|| {
        let known: Vec<&str> = config.sources.keys().map(String::as_str).collect();
        CliError::args(format!("unknown source \"{}\"", args.source))
            .with_hint(format!("configured sources: {}", known.join(", ")))
    })?;

    let queries = read_names(&args.names, args.column.as_deref())?;
    let entities = read_source(&args.source, source, &base_dir)?;
    log::info!(
        "resolving {} name(s) against {} '{}' entities",
        queries.len(),
        entities.len(),
        args.source
    );
    let out = lookup_names(&queries, &entities);

    if let Some(ref path) = args.overpass {
        std::fs::write(path, overpass_query(&out.matched_identities()))
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for m in &out.matched {
            let coord = m
                .coordinate
                .map(|c| format!("{},{}", c.latitude, c.longitude))
                .unwrap_or_default();
            println!(
                "{}\t{}\t{}\t{}",
                m.query,
                m.identity,
                m.matched_name.as_deref().unwrap_or(""),
                coord
            );
        }
        for name in &out.unmatched {
            println!("{name}\t\t\t");
        }
    }

    eprintln!(
        "lookup: {} name(s), {} matched, {} unmatched",
        out.total(),
        out.matched.len(),
        out.unmatched.len()
    );
    Ok(())
}

fn read_names(path: &Path, column: Option<&str>) -> Result<Vec<String>, CliError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?;

    let Some(column) = column else {
        return Ok(data
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect());
    };

    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let idx = reader
        .headers()
        .map_err(|e| CliError::args(format!("{}: {e}", path.display())))?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| CliError::args(format!("{}: no column \"{column}\"", path.display())))?;

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CliError::args(format!("{}: {e}", path.display())))?;
        let name = record.get(idx).unwrap_or("").trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
