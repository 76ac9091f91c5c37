//! `tripmatch run` / `tripmatch validate` — config-driven reconciliation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tripmatch_recon::engine::{load_avl_rows, load_roster_rows};
use tripmatch_recon::{ReconConfig, ReconInput};

use crate::exit_codes::{EXIT_DIVERGENCE, EXIT_INVALID_CONFIG, EXIT_RUNTIME};
use crate::CliError;

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;

    let config = ReconConfig::from_toml(&config_str)
        .map_err(|e| recon_err(EXIT_INVALID_CONFIG, e.to_string()))?;

    // Resolve source files relative to the config file's directory.
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let read_source = |file: &str| -> Result<String, CliError> {
        let path = base_dir.join(file);
        std::fs::read_to_string(&path)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))
    };

    let avl_csv = read_source(&config.sources.avl.file)?;
    let roster_csv = read_source(&config.sources.roster.file)?;

    let input = ReconInput {
        avl: load_avl_rows(&avl_csv, &config.sources.avl.columns)
            .map_err(|e| recon_err(EXIT_RUNTIME, e.to_string()))?,
        roster: load_roster_rows(&roster_csv, &config.sources.roster.columns)
            .map_err(|e| recon_err(EXIT_RUNTIME, e.to_string()))?,
    };

    let start = Instant::now();
    let result = tripmatch_recon::run(&config, &input);
    let duration_ms = start.elapsed().as_millis();

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "recon '{}': {} outcomes — {} paired ({} compatible, {} time-divergent, {} divergent), {} avl-only, {} roster-only, {}% compatible across {} lines ({duration_ms}ms)",
        result.meta.name,
        s.total_outcomes,
        s.paired,
        s.compatible,
        s.time_divergent,
        s.divergent,
        s.avl_only,
        s.roster_only,
        s.percent_compatible,
        s.distinct_lines,
    );

    if s.time_divergent > 0 || s.divergent > 0 || s.avl_only > 0 || s.roster_only > 0 {
        return Err(recon_err(EXIT_DIVERGENCE, "divergences found"));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;

    match ReconConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: recon '{}' — avl '{}' vs roster '{}', time tolerance {} min",
                config.name,
                config.sources.avl.file,
                config.sources.roster.file,
                config.tolerance.time_equal_min,
            );
            Ok(())
        }
        Err(e) => Err(recon_err(EXIT_INVALID_CONFIG, e.to_string())),
    }
}
