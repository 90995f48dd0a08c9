//! `tally run`, `tally export`, `tally validate`.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tally_recon::export::{export_bucket, ExportTable};
use tally_recon::model::ReconOutput;
use tally_recon::session::PairLoadOutcome;
use tally_recon::{load_csv_file, Bucket, ParseWarning, ReconConfig, ReconError, ReconSession, Side};

use crate::exit_codes::{
    recon_exit_code, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_IO, EXIT_RECON_MISMATCH,
};
use crate::CliError;

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::InvalidFileType { .. } => Some("inputs must be delimited text files (see [input] extensions)"),
            ReconError::Schema { .. } => Some("headers are matched after trimming and lowercasing; spaces become '_'"),
            _ => None,
        };
        Self { code, message: err.to_string(), hint: hint.map(String::from) }
    }
}

// ============================================================================
// Config
// ============================================================================

/// `$CONFIG_DIR/tally/recon.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tally").join("recon.toml"))
}

/// Explicit path if given, else the per-user file when it exists, else
/// defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ReconConfig, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.is_file() => path,
            _ => {
                log::debug!("no config file; using defaults");
                return Ok(ReconConfig::default());
            }
        },
    };

    let text = fs::read_to_string(&path).map_err(|e| {
        recon_err(EXIT_RECON_IO, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = ReconConfig::from_toml(&text).map_err(|e| {
        recon_err(EXIT_RECON_INVALID_CONFIG, format!("{}: {e}", path.display()))
    })?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

// ============================================================================
// Loading
// ============================================================================

fn load_session(config: ReconConfig, internal: &Path, provider: &Path) -> Result<ReconSession, CliError> {
    let mut session = ReconSession::new(config);
    let PairLoadOutcome { internal, provider } = session.load_pair(internal, provider);
    match (internal, provider) {
        (Ok(()), Ok(())) => Ok(session),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e.into()),
        (Err(first), Err(second)) => {
            eprintln!("error: {first}");
            Err(second.into())
        }
    }
}

fn warning_count(session: &ReconSession) -> usize {
    session.warnings().count()
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(
    internal: PathBuf,
    provider: PathBuf,
    config: ReconConfig,
    json_output: bool,
    output_file: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let tolerance = config.tolerance.amount;
    let delimiter = config.input.delimiter_byte();
    let mut session = load_session(config, &internal, &provider)?;
    let warnings = warning_count(&session);

    let summary = session.summary();
    let report = session.report();
    let output = ReconOutput::new(report, summary, tolerance);

    if json_output || output_file.is_some() {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = output_file {
            fs::write(path, &json_str)
                .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }

        if json_output {
            println!("{json_str}");
        }
    }

    if let Some(ref dir) = export_dir {
        fs::create_dir_all(dir)
            .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot create {}: {e}", dir.display())))?;
        for bucket in Bucket::ALL {
            let path = dir.join(format!("{bucket}.csv"));
            write_bucket_file(&export_bucket(report, bucket), &path, delimiter)?;
        }
        eprintln!("wrote {} bucket file(s) to {}", Bucket::ALL.len(), dir.display());
    }

    // Human summary to stderr
    let s = &output.summary;
    eprintln!(
        "reconciled {} internal / {} provider record(s): {} matched, {} amount mismatch(es), {} status mismatch(es), {} internal-only, {} provider-only",
        s.internal_records,
        s.provider_records,
        s.matched,
        s.amount_mismatches,
        s.status_mismatches,
        s.internal_only,
        s.provider_only,
    );
    if warnings > 0 {
        eprintln!("{warnings} parse warning(s); rerun with -v or `tally validate` for details");
    }

    if strict && !report.is_clean() {
        return Err(recon_err(EXIT_RECON_MISMATCH, "mismatches found")
            .with_hint("inspect the buckets with --json or --export-dir"));
    }

    Ok(())
}

// ============================================================================
// export
// ============================================================================

pub fn cmd_export(
    internal: PathBuf,
    provider: PathBuf,
    config: ReconConfig,
    bucket: Bucket,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    let delimiter = config.input.delimiter_byte();
    let mut session = load_session(config, &internal, &provider)?;
    let table = export_bucket(session.report(), bucket);

    match out {
        Some(path) => {
            write_bucket_file(&table, &path, delimiter)?;
            eprintln!("wrote {} {bucket} row(s) to {}", table.rows.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            table
                .write_csv(&mut handle, delimiter)
                .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot write CSV: {e}")))?;
            handle
                .flush()
                .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot write CSV: {e}")))?;
        }
    }
    Ok(())
}

fn write_bucket_file(
    table: &ExportTable,
    path: &Path,
    delimiter: u8,
) -> Result<(), CliError> {
    let file = File::create(path)
        .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot create {}: {e}", path.display())))?;
    table
        .write_csv(BufWriter::new(file), delimiter)
        .map_err(|e| recon_err(EXIT_RECON_IO, format!("cannot write {}: {e}", path.display())))
}

// ============================================================================
// validate
// ============================================================================

#[derive(Serialize)]
struct ValidateOutput<'a> {
    file: String,
    side: Side,
    rows: usize,
    records: usize,
    skipped: usize,
    warnings: &'a [ParseWarning],
}

pub fn cmd_validate(file: PathBuf, side: Side, config: ReconConfig, json_output: bool) -> Result<(), CliError> {
    let dataset = load_csv_file(&file, side, &config.input)?;

    let output = ValidateOutput {
        file: dataset.source.clone(),
        side,
        rows: dataset.raw_row_count,
        records: dataset.records.len(),
        skipped: dataset.raw_row_count - dataset.records.len(),
        warnings: &dataset.warnings,
    };

    if json_output {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    eprintln!(
        "valid: {} ({side}) {} row(s), {} record(s), {} skipped for blank reference",
        output.file, output.rows, output.records, output.skipped,
    );
    for warning in output.warnings {
        eprintln!("  warning: {warning}");
    }
    Ok(())
}
