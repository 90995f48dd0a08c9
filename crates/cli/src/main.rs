// Tally CLI - reconcile an internal ledger against a payment-provider statement

mod exit_codes;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tally_recon::{Bucket, Side};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Reconcile an internal ledger against a payment-provider statement")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/tally/recon.toml when present)
    #[arg(long, global = true, env = "TALLY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile two files and summarize the result
    #[command(after_help = "\
Examples:
  tally run ledger.csv provider.csv
  tally run ledger.csv provider.csv --json
  tally run ledger.csv provider.csv --output report.json
  tally run ledger.csv provider.csv --export-dir out/ --strict
  tally run ledger.csv provider.csv --config recon.toml -v")]
    Run {
        /// Internal ledger file
        internal: PathBuf,

        /// Provider statement file
        provider: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write one CSV per bucket into this directory
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,

        /// Exit 3 when anything is unmatched or mismatched
        #[arg(long)]
        strict: bool,
    },

    /// Write one bucket of the report as CSV
    #[command(after_help = "\
Examples:
  tally export ledger.csv provider.csv --bucket matched
  tally export ledger.csv provider.csv --bucket internal-only --out missing.csv
  tally export ledger.csv provider.csv --bucket amount_mismatches | head

Buckets: matched, internal_only, provider_only, amount_mismatches, status_mismatches")]
    Export {
        /// Internal ledger file
        internal: PathBuf,

        /// Provider statement file
        provider: PathBuf,

        /// Bucket to export
        #[arg(long, short = 'b')]
        bucket: Bucket,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o', value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Load and normalize one file without reconciling
    #[command(after_help = "\
Examples:
  tally validate ledger.csv
  tally validate statement.csv --side provider --json")]
    Validate {
        /// File to check
        file: PathBuf,

        /// Which side the file represents
        #[arg(long, default_value = "internal")]
        side: Side,

        /// Print the result as JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version come through here too
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    logging::init_logging(&logging::LogConfig::from_verbosity(cli.verbose));

    let result = recon::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Run {
            internal,
            provider,
            json,
            output,
            export_dir,
            strict,
        } => recon::cmd_run(internal, provider, config, json, output, export_dir, strict),
        Commands::Export {
            internal,
            provider,
            bucket,
            out,
        } => recon::cmd_export(internal, provider, config, bucket, out),
        Commands::Validate { file, side, json } => recon::cmd_validate(file, side, config, json),
    });

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
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
