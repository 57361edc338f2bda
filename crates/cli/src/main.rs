// Tabula CLI - run sheet scripts and evaluate formulas headless

mod exit_codes;
mod script;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tabula_config::{LogLevel, Settings};
use tabula_engine::formula::parse_formula;
use tabula_engine::{Limits, Position, Sheet, SheetError, Value};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_IO, EXIT_SHEET, EXIT_SUCCESS, EXIT_USAGE};
use script::{Line, Statement};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Spreadsheet engine driven from scripts (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). Overrides RUST_LOG
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (default: <config dir>/tabula/settings.json)
    #[arg(long, global = true, env = "TABULA_SETTINGS", value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a sheet script and print the resulting grid
    #[command(after_help = "\
Script lines are `<position> <text>` or `clear <position>`; `#` starts a comment.

Examples:
  tabula run budget.tab
  printf 'A1 2\\nB1 =A1*21\\n' | tabula run
  tabula run budget.tab --texts
  tabula run budget.tab --keep-going")]
    Run {
        /// Script file (omit or `-` to read stdin)
        script: Option<PathBuf>,

        /// Print cell texts instead of values
        #[arg(long)]
        texts: bool,

        /// Report failing lines and continue instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Evaluate a formula without cell references
    #[command(after_help = "\
Examples:
  tabula eval '=(1+2)*3'
  tabula eval '1/0'")]
    Eval {
        /// Formula, with or without the leading `=`
        formula: String,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  tabula-engine ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    init_logging(cli.verbose, settings.log_level);

    let limits = Limits::new(settings.max_rows, settings.max_cols);
    log::debug!("sheet limits {} rows x {} cols", limits.max_rows, limits.max_cols);

    let result = match cli.command {
        Commands::Run {
            script,
            texts,
            keep_going,
        } => cmd_run(script, texts, keep_going, limits),
        Commands::Eval { formula } => cmd_eval(&formula, limits),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message }) => {
            eprintln!("error: {}", message);
            ExitCode::from(code)
        }
    }
}

/// Install the stderr subscriber; `log` records from the engine are
/// forwarded to it.
fn init_logging(verbose: u8, configured: LogLevel) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.as_str())),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
}

impl CliError {
    pub fn sheet(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SHEET, message: msg.into() }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into() }
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    script: Option<PathBuf>,
    texts: bool,
    keep_going: bool,
    limits: Limits,
) -> Result<(), CliError> {
    let source = read_script(script.as_deref())?;
    let mut sheet = Sheet::with_limits(limits);
    let mut skipped = 0usize;

    for parsed in script::parse(&source) {
        let outcome = parsed
            .map_err(|e| CliError::usage(e.to_string()))
            .and_then(|line| apply(&mut sheet, &line));

        if let Err(err) = outcome {
            if !keep_going {
                return Err(err);
            }
            eprintln!("error: {}", err.message);
            skipped += 1;
        }
    }

    if skipped > 0 {
        log::info!("skipped {} failing line(s)", skipped);
    }
    log::debug!("{} cells materialized, {} evaluations", sheet.len(), sheet.evaluations());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let printed = if texts {
        sheet.print_texts(&mut out)
    } else {
        sheet.print_values(&mut out)
    };
    printed
        .and_then(|()| out.flush())
        .map_err(|e| CliError::io(e.to_string()))
}

fn read_script(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e))),
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
            Ok(source)
        }
    }
}

fn apply(sheet: &mut Sheet, line: &Line) -> Result<(), CliError> {
    let result = match &line.statement {
        Statement::Set { pos, text } => sheet.set_cell(*pos, text),
        Statement::Clear(pos) => sheet.clear_cell(*pos),
    };
    result.map_err(|e| CliError::sheet(format!("line {}: {}", line.number, e)))
}

// ============================================================================
// eval
// ============================================================================

fn cmd_eval(formula: &str, limits: Limits) -> Result<(), CliError> {
    let expression = formula.strip_prefix('=').unwrap_or(formula);
    let parsed = parse_formula(expression, &limits)
        .map_err(|e| CliError::sheet(SheetError::FormulaSyntax(e).to_string()))?;

    if let Some(pos) = parsed.referenced_cells().first() {
        return Err(CliError::usage(format!(
            "eval takes no cell references, found {}",
            pos
        )));
    }

    let value = parsed.evaluate(&|_: Position| Value::default());
    println!("{}", value);
    Ok(())
}
