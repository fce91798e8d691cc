//! CLI tool to check, lint and format PHP files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use clap::{Parser, Subcommand};
use php_syntax_rs::diagnostic::sort_diagnostics;
use php_syntax_rs::{Config, Diagnostic, ParseResult, Severity, SourceBuffer, Token};
use tracing_subscriber::EnvFilter;

/// Stack for the worker thread. Deeply nested input recurses up to the
/// configured nesting limit.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(
    name = "php-syntax",
    version,
    about = "Error-tolerant PHP parser: diagnostics, lint and formatting."
)]
struct Cli {
    /// Configuration file. Defaults to ./php-syntax.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report syntax diagnostics.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print diagnostics as JSON, one object per file.
        #[arg(long)]
        json: bool,
    },
    /// Report syntax diagnostics and lint findings.
    Lint {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Pretty-print files without syntax errors to stdout.
    Fmt {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Dump the token stream of a file.
    Tokens { file: PathBuf },
    /// Dump the syntax tree of a file.
    Tree { file: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let worker = thread::Builder::new()
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || run(&cli.command, &config));
    match worker.map(thread::JoinHandle::join) {
        Ok(Ok(true)) => ExitCode::SUCCESS,
        Ok(Ok(false)) => ExitCode::FAILURE,
        Ok(Err(_)) => {
            eprintln!("Error: worker thread panicked");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: failed to start worker thread: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, php_syntax_rs::Error> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => {
            let dir = std::env::current_dir().map_err(|source| php_syntax_rs::Error::Io {
                path: PathBuf::from("."),
                source,
            })?;
            Config::discover(&dir)?
        }
    };
    Ok(config)
}

/// Run a command over its files. Returns `false` when any file had an
/// error diagnostic or could not be read.
fn run(command: &Command, config: &Config) -> bool {
    let mut ok = true;
    match command {
        Command::Check { files, json } => {
            for path in files {
                let Some(result) = parse_path(path, config) else {
                    ok = false;
                    continue;
                };
                report(path, &result, &result.diagnostics, *json);
                ok &= !result.has_errors();
            }
        }
        Command::Lint { files, json } => {
            for path in files {
                let Some(result) = parse_path(path, config) else {
                    ok = false;
                    continue;
                };
                let mut diagnostics = result.diagnostics.clone();
                diagnostics.extend(php_syntax_rs::lint(&result, &config.lint));
                sort_diagnostics(&mut diagnostics);
                report(path, &result, &diagnostics, *json);
                ok &= !diagnostics.iter().any(|d| d.severity == Severity::Error);
            }
        }
        Command::Fmt { files } => {
            for path in files {
                let Some(result) = parse_path(path, config) else {
                    ok = false;
                    continue;
                };
                if result.diagnostics.is_empty() {
                    print!("{}", php_syntax_rs::format(&result.tree));
                } else {
                    eprintln!(
                        "{}: not formatted, {} diagnostic(s)",
                        path.display(),
                        result.diagnostics.len()
                    );
                    ok = false;
                }
            }
        }
        Command::Tokens { file } => match std::fs::read_to_string(file) {
            Ok(text) => {
                let source = SourceBuffer::new(text);
                for token in php_syntax_rs::Lexer::with_mode(&source, config.parser.lex_mode) {
                    println!("{}", describe_token(&token));
                }
            }
            Err(e) => {
                eprintln!("{}: {e}", file.display());
                ok = false;
            }
        },
        Command::Tree { file } => {
            let Some(result) = parse_path(file, config) else {
                return false;
            };
            print!("{}", result.tree.dump());
            report(file, &result, &result.diagnostics, false);
            ok = !result.has_errors();
        }
    }
    ok
}

fn parse_path(path: &Path, config: &Config) -> Option<ParseResult> {
    match php_syntax_rs::parse_file(path, &config.parser) {
        Ok(result) => Some(result),
        Err(e) => {
            eprintln!("{e}");
            None
        }
    }
}

fn report(path: &Path, result: &ParseResult, diagnostics: &[Diagnostic], json: bool) {
    let records: Vec<_> = diagnostics
        .iter()
        .map(|d| d.to_record(&result.source))
        .collect();
    if json {
        let value = serde_json::json!({
            "file": path.display().to_string(),
            "diagnostics": records,
        });
        println!("{value}");
        return;
    }
    if records.is_empty() {
        eprintln!("{}: ok", path.display());
    }
    for record in records {
        println!("{}:{record}", path.display());
    }
}

fn describe_token(token: &Token) -> String {
    format!(
        "{}..{} {:?} {:?}",
        token.span.start, token.span.end, token.kind, token.text
    )
}
