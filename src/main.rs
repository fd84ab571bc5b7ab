//! C-- Semantic Analyzer CLI
//!
//! Main entry point for the `cmmc` command. Scanning and parsing are
//! separate front-end stages; `cmmc` ingests the AST they serialize and
//! runs the semantic passes over it.

use clap::{Parser, Subcommand};
use cminus::{Program, Reporter, analyze};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "cmmc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Semantic analysis for the C-- programming language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a parsed C-- program
    Check {
        /// AST file (JSON) produced by the parsing stage
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the analyzed AST as JSON
        #[arg(long)]
        dump_ast: bool,

        /// Print the global symbol bindings
        #[arg(long)]
        dump_symbols: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input,
            dump_ast,
            dump_symbols,
        } => check(&input, dump_ast, dump_symbols),
    }
}

fn check(input: &Path, dump_ast: bool, dump_symbols: bool) -> Result<()> {
    let source = std::fs::read_to_string(input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", input.display()))?;
    let mut program: Program = serde_json::from_str(&source)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not a serialized C-- AST", input.display()))?;

    let mut reporter = Reporter::new();
    let analysis = analyze(&mut program, &mut reporter)?;
    reporter.emit_all();

    if dump_ast {
        println!(
            "{}",
            serde_json::to_string_pretty(&program).into_diagnostic()?
        );
    }
    if dump_symbols && let Some(globals) = analysis.symbols.global_scope() {
        for (name, sym) in globals.iter() {
            println!("{}: {}", name, analysis.symbols.type_of(sym));
        }
    }

    if reporter.has_errors() {
        tracing::debug!(errors = reporter.error_count(), "compilation failed");
        std::process::exit(1);
    }
    Ok(())
}
