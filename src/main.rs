//! hlslc Command Line Interface
//!
//! Usage:
//!   hlslc [OPTIONS] <input-file>
//!   hlslc --help
//!
//! Examples:
//!   hlslc shader.hlsl                       # Check and lower, print diagnostics
//!   hlslc --emit=ir shader.hlsl             # Dump the lowered IR
//!   hlslc --emit=ast --stop-after=parse x.hlsl  # Just parse and dump the AST
//!   hlslc --node-limit=100000 big.hlsl      # Bound memory use

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use hlslc::{CompileOptions, Stage};
use log::{debug, error, info, warn};
use std::fs;
use std::path::PathBuf;

/// hlslc - HLSL-style shader front end
#[derive(Parser, Debug)]
#[command(name = "hlslc")]
#[command(version)]
#[command(about = "Parse, check and lower HLSL-style shaders to a tree IR", long_about = None)]
struct Cli {
    /// Shader source file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "diagnostics")]
    emit: EmitKind,

    /// Last stage to run
    #[arg(long)]
    stop_after: Option<StageArg>,

    /// Maximum number of AST/IR nodes before giving up
    #[arg(long, value_name = "N")]
    node_limit: Option<usize>,

    /// Treat warnings as errors
    #[arg(long)]
    warnings_as_errors: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StageArg {
    /// Syntax only
    Parse,
    /// Syntax and semantic analysis
    Analyze,
    /// Everything, including IR building
    Ir,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Parse => Stage::Parse,
            StageArg::Analyze => Stage::Analyze,
            StageArg::Ir => Stage::Ir,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Errors and warnings only
    Diagnostics,
    /// Abstract Syntax Tree
    Ast,
    /// Lowered tree IR
    Ir,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("hlslc v{}", hlslc::VERSION);
    debug!("Input file: {:?}", cli.input);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;

    let options = build_options(&cli);
    debug!("Compile options: {:?}", options);

    let result = hlslc::compile(&source, &options);
    if result.out_of_memory {
        error!("Out of memory while compiling {:?}", cli.input);
        bail!("out of memory (node limit exceeded)");
    }

    for diagnostic in &result.errors {
        eprintln!("{}", diagnostic);
    }
    if !cli.quiet {
        for diagnostic in &result.warnings {
            eprintln!("{}", diagnostic);
        }
    }

    if !result.success {
        error!("Compilation failed");
        bail!("{} error(s) in {:?}", result.errors.len(), cli.input);
    }

    match cli.emit {
        EmitKind::Diagnostics => {
            info!(
                "{} function(s), {} warning(s)",
                result.function_count,
                result.warnings.len()
            );
        }
        EmitKind::Ast => match &result.ast {
            Some(program) => write_output(&cli.output, &format!("{:#?}", program))?,
            None => warn!("No syntax tree was produced"),
        },
        EmitKind::Ir => {
            if result.ir.is_empty() {
                warn!("No IR was produced; was --stop-after set before the IR stage?");
            }
            write_output(&cli.output, &hlslc::ir::print_functions(&result.ir))?;
        }
    }

    Ok(())
}

fn build_options(cli: &Cli) -> CompileOptions {
    let default_stage = match cli.emit {
        EmitKind::Ast => Stage::Analyze,
        EmitKind::Diagnostics | EmitKind::Ir => Stage::Ir,
    };
    CompileOptions {
        filename: cli.input.display().to_string(),
        stop_after: cli.stop_after.map(Stage::from).unwrap_or(default_stage),
        node_limit: cli.node_limit,
        cancel: None,
        warnings_as_errors: cli.warnings_as_errors,
    }
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
