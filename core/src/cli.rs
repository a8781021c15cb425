use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::interpreter::Error;

#[derive(Parser)]
#[command(name = "jss")]
#[command(about = "jss - An interpreter for a small JavaScript subset", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script
    Run {
        /// Script to run
        file: PathBuf,

        /// Print the disassembly before running
        #[arg(long)]
        dis: bool,

        /// Nested call limit (overrides config)
        #[arg(long)]
        max_call_depth: Option<usize>,
    },

    /// Print the bytecode of a script without running it
    Dis {
        /// Script to compile
        file: PathBuf,
    },

    /// Print the syntax tree of a script as JSON
    Parse {
        /// Script to parse
        file: PathBuf,
    },

    /// Start an interactive session
    Repl,

    /// Time the summation workload under the interpreter
    Bench {
        /// Input passed to the driver
        #[arg(long, default_value = "30000000")]
        n: u64,

        /// Number of timed runs
        #[arg(long, default_value = "1")]
        runs: usize,

        /// Workload script (default: built-in demos/loop.js)
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Command-line overrides are applied by the builder, after file and env
    let (max_call_depth, debug) = match &cli.command {
        Commands::Run {
            dis,
            max_call_depth,
            ..
        } => (*max_call_depth, dis.then_some(true)),
        _ => (None, None),
    };
    let config = Config::builder()
        .config_path(cli.config.clone())
        .max_call_depth(max_call_depth)
        .debug(debug)
        .build()
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Run { file, .. } => {
            use crate::interpreter::Interpreter;

            let stdout = std::io::stdout();
            let mut interpreter = Interpreter::new(stdout.lock(), &config.vm);
            interpreter.run_file(&file)?;
        }

        Commands::Dis { file } => {
            let program = parse_file(&file)?;
            let code = crate::interpreter::compiler::compile(&program).map_err(Error::from)?;
            print!("{}", crate::interpreter::dis(&code));
        }

        Commands::Parse { file } => {
            let program = parse_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&program)?);
        }

        Commands::Repl => {
            crate::repl::run_repl(&config)?;
        }

        Commands::Bench { n, runs, script } => {
            use crate::benchmark;

            let params = benchmark::BenchmarkParams { n, runs, script };
            benchmark::run_benchmark(params, &config.vm)?;
        }
    }

    Ok(())
}

fn parse_file(path: &Path) -> Result<crate::interpreter::Program> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(crate::interpreter::parse(&source).map_err(Error::from)?)
}
