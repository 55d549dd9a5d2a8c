use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use skink::evaluator::Evaluator;
use skink::value::Value;
use skink::{lexer, parser, repl};

#[derive(Parser)]
#[command(name = "skink", version, about = "The skink programming language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Launch the interactive prompt.
    Repl,
    /// Run a skink source file.
    Run {
        /// Path to the source file to run.
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Repl => start_repl(),
        Command::Run { file } => run_file(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr();
            let _ = repl::print_error(&mut stderr, &error);
            ExitCode::FAILURE
        }
    }
}

fn start_repl() -> Result<()> {
    println!("Welcome to the `skink` programming language!");
    println!("start typing code.");
    println!("enter `exit` to quit the repl.");
    println!();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    repl::start(&mut input, &mut output)?;
    Ok(())
}

fn run_file(path: &Path) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    debug!("running {} ({} bytes)", path.display(), source.len());

    let tokens = lexer::tokenize(&source)?;
    let program = parser::parse_tokens(tokens)?;

    let mut evaluator = Evaluator::new();
    let result = evaluator.evaluate(&program);

    let mut stdout = io::stdout();
    for line in evaluator.take_output() {
        writeln!(stdout, "{line}")?;
    }
    let value = result?;
    if !matches!(value, Value::Nil) {
        writeln!(stdout, "{}", value.inspect())?;
    }
    Ok(())
}
