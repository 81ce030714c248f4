use std::{io, path::PathBuf, process::ExitCode};

use clap::Parser;
use gba_dma::script::{Runner, Script, ScriptError};
use tracing::{error, Level};

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    /// path to a DMA script.
    script: PathBuf,

    #[arg(short, long, default_value_t = 1232)]
    /// cycles lent to DMA by a bare `run`, one scanline by default.
    budget: i32,

    #[arg(long, default_value_t = 0)]
    /// seed for `fill ... random`.
    seed: u64,

    #[arg(short, long, action = clap::ArgAction::Count)]
    /// more logging, repeat for more.
    verbose: u8,
}

impl Args {
    fn level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn run(args: &Args) -> Result<(), ScriptError> {
    let script = Script::from_file(&args.script)?;
    let mut runner = Runner::new(args.seed, args.budget);
    runner.execute(&script, &mut io::stdout().lock())
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.level())
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}: {err}", args.script.display());
            ExitCode::FAILURE
        }
    }
}
