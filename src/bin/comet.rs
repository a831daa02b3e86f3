use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use casl::{Command, Debugger, Outcome};

/// COMET emulator: loads a CASL object file and debugs it interactively.
#[derive(Parser)]
#[command(name = "comet", disable_version_flag = true)]
struct Args {
    /// Suppress the startup banner
    #[arg(short = 'q')]
    quiet: bool,

    /// Enable debug tracing on stderr
    #[arg(short = 'd')]
    debug: bool,

    /// Object file to load
    object: Option<PathBuf>,
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if args.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .init();

    if !args.quiet {
        println!(
            "{} v{} - COMET emulator and debugger (type `help` for commands)",
            "comet".cyan().bold(),
            VERSION
        );
    }

    let mut debugger = Debugger::new();
    if let Some(path) = &args.object {
        debugger.load_file(path)?;
    }

    let stdin = io::stdin();
    let mut last: Option<Command> = None;
    loop {
        eprint!("comet> ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).into_diagnostic()? == 0 {
            // End of command input behaves like a clean quit
            break;
        }
        let line = line.trim();

        // Empty input repeats the last command
        let command = if line.is_empty() {
            match &last {
                Some(command) => command.clone(),
                None => continue,
            }
        } else {
            match Command::try_from(line) {
                Ok(command) => command,
                Err(error) => {
                    eprintln!("{}", error);
                    continue;
                }
            }
        };

        last = Some(command.clone());
        match debugger.execute(command) {
            Outcome::Ready => {}
            Outcome::Exit(code) => std::process::exit(code),
        }
    }
    Ok(())
}
