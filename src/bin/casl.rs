use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result, WrapErr};

/// CASL assembler: translates `.cas` source into COMET object files.
#[derive(Parser)]
#[command(name = "casl", disable_version_flag = true)]
struct Args {
    /// Echo the assembly listing to stdout
    #[arg(short = 'a')]
    listing: bool,

    /// Print version and exit
    #[arg(short = 'v')]
    version: bool,

    /// Enable debug tracing on stderr
    #[arg(short = 'd')]
    debug: bool,

    /// Source files to assemble
    files: Vec<PathBuf>,
}

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

    if args.version {
        println!("casl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.files.is_empty() {
        eprintln!("casl: no input files (usage: casl [-avd] file...)");
        std::process::exit(2);
    }

    // Each file assembles independently; one failure does not stop the rest
    let mut failed = false;
    for path in &args.files {
        if let Err(report) = assemble_file(path, args.listing) {
            eprintln!("{:?}", report);
            failed = true;
        }
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn assemble_file(path: &Path, listing: bool) -> Result<()> {
    let src = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    let file = path.display().to_string();
    println!("{:>12} {}", "Assembling".green().bold(), file);

    let assembly = casl::assemble(&file, &src)?;
    for warning in &assembly.warnings {
        eprintln!("{:?}", warning);
    }

    let out = path.with_extension("obj");
    fs::write(&out, &assembly.text)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot write {}", out.display()))?;
    if listing {
        print!("{}", assembly.text);
    }
    println!("{:>12} {}", "Saved to".green().bold(), out.display());
    Ok(())
}
