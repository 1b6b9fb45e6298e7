// Command-line entry point for psdeob.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use tracing::{error, info, warn};

use psdeob::api::RunReport;
use psdeob::application::{is_tree_document, ProcessUsecase, Task};
use psdeob::infrastructure::concurrency::init_thread_pool;
use psdeob::infrastructure::logging::init_logging;
use psdeob::infrastructure::{PowerShellParser, Settings, XmlTreeCodec};
use psdeob::ports::rebuilder::Rebuilder;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Command {
    /// Write the AST document (<name>.xml)
    Parse,
    /// Deobfuscate (<name>.deob.xml, <name>.deob.ps1)
    Deob,
    /// Reformat without deobfuscating (<name>.formatted.ps1)
    Format,
}

impl From<Command> for Task {
    fn from(command: Command) -> Self {
        match command {
            Command::Parse => Task::Parse,
            Command::Deob => Task::Deob,
            Command::Format => Task::Format,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(value_enum)]
    command: Command,

    /// Input .ps1 script or saved .xml AST (can specify multiple)
    #[arg(short, long = "in", required = true)]
    input: Vec<PathBuf>,

    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parse scripts in an isolated PowerShell job
    #[arg(long)]
    sandbox: bool,

    /// Print a JSON report per input on stdout
    #[arg(long)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Processes every input; returns whether all of them succeeded.
fn run(cli: &Cli) -> Result<bool> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if cli.sandbox {
        settings.parser.sandboxed = true;
    }

    let parser = PowerShellParser::new(settings.parser.clone());
    if cli.input.iter().any(|input| !is_tree_document(input)) {
        parser
            .check_available()
            .context("A PowerShell interpreter is required to parse scripts")?;
    }

    if let Err(e) = init_thread_pool(cli.input.len()) {
        warn!("Using the default thread pool: {}", e);
    }

    let rebuilder = Rebuilder::new(settings.rebuilder.clone());
    let usecase = ProcessUsecase {
        parser: &parser,
        tree_codec: &XmlTreeCodec,
        tree_exporter: &XmlTreeCodec,
        script_exporter: &rebuilder,
        optimizer: &settings.optimizer,
    };
    let task = Task::from(cli.command);

    let reports: Vec<RunReport> = cli
        .input
        .par_iter()
        .map(|input| match usecase.run(task, input) {
            Ok(outcome) => RunReport::from(&outcome),
            Err(e) => {
                error!("{}: {:#}", input.display(), e);
                RunReport::failed(task, input, &e)
            }
        })
        .collect();

    let failed = reports.iter().filter(|r| !r.succeeded()).count();
    info!("{} of {} file(s) processed", reports.len() - failed, reports.len());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(failed == 0)
}
