use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use naxos_cli::check::CheckGroupArgs;
use naxos_cli::run::RunArgs;

/// NAXOS authenticated key exchange runner.
#[derive(Debug, Parser)]
#[command(name = "naxos", version, about)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit structured JSON logs on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one exchange between an initiator and a responder
    Run(RunArgs),
    /// Validate the configured group parameters
    CheckGroup(CheckGroupArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = naxos_crypto::load_config(cli.config.as_deref())?;
    naxos_cli::tracing_init::init_tracing(&config.log_level, cli.log_json);

    match cli.command {
        Commands::Run(ref args) => naxos_cli::run::run(args, config)?,
        Commands::CheckGroup(ref args) => naxos_cli::check::run(args, &config)?,
    }

    Ok(())
}
