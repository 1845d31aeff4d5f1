mod cli;
mod commands;
mod input;
mod player;
mod render;
mod room;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the game screen on stdout
    let directive = if cli.verbose {
        "typerush=debug"
    } else {
        "typerush=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let setup = || -> Result<_> {
        let config = commands::load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
        let store = commands::record_store(&config)?;
        Ok((config, store))
    };

    match cli.command {
        Command::Practice(args) => {
            let (config, store) = setup()?;
            commands::practice::run(&config, store, &args)
        }
        Command::Flash(args) => {
            let (config, store) = setup()?;
            commands::flash::run(&config, store, &args)
        }
        Command::Beat(args) => {
            let (config, store) = setup()?;
            commands::beat::run(&config, store, &args)
        }
        Command::History(args) => {
            let (_, store) = setup()?;
            commands::history::run(&store, &args)
        }
        Command::Check(args) => commands::check::run(&args),
    }
}
