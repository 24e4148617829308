use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
pub mod output;
#[macro_use]
mod test_macros;

use cli::Args;
use commands::CommandRunner;
use config::ConfigFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostics go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ConfigFile::resolve(args.config.as_deref())?;
    let output = args.command.run(&config, args.format)?;
    println!("{}", output);
    Ok(())
}
