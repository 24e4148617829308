//! Command definitions and dispatch.
//!
//! Each command lives in its own module with the clap arguments in `mod.rs`,
//! the work in `execute.rs` and table rendering in `output.rs`.

pub mod query;
pub mod rewrite;

use std::error::Error;

use clap::Subcommand;

use crate::config::ConfigFile;
use crate::output::OutputFormat;

pub use query::QueryCmd;
pub use rewrite::RewriteCmd;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rewrite a query with named parameters into driver placeholders
    Rewrite(RewriteCmd),
    /// Run a query and map its rows through the column engine
    Query(QueryCmd),
}

/// Runs a command and renders its result.
pub trait CommandRunner {
    fn run(self, config: &ConfigFile, format: OutputFormat) -> Result<String, Box<dyn Error>>;
}

/// Produces a command's structured result.
pub trait Execute {
    type Output;

    fn execute(self, config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>>;
}

impl CommandRunner for Command {
    fn run(self, config: &ConfigFile, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Rewrite(cmd) => cmd.run(config, format),
            Command::Query(cmd) => cmd.run(config, format),
        }
    }
}
