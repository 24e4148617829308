mod execute;
mod output;

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dbmapper::Param;

use crate::cli::parse_param;
use crate::commands::{CommandRunner, Execute};
use crate::config::ConfigFile;
use crate::output::{OutputFormat, Outputable};

/// Run a query and map its rows
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  dbmapper query \"?[id, name] <- [[1, 'alice'], [2, 'bob']]\"
  dbmapper query '?[x] := x = $x' -p x=41
  dbmapper query '?[id, name] := *users{id, name}' -c name --db ./cozo.sqlite

CozoDB scripts take `$name` parameters. PostgreSQL queries (configured in
.dbmapper.json) take `:name` parameters and are rewritten before running.
")]
pub struct QueryCmd {
    /// Query script to run
    pub script: String,

    /// Result column to map (repeatable; all columns when omitted)
    #[arg(short = 'c', long = "column")]
    pub columns: Vec<String>,

    /// Parameter as name=value or name=v1,v2 (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<Param>,

    /// Path to a CozoDB SQLite database, overriding the configuration
    #[arg(long)]
    pub db: Option<PathBuf>,
}

impl CommandRunner for QueryCmd {
    fn run(self, config: &ConfigFile, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        let result = self.execute(config)?;
        Ok(result.format(format))
    }
}
