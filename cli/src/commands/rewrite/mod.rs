mod execute;
mod output;

use std::error::Error;

use clap::Args;
use dbmapper::Param;

use crate::cli::parse_param;
use crate::commands::{CommandRunner, Execute};
use crate::config::ConfigFile;
use crate::output::{OutputFormat, Outputable};

/// Rewrite named parameters into positional placeholders
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  dbmapper rewrite 'SELECT * FROM users WHERE id = :id' -p id=7
  dbmapper rewrite 'SELECT * FROM users WHERE id IN (:ids)' -p ids=1,2,3
  dbmapper rewrite 'SELECT * FROM users WHERE name = :name' -p name=bob --dollar
")]
pub struct RewriteCmd {
    /// SQL text with `:name` parameters
    pub sql: String,

    /// Parameter as name=value or name=v1,v2 (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<Param>,

    /// Emit `$1, $2, ...` placeholders instead of `?`
    #[arg(long, default_value_t = false)]
    pub dollar: bool,
}

impl CommandRunner for RewriteCmd {
    fn run(self, config: &ConfigFile, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        let result = self.execute(config)?;
        Ok(result.format(format))
    }
}
