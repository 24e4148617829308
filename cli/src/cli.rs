//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and shared parsers.
//! Individual command definitions are in the `commands` module.

use clap::Parser;
use std::path::PathBuf;

use dbmapper::{Param, Value};

use crate::commands::Command;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a configuration file
    ///
    /// If not specified, `.dbmapper.json` in the current directory is used
    /// when present; otherwise an in-memory database with default mapper
    /// settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Parse a `name=v1,v2` parameter argument.
///
/// `name=` yields a parameter with no values.
pub fn parse_param(arg: &str) -> Result<Param, String> {
    let (name, values) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    let name = name.trim();
    if name.trim_start_matches(':').is_empty() {
        return Err(format!("missing parameter name in '{}'", arg));
    }
    let values: Vec<Value> = if values.is_empty() {
        Vec::new()
    } else {
        values.split(',').map(parse_value).collect()
    };
    Ok(Param::list(name, values))
}

/// Interpret a literal: null, bool, integer, float, otherwise string.
pub fn parse_value(raw: &str) -> Value {
    match raw {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| raw.parse::<f64>().map(Value::Float))
            .unwrap_or_else(|_| Value::from(raw)),
    }
}
