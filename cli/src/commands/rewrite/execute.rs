use std::error::Error;

use serde::Serialize;

use super::RewriteCmd;
use crate::commands::Execute;
use crate::config::ConfigFile;
use dbmapper::{prepare_with, Placeholder, Value};

/// A rewritten query ready for a driver
#[derive(Debug, Clone, Serialize)]
pub struct RewriteResult {
    pub raw: String,
    pub sql: String,
    pub placeholder: Placeholder,
    pub param_names: Vec<String>,
    pub params: Vec<Value>,
}

impl Execute for RewriteCmd {
    type Output = RewriteResult;

    fn execute(self, config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>> {
        let placeholder = if self.dollar {
            Placeholder::Dollar
        } else {
            config.mapper.placeholder
        };

        let query = prepare_with(self.sql.as_str(), placeholder).with(self.params);
        if let Some(err) = query.error() {
            return Err(err.clone().into());
        }
        let param_names = query.param_names().to_vec();
        let (sql, params) = query.into_parts()?;

        Ok(RewriteResult {
            raw: self.sql,
            sql,
            placeholder,
            param_names,
            params,
        })
    }
}
