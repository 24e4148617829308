//! Output formatting for rewrite command results.

use crate::output::Outputable;
use super::execute::RewriteResult;

impl Outputable for RewriteResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Query: {}", self.raw));
        lines.push(format!("SQL:   {}", self.sql));
        lines.push(String::new());

        if self.param_names.is_empty() {
            lines.push("No parameters.".to_string());
        } else {
            lines.push(format!("Parameters ({}):", self.param_names.len()));
            for name in &self.param_names {
                lines.push(format!("  {}", name));
            }
            lines.push(String::new());
            lines.push(format!("Arguments ({}):", self.params.len()));
            for (i, value) in self.params.iter().enumerate() {
                lines.push(format!("  {}. {}", i + 1, value));
            }
        }

        lines.join("\n")
    }
}
