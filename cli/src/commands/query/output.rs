//! Output formatting for query command results.

use crate::output::Outputable;
use super::execute::QueryResult;

impl Outputable for QueryResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Query: {}", self.query));
        lines.push(String::new());

        if self.rows.is_empty() {
            lines.push("No rows.".to_string());
            return lines.join("\n");
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(String::len)
                    .chain(std::iter::once(name.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let pad = |values: &[String]| {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        lines.push(format!("Rows ({}):", self.rows.len()));
        lines.push(pad(&self.columns));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &cells {
            lines.push(pad(row));
        }

        lines.join("\n")
    }
}
