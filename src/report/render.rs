use super::{RunReport, RunStatus};
use std::fmt;

const HEADERS: [&str; 8] = [
    "collection",
    "field",
    "scanned",
    "matched",
    "mutated",
    "exempt",
    "ambiguous",
    "commits",
];

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "{} run {}{}", self.procedure, self.run_id, mode)?;

        let mut rows: Vec<[String; 8]> = self
            .collections
            .iter()
            .map(|c| {
                [
                    c.collection.clone(),
                    c.field.clone(),
                    c.scanned.to_string(),
                    c.matched.to_string(),
                    c.mutated.to_string(),
                    c.exempt.to_string(),
                    c.ambiguous.to_string(),
                    c.commits.to_string(),
                ]
            })
            .collect();
        let t = &self.totals;
        rows.push([
            "TOTAL".to_string(),
            String::new(),
            t.scanned.to_string(),
            t.matched.to_string(),
            t.mutated.to_string(),
            t.exempt.to_string(),
            t.ambiguous.to_string(),
            t.commits.to_string(),
        ]);

        // Calculate column widths
        let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let header: Vec<String> = HEADERS
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{}", separator)?;

        let last = rows.len() - 1;
        for (idx, row) in rows.iter().enumerate() {
            if idx == last {
                writeln!(f, "{}", separator)?;
            }
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
                .collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }

        for warning in &self.warnings {
            writeln!(f, "WARNING: {}", warning)?;
        }

        match &self.status {
            RunStatus::Aborted(err) => write!(f, "status: ABORTED - {}", err),
            status => write!(f, "status: {}", status.label().to_uppercase()),
        }
    }
}
