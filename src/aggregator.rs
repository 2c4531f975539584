use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::data_models::{Entry, Finding, SearchQuery};
use crate::engine::Outcome;

/// Turns a terminal outcome into the session's [`Finding`].
///
/// Found findings always carry label, position and page; every other outcome
/// carries none of them and reports how many entries were checked instead.
pub fn finalize(
    outcome: &Outcome,
    entries: &[Entry],
    pages_crawled: u32,
    query: &SearchQuery,
) -> Finding {
    let mut finding = Finding {
        keyword: query.keyword.clone(),
        location: query.location.clone(),
        searched_name: query.searched_name().to_string(),
        matched_label: None,
        matched_variant: None,
        position: None,
        page: None,
        found: false,
        outcome: outcome.kind(),
        total_checked: entries.len(),
        pages_crawled,
        error: None,
        timestamp: Utc::now(),
    };

    match outcome {
        Outcome::Found(hit) => {
            finding.found = true;
            finding.matched_label = Some(hit.entry.label.clone());
            finding.matched_variant = Some(hit.variant.clone());
            finding.position = Some(hit.entry.position);
            finding.page = Some(hit.entry.page);
            finding.total_checked = hit.entry.position;
        }
        Outcome::Cancelled(reason) => finding.error = Some(reason.clone()),
        Outcome::Failed(e) => finding.error = Some(e.to_string()),
        Outcome::Exhausted(_) | Outcome::Capped(_) | Outcome::LastPage => {}
    }
    finding
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoundRow {
    pub keyword: String,
    pub location: String,
    pub position: usize,
    pub page: u32,
    pub matched_label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MissRow {
    pub keyword: String,
    pub location: String,
    pub total_checked: usize,
    pub outcome: String,
    pub error: Option<String>,
}

/// End-of-batch report over every finding of a run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub success_rate: f64,
    pub found_rows: Vec<FoundRow>,
    pub missed_rows: Vec<MissRow>,
}

impl BatchSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut found_rows = Vec::new();
        let mut missed_rows = Vec::new();

        for f in findings {
            match (f.found, &f.matched_label, f.position, f.page) {
                (true, Some(label), Some(position), Some(page)) => found_rows.push(FoundRow {
                    keyword: f.keyword.clone(),
                    location: f.location.clone(),
                    position,
                    page,
                    matched_label: label.clone(),
                }),
                _ => missed_rows.push(MissRow {
                    keyword: f.keyword.clone(),
                    location: f.location.clone(),
                    total_checked: f.total_checked,
                    outcome: f.outcome.to_string(),
                    error: f.error.clone(),
                }),
            }
        }

        let total = findings.len();
        let found = found_rows.len();
        let success_rate = if total > 0 {
            found as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            found,
            not_found: total - found,
            success_rate,
            found_rows,
            missed_rows,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(72);
        writeln!(f, "{rule}")?;
        writeln!(f, "FINAL RANKING REPORT")?;
        writeln!(f, "{rule}")?;

        if !self.found_rows.is_empty() {
            writeln!(f, "\nFOUND RANKINGS\n")?;
            for row in &self.found_rows {
                writeln!(f, "  {} ({})", row.keyword, row.location)?;
                writeln!(f, "     Position: #{}", row.position)?;
                writeln!(f, "     Page: {}", row.page)?;
                writeln!(f, "     Business: {}", row.matched_label)?;
            }
        }

        if !self.missed_rows.is_empty() {
            writeln!(f, "\nNOT FOUND ({} keywords)\n", self.missed_rows.len())?;
            for row in &self.missed_rows {
                writeln!(f, "  {} ({})", row.keyword, row.location)?;
                write!(f, "     Checked: {} businesses [{}]", row.total_checked, row.outcome)?;
                match &row.error {
                    Some(e) => writeln!(f, " error: {e}")?,
                    None => writeln!(f)?,
                }
            }
        }

        writeln!(f, "\n{rule}")?;
        writeln!(f, "Total Keywords Tracked: {}", self.total)?;
        writeln!(f, "Keywords Found: {}", self.found)?;
        writeln!(f, "Keywords Not Found: {}", self.not_found)?;
        writeln!(f, "Success Rate: {:.1}%", self.success_rate)?;
        write!(f, "{rule}")
    }
}
