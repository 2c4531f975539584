use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// One keyword/location search for a single business. Immutable for the
/// lifetime of an engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub location: String,
    /// Accepted spellings of the business; the first one is its display name.
    pub target_names: Vec<String>,
    pub max_positions: usize,
    pub max_pages: u32,
}

impl SearchQuery {
    pub fn new(
        keyword: impl Into<String>,
        location: impl Into<String>,
        target_names: Vec<String>,
        max_positions: usize,
        max_pages: u32,
    ) -> Result<SearchQuery, QueryError> {
        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return Err(QueryError::EmptyKeyword);
        }
        let target_names = target_names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect::<Vec<String>>();
        if target_names.is_empty() {
            return Err(QueryError::NoTargetNames);
        }
        if max_positions == 0 {
            return Err(QueryError::ZeroPositions);
        }
        if max_pages == 0 {
            return Err(QueryError::ZeroPages);
        }
        Ok(SearchQuery {
            keyword,
            location: location.into().trim().to_string(),
            target_names,
            max_positions,
            max_pages,
        })
    }

    pub fn searched_name(&self) -> &str {
        &self.target_names[0]
    }

    /// Text typed into the search box, e.g. "PCOS Treatment in Malad, Mumbai".
    pub fn search_text(&self) -> String {
        if self.location.is_empty() {
            self.keyword.clone()
        } else {
            format!("{} in {}", self.keyword, self.location)
        }
    }
}

/// A unique listing seen during one session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub position: usize,
    pub label: String,
    pub page: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Found,
    EmptyPage,
    Stagnant,
    PositionCap,
    PageCap,
    LastPage,
    Cancelled,
    Error,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Found => "found",
            OutcomeKind::EmptyPage => "empty_page",
            OutcomeKind::Stagnant => "stagnant",
            OutcomeKind::PositionCap => "position_cap",
            OutcomeKind::PageCap => "page_cap",
            OutcomeKind::LastPage => "last_page",
            OutcomeKind::Cancelled => "cancelled",
            OutcomeKind::Error => "error",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single output record of one search. Build it through
/// [`crate::aggregator`] so the found/not-found field invariants hold.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Finding {
    pub keyword: String,
    pub location: String,
    pub searched_name: String,
    pub matched_label: Option<String>,
    pub matched_variant: Option<String>,
    pub position: Option<usize>,
    pub page: Option<u32>,
    pub found: bool,
    pub outcome: OutcomeKind,
    pub total_checked: usize,
    pub pages_crawled: u32,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}
