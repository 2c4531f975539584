use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator;
use crate::data_models::{Entry, Finding, OutcomeKind, SearchQuery};
use crate::dedup::SeenSet;
use crate::error::SourceError;
use crate::extractor::{Extractor, ResultNode};
use crate::matcher;
use crate::page_source::PageSource;

/// External stop request for a session: a cancellation token plus an optional
/// deadline. Checked before every state transition and raced against every
/// page source call.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Why the session must stop now, if it must.
    pub fn tripped(&self) -> Option<String> {
        if self.token.is_cancelled() {
            return Some("search cancelled".to_string());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some("search deadline exceeded".to_string())
            }
            _ => None,
        }
    }

    async fn wait(&self) -> String {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => "search cancelled".to_string(),
                _ = tokio::time::sleep_until(deadline) => "search deadline exceeded".to_string(),
            },
            None => {
                self.token.cancelled().await;
                "search cancelled".to_string()
            }
        }
    }

    /// Runs `fut` unless the signal trips first.
    async fn guard<T>(&self, fut: impl Future<Output = T>) -> Result<T, String> {
        tokio::select! {
            biased;
            reason = self.wait() => Err(reason),
            out = fut => Ok(out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// The page had no result nodes at all.
    EmptyPage,
    /// Every node on the page was a repeat or unreadable.
    Stagnant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Positions,
    Pages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub entry: Entry,
    pub variant: String,
}

/// How a session ended.
#[derive(Debug)]
pub enum Outcome {
    Found(Hit),
    Exhausted(Exhaustion),
    Capped(Cap),
    LastPage,
    Cancelled(String),
    Failed(SourceError),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Found(_) => OutcomeKind::Found,
            Outcome::Exhausted(Exhaustion::EmptyPage) => OutcomeKind::EmptyPage,
            Outcome::Exhausted(Exhaustion::Stagnant) => OutcomeKind::Stagnant,
            Outcome::Capped(Cap::Positions) => OutcomeKind::PositionCap,
            Outcome::Capped(Cap::Pages) => OutcomeKind::PageCap,
            Outcome::LastPage => OutcomeKind::LastPage,
            Outcome::Cancelled(_) => OutcomeKind::Cancelled,
            Outcome::Failed(_) => OutcomeKind::Error,
        }
    }
}

/// Everything one session produced: the finding plus the ordered entries
/// behind it, kept for diagnostics.
#[derive(Debug)]
pub struct SearchReport {
    pub finding: Finding,
    pub entries: Vec<Entry>,
    pub outcome: Outcome,
}

enum CrawlState<N> {
    Fetching,
    Extracting(Vec<N>),
    Advancing,
}

enum PageScan {
    Matched(Hit),
    Capped,
    NoNewEntries,
    Admitted(usize),
}

/// Counters owned by one session, never shared between sessions.
#[derive(Debug)]
struct Session {
    seen: SeenSet,
    entries: Vec<Entry>,
    page: u32,
}

impl Session {
    fn new() -> Self {
        Self {
            seen: SeenSet::new(),
            entries: Vec::new(),
            page: 1,
        }
    }

    fn position(&self) -> usize {
        self.entries.len()
    }
}

/// Walks a result listing page by page looking for the target business.
#[derive(Debug, Clone, Default)]
pub struct RankEngine {
    extractor: Extractor,
}

impl RankEngine {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    pub async fn run<S: PageSource>(
        &self,
        query: &SearchQuery,
        source: &mut S,
        stop: &StopSignal,
    ) -> SearchReport {
        log::info!(
            "tracking '{}' in '{}' for '{}'",
            query.keyword,
            query.location,
            query.searched_name()
        );

        let mut session = Session::new();
        let mut state = CrawlState::Fetching;

        let outcome = loop {
            if let Some(reason) = stop.tripped() {
                break Outcome::Cancelled(reason);
            }

            state = match state {
                CrawlState::Fetching => match stop.guard(source.current_page_nodes()).await {
                    Ok(Ok(nodes)) if nodes.is_empty() => {
                        log::warn!("no results on page {}", session.page);
                        break Outcome::Exhausted(Exhaustion::EmptyPage);
                    }
                    Ok(Ok(nodes)) => {
                        log::debug!("page {}: {} result nodes", session.page, nodes.len());
                        CrawlState::Extracting(nodes)
                    }
                    Ok(Err(e)) => break Outcome::Failed(e),
                    Err(reason) => break Outcome::Cancelled(reason),
                },
                CrawlState::Extracting(nodes) => {
                    match self.scan_page(query, &mut session, &nodes) {
                        PageScan::Matched(hit) => break Outcome::Found(hit),
                        PageScan::Capped => break Outcome::Capped(Cap::Positions),
                        PageScan::NoNewEntries => {
                            log::warn!("no new unique results on page {}", session.page);
                            break Outcome::Exhausted(Exhaustion::Stagnant);
                        }
                        PageScan::Admitted(count) => {
                            log::debug!("page {}: {} new entries", session.page, count);
                            CrawlState::Advancing
                        }
                    }
                }
                CrawlState::Advancing => {
                    if session.page >= query.max_pages {
                        break Outcome::Capped(Cap::Pages);
                    }
                    match stop.guard(source.advance()).await {
                        Ok(Ok(true)) => {
                            session.page += 1;
                            CrawlState::Fetching
                        }
                        Ok(Ok(false)) => {
                            log::info!("no next page after page {}", session.page);
                            break Outcome::LastPage;
                        }
                        Ok(Err(e)) => break Outcome::Failed(e),
                        Err(reason) => break Outcome::Cancelled(reason),
                    }
                }
            };
        };

        match &outcome {
            Outcome::Found(hit) => log::info!(
                "FOUND '{}' at position #{} (page {}), matched variant '{}'",
                hit.entry.label,
                hit.entry.position,
                hit.entry.page,
                hit.variant
            ),
            Outcome::Failed(e) => log::error!("search for '{}' failed: {}", query.keyword, e),
            other => log::info!(
                "'{}' not found in {} results across {} pages ({})",
                query.searched_name(),
                session.position(),
                session.page,
                other.kind()
            ),
        }

        let finding = aggregator::finalize(&outcome, &session.entries, session.page, query);
        SearchReport {
            finding,
            entries: session.entries,
            outcome,
        }
    }

    fn scan_page<N: ResultNode>(
        &self,
        query: &SearchQuery,
        session: &mut Session,
        nodes: &[N],
    ) -> PageScan {
        let mut admitted = 0usize;
        for node in nodes {
            let Some(label) = self.extractor.extract(node) else {
                continue;
            };
            if !session.seen.admit(&label) {
                continue;
            }

            admitted += 1;
            let entry = Entry {
                position: session.position() + 1,
                label,
                page: session.page,
            };
            log::info!(
                "position #{} (page {}): {}",
                entry.position,
                entry.page,
                entry.label
            );
            session.entries.push(entry.clone());

            if let Some(variant) = matcher::match_any(&query.target_names, &entry.label) {
                return PageScan::Matched(Hit {
                    entry,
                    variant: variant.to_string(),
                });
            }
            if session.position() >= query.max_positions {
                return PageScan::Capped;
            }
        }

        if admitted == 0 {
            PageScan::NoNewEntries
        } else {
            PageScan::Admitted(admitted)
        }
    }
}
