use std::future::Future;

use crate::data_models::SearchQuery;
use crate::error::SourceError;
use crate::extractor::ResultNode;

/// A paginated result listing that has already been opened for one query.
///
/// A source is exclusive to one session: the "next page" action is only
/// valid against the page currently loaded, so sources are never shared.
pub trait PageSource: Send {
    type Node: ResultNode;

    /// Result nodes of the page currently loaded, in listing order.
    fn current_page_nodes(&mut self) -> impl Future<Output = Result<Vec<Self::Node>, SourceError>> + Send;

    /// Moves to the next page. `Ok(false)` when there is no further page.
    fn advance(&mut self) -> impl Future<Output = Result<bool, SourceError>> + Send;
}

/// Opens a fresh [`PageSource`] for each query of a batch.
pub trait SourceFactory: Send + Sync + 'static {
    type Source: PageSource + 'static;

    fn open(&self, query: &SearchQuery) -> impl Future<Output = Result<Self::Source, SourceError>> + Send;
}

/// Pages held in memory; useful for replays and tests.
#[derive(Debug, Clone)]
pub struct StaticPageSource<N> {
    pages: Vec<Vec<N>>,
    current: usize,
}

impl<N> StaticPageSource<N> {
    pub fn new(pages: Vec<Vec<N>>) -> Self {
        Self { pages, current: 0 }
    }

    /// Zero-based index of the page currently loaded.
    pub fn current_index(&self) -> usize {
        self.current
    }
}

impl<N> PageSource for StaticPageSource<N>
where
    N: ResultNode + Clone,
{
    type Node = N;

    async fn current_page_nodes(&mut self) -> Result<Vec<N>, SourceError> {
        Ok(self.pages.get(self.current).cloned().unwrap_or_default())
    }

    async fn advance(&mut self) -> Result<bool, SourceError> {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            return Ok(true);
        }
        Ok(false)
    }
}
