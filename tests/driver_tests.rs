use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rankfinder::data_models::{OutcomeKind, SearchQuery};
use rankfinder::driver::{self, BatchRunner, Limits};
use rankfinder::error::SourceError;
use rankfinder::extractor::ResultNode;
use rankfinder::ledger::Ledger;
use rankfinder::page_source::{PageSource, SourceFactory, StaticPageSource};
use rankfinder::status::StatusBoard;

mod test_helpers {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct Listing(pub String);

    impl ResultNode for Listing {
        fn field_text(&self, selector: &str) -> Option<String> {
            (selector == r#"div[role="heading"]"#).then(|| self.0.clone())
        }

        fn text(&self) -> String {
            String::new()
        }
    }

    pub fn page(labels: &[&str]) -> Vec<Listing> {
        labels.iter().map(|l| Listing(l.to_string())).collect()
    }

    /// Serves canned pages per keyword; keywords listed in `broken` fail to open.
    #[derive(Default)]
    pub struct ScriptedFactory {
        pub pages: HashMap<String, Vec<Vec<Listing>>>,
        pub broken: Vec<String>,
    }

    impl SourceFactory for ScriptedFactory {
        type Source = StaticPageSource<Listing>;

        async fn open(&self, query: &SearchQuery) -> Result<Self::Source, SourceError> {
            if self.broken.contains(&query.keyword) {
                return Err(SourceError::Transport("browser failed to start".into()));
            }
            Ok(StaticPageSource::new(
                self.pages.get(&query.keyword).cloned().unwrap_or_default(),
            ))
        }
    }

    pub struct Hanging;

    impl PageSource for Hanging {
        type Node = Listing;

        async fn current_page_nodes(&mut self) -> Result<Vec<Listing>, SourceError> {
            std::future::pending().await
        }

        async fn advance(&mut self) -> Result<bool, SourceError> {
            std::future::pending().await
        }
    }

    pub struct HangingFactory;

    impl SourceFactory for HangingFactory {
        type Source = Hanging;

        async fn open(&self, _query: &SearchQuery) -> Result<Hanging, SourceError> {
            Ok(Hanging)
        }
    }

    pub fn limits() -> Limits {
        Limits {
            max_positions: 100,
            max_pages: 10,
        }
    }

    pub fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    pub fn scripted() -> ScriptedFactory {
        let mut pages = HashMap::new();
        pages.insert(
            "dentist".to_string(),
            vec![
                page(&["Lotus Care 01", "Lotus Care 02"]),
                page(&["Acme Dental Studio - Dentist"]),
            ],
        );
        pages.insert(
            "braces".to_string(),
            vec![page(&["Lotus Care 01", "Lotus Care 02", "Lotus Care 03"])],
        );
        ScriptedFactory {
            pages,
            broken: vec!["implants".to_string()],
        }
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path().join("progress.csv")));
    let status = Arc::new(StatusBoard::new());
    let runner = Arc::new(BatchRunner::new(
        Arc::new(scripted()),
        ledger.clone(),
        status.clone(),
    ));

    let jobs = driver::custom_jobs(
        "Acme Dental",
        &[],
        "Pune",
        &keywords(&["dentist", "implants", "braces"]),
        limits(),
    )
    .unwrap();
    assert!(status.try_start(jobs.len()).await);

    let findings = runner.run(jobs, CancellationToken::new()).await;

    assert_eq!(findings.len(), 3);
    assert!(findings[0].found);
    assert_eq!(findings[0].position, Some(3));
    assert_eq!(findings[0].page, Some(2));
    assert_eq!(findings[1].outcome, OutcomeKind::Error);
    assert!(
        findings[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("browser failed to start"))
    );
    assert_eq!(findings[1].total_checked, 0);
    assert_eq!(findings[2].outcome, OutcomeKind::LastPage);
    assert_eq!(findings[2].total_checked, 3);

    let recorded = ledger.load().unwrap();
    assert_eq!(recorded.len(), 3);

    let snap = status.snapshot().await;
    assert_eq!(snap.progress, 3);
    assert!(snap.output.contains("[1/3] Custom - dentist"));
    assert!(snap.output.contains("FOUND #3 (page 2): Acme Dental Studio"));
}

#[tokio::test]
async fn test_parallel_workers_keep_job_order() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path().join("progress.csv")));
    let runner = Arc::new(
        BatchRunner::new(Arc::new(scripted()), ledger.clone(), Arc::new(StatusBoard::new()))
            .with_workers(3),
    );

    let list = keywords(&["braces", "dentist", "implants", "dentist", "braces"]);
    let jobs = driver::custom_jobs("Acme Dental", &[], "Pune", &list, limits()).unwrap();
    let findings = runner.run(jobs, CancellationToken::new()).await;

    let order: Vec<&str> = findings.iter().map(|f| f.keyword.as_str()).collect();
    assert_eq!(order, vec!["braces", "dentist", "implants", "dentist", "braces"]);
    assert_eq!(ledger.load().unwrap().len(), 5);
}

#[tokio::test]
async fn test_cancelled_batch_records_every_job_as_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path().join("progress.csv")));
    let status = Arc::new(StatusBoard::new());
    let runner = Arc::new(BatchRunner::new(
        Arc::new(scripted()),
        ledger.clone(),
        status.clone(),
    ));

    let token = CancellationToken::new();
    token.cancel();
    let jobs = driver::custom_jobs(
        "Acme Dental",
        &[],
        "Pune",
        &keywords(&["dentist", "braces"]),
        limits(),
    )
    .unwrap();
    assert!(status.try_start(jobs.len()).await);
    let findings = runner.run(jobs, token).await;

    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].keyword, "dentist");
    assert_eq!(findings[1].keyword, "braces");
    for finding in &findings {
        assert!(!finding.found);
        assert_eq!(finding.outcome, OutcomeKind::Cancelled);
        assert_eq!(finding.error.as_deref(), Some("search cancelled"));
        assert_eq!(finding.total_checked, 0);
    }
    let recorded = ledger.load().unwrap();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|f| f.outcome == OutcomeKind::Cancelled));

    let snap = status.snapshot().await;
    assert_eq!(snap.progress, 2);
    assert!(snap.output.contains("Batch cancelled after 0 of 2 searches"));
}

#[tokio::test]
async fn test_session_timeout_ends_hanging_search() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path().join("progress.csv")));
    let runner = Arc::new(
        BatchRunner::new(Arc::new(HangingFactory), ledger.clone(), Arc::new(StatusBoard::new()))
            .with_session_timeout(Duration::from_millis(50)),
    );

    let jobs = driver::custom_jobs(
        "Acme Dental",
        &[],
        "Pune",
        &keywords(&["dentist", "braces"]),
        limits(),
    )
    .unwrap();
    let findings = runner.run(jobs, CancellationToken::new()).await;

    assert_eq!(findings.len(), 2);
    for finding in &findings {
        assert_eq!(finding.outcome, OutcomeKind::Cancelled);
        assert_eq!(finding.error.as_deref(), Some("search deadline exceeded"));
    }
    assert_eq!(ledger.load().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_mid_batch_records_remaining_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::new(dir.path().join("progress.csv")));
    let runner = Arc::new(BatchRunner::new(
        Arc::new(HangingFactory),
        ledger.clone(),
        Arc::new(StatusBoard::new()),
    ));

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let jobs = driver::custom_jobs(
        "Acme Dental",
        &[],
        "Pune",
        &keywords(&["dentist", "braces", "implants"]),
        limits(),
    )
    .unwrap();
    let findings = runner.run(jobs, token).await;

    assert_eq!(findings.len(), 3);
    let order: Vec<&str> = findings.iter().map(|f| f.keyword.as_str()).collect();
    assert_eq!(order, vec!["dentist", "braces", "implants"]);
    for finding in &findings {
        assert_eq!(finding.outcome, OutcomeKind::Cancelled);
        assert_eq!(finding.error.as_deref(), Some("search cancelled"));
    }
    assert_eq!(ledger.load().unwrap().len(), 3);
}
