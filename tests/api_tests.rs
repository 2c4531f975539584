use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use rankfinder::api::{self, AppState};
use rankfinder::data_models::SearchQuery;
use rankfinder::driver::{BatchRunner, Limits};
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

    #[derive(Default)]
    pub struct ScriptedFactory {
        pub pages: HashMap<String, Vec<Vec<Listing>>>,
    }

    impl SourceFactory for ScriptedFactory {
        type Source = StaticPageSource<Listing>;

        async fn open(&self, query: &SearchQuery) -> Result<Self::Source, SourceError> {
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

    pub fn app<F: SourceFactory>(factory: F, dir: &Path) -> Router {
        let ledger = Arc::new(Ledger::new(dir.join("progress.csv")));
        let runner = Arc::new(BatchRunner::new(
            Arc::new(factory),
            ledger.clone(),
            Arc::new(StatusBoard::new()),
        ));
        let limits = Limits {
            max_positions: 100,
            max_pages: 10,
        };
        api::create_router(Arc::new(AppState::new(runner, ledger, dir, limits)))
    }

    pub fn scripted() -> ScriptedFactory {
        let mut pages = HashMap::new();
        pages.insert(
            "dentist".to_string(),
            vec![vec![
                Listing("Lotus Care 01".to_string()),
                Listing("Acme Dental Studio".to_string()),
            ]],
        );
        ScriptedFactory { pages }
    }

    pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn wait_until_idle(app: &Router) -> Value {
        for _ in 0..100 {
            let (_, status) = send(app, "GET", "/api/tracking-status", None).await;
            if status["active"] == json!(false) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("batch never finished");
    }

    pub async fn wait_for_output(app: &Router, needle: &str) {
        for _ in 0..100 {
            let (_, status) = send(app, "GET", "/api/tracking-status", None).await;
            if status["output"].as_str().is_some_and(|o| o.contains(needle)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("status output never showed {needle:?}");
    }

    pub fn custom(keywords: &str) -> Value {
        json!({
            "choice": "5",
            "business": "Acme Dental",
            "location": "Pune",
            "keywords": keywords,
        })
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_unknown_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(scripted(), dir.path());

    let (status, body) = send(&app, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn test_idle_server_responses() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(scripted(), dir.path());

    let (status, body) = send(&app, "GET", "/api/tracking-status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
    assert_eq!(body["progress"], 0);

    let (status, body) = send(&app, "GET", "/api/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "No results file found");
    assert_eq!(body["total"], 0);
    assert_eq!(body["data"], json!([]));

    let (status, body) = send(&app, "GET", "/api/download-csv", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "POST", "/api/cancel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_custom_setup_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(scripted(), dir.path());

    let placeholder = json!({
        "choice": "5",
        "business": "Custom Business",
        "location": "Pune",
        "keywords": "dentist",
    });
    let (status, body) = send(&app, "POST", "/api/start-tracking", Some(placeholder)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(&app, "POST", "/api/start-tracking", Some(custom("\n  \n"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/start-tracking", Some(json!({"choice": "7"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_custom_batch_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(scripted(), dir.path());

    let (status, body) = send(
        &app,
        "POST",
        "/api/start-tracking",
        Some(custom("dentist\nbraces\n")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");

    let snapshot = wait_until_idle(&app).await;
    assert_eq!(snapshot["progress"], 2);
    assert_eq!(snapshot["total"], 2);
    assert!(
        snapshot["output"]
            .as_str()
            .is_some_and(|o| o.contains("FINAL RANKING REPORT"))
    );

    let (status, body) = send(&app, "GET", "/api/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], 1);
    assert_eq!(body["total"], 2);
    assert_eq!(body["success_rate"], 50.0);
    assert_eq!(body["data"][0]["keyword"], "dentist");
    assert_eq!(body["data"][0]["position"], 2);
    assert_eq!(body["data"][1]["outcome"], "empty_page");

    let (status, body) = send(&app, "GET", "/api/download-csv", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let filename = body["filename"].as_str().unwrap();
    assert!(dir.path().join(filename).is_file());
}

#[tokio::test]
async fn test_single_active_batch_and_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HangingFactory, dir.path());

    let (status, _) = send(&app, "POST", "/api/start-tracking", Some(custom("dentist"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/start-tracking", Some(custom("braces"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Tracking already in progress");

    let (status, body) = send(&app, "GET", "/api/tracking-status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
    wait_for_output(&app, "[1/1] Custom - dentist").await;

    let (status, body) = send(&app, "POST", "/api/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelling");

    wait_until_idle(&app).await;

    let (_, body) = send(&app, "GET", "/api/results", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["outcome"], "cancelled");

    let (status, _) = send(&app, "POST", "/api/cancel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_before_first_search_still_records_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HangingFactory, dir.path());

    let (status, _) = send(
        &app,
        "POST",
        "/api/start-tracking",
        Some(custom("dentist\nbraces")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/api/cancel", None).await;
    assert_eq!(status, StatusCode::OK);

    let snapshot = wait_until_idle(&app).await;
    assert_eq!(snapshot["progress"], 2);

    let (_, body) = send(&app, "GET", "/api/results", None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["found"], 0);
    assert_eq!(body["data"][0]["keyword"], "dentist");
    assert_eq!(body["data"][1]["keyword"], "braces");
    assert_eq!(body["data"][0]["outcome"], "cancelled");
    assert_eq!(body["data"][1]["outcome"], "cancelled");
}
