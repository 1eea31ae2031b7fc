use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use page_summarizer::{
    api::routes::create_router,
    error::{PipelineError, Result},
    llm::Summarizer,
    pipeline::Pipeline,
    prompt::{Prompt, PromptTemplate},
    scraper::{PageFetcher, RawPage},
    AppState,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

struct StubFetcher {
    calls: AtomicUsize,
    response: fn() -> Result<RawPage>,
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<RawPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.response)()
    }
}

struct StubSummarizer {
    response: fn() -> Result<String>,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, _prompt: Prompt) -> Result<String> {
        (self.response)()
    }
}

fn hello_page() -> Result<RawPage> {
    Ok(RawPage::new("<html><body>Hello world.  Hello again.</body></html>"))
}

fn app(
    page: fn() -> Result<RawPage>,
    summary: fn() -> Result<String>,
) -> (Router, Arc<StubFetcher>) {
    let fetcher = Arc::new(StubFetcher {
        calls: AtomicUsize::new(0),
        response: page,
    });
    let pipeline = Pipeline::new(
        fetcher.clone(),
        Arc::new(StubSummarizer { response: summary }),
        PromptTemplate::default(),
    );
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    (create_router(state, None), fetcher)
}

async fn post_summarize(router: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/summarize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn summarizes_page_end_to_end() {
    let (router, _) = app(hello_page, || Ok("要約です".to_string()));

    let (status, body) = post_summarize(router, r#"{"url": "https://example.com"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "summary": "要約です" }));
}

#[tokio::test]
async fn missing_url_is_bad_request_without_fetching() {
    let (router, fetcher) = app(hello_page, || Ok("unused".to_string()));

    let (status, body) = post_summarize(router, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "URL is required" }));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_url_is_bad_request() {
    let (router, fetcher) = app(hello_page, || Ok("unused".to_string()));

    let (status, body) = post_summarize(router, r#"{"url": "  "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (router, fetcher) = app(hello_page, || Ok("unused".to_string()));

    let (status, body) = post_summarize(router, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quota_exhaustion_is_429_with_retry_later_message() {
    let (router, _) = app(hello_page, || {
        Err(PipelineError::QuotaExceeded { retry_after_secs: None })
    });

    let (status, body) = post_summarize(router, r#"{"url": "https://example.com"}"#).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "error": "API quota exceeded. Please try again later." }));
}

#[tokio::test]
async fn fetch_failure_is_500() {
    let (router, _) = app(
        || Err(PipelineError::Fetch { status: 404 }),
        || Ok("unused".to_string()),
    );

    let (status, body) = post_summarize(router, r#"{"url": "https://example.com/missing"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "HTTP error! status: 404" }));
}

#[tokio::test]
async fn upstream_failure_is_500() {
    let (router, _) = app(hello_page, || {
        Err(PipelineError::Upstream("Internal error encountered.".to_string()))
    });

    let (status, body) = post_summarize(router, r#"{"url": "https://example.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Internal error encountered."));
}

#[tokio::test]
async fn empty_page_is_client_error() {
    let (router, _) = app(
        || Ok(RawPage::new("<html><body>  <script>track()</script>  </body></html>")),
        || Ok("unused".to_string()),
    );

    let (status, body) = post_summarize(router, r#"{"url": "https://example.com"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not extract text content from the URL.");
}

#[tokio::test]
async fn missing_content_type_is_treated_as_missing_url() {
    let (router, fetcher) = app(hello_page, || Ok("unused".to_string()));

    let request = Request::builder()
        .method("POST")
        .uri("/summarize")
        .body(Body::from(r#"{"url": "https://example.com"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "error": "URL is required" }));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn serves_form_page_from_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html><body>form</body></html>").unwrap();

    let fetcher = Arc::new(StubFetcher {
        calls: AtomicUsize::new(0),
        response: hello_page,
    });
    let pipeline = Pipeline::new(
        fetcher,
        Arc::new(StubSummarizer { response: || Ok("unused".to_string()) }),
        PromptTemplate::default(),
    );
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let router = create_router(state, Some(dir.path()));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<html><body>form</body></html>");
}
