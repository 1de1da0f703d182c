//! API server initialization

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::middleware::{self, SignatureKey};
use super::routes::{health, metrics};
use crate::core::constants::{
    DEFAULT_BODY_LIMIT, PATH_HEALTH, PATH_PING, PATH_UPDATE, PATH_UPDATES, PATH_VALUE,
};
use crate::core::shutdown::ShutdownService;

/// Build the full router
///
/// With a key, every POST route requires a valid `HashSHA256` header. The
/// check sits inside request decompression so it sees the plain body.
pub fn router(state: AppState, key: Option<&str>) -> Router {
    let routes = Router::new()
        .route("/", get(metrics::list_page))
        .route(PATH_HEALTH, get(health::health))
        .route(PATH_PING, get(health::ping))
        .route(&format!("{}/{{kind}}/{{id}}", PATH_VALUE), get(metrics::get_value))
        .route(PATH_VALUE, post(metrics::post_value))
        .route(
            &format!("{}/{{kind}}/{{id}}/{{value}}", PATH_UPDATE),
            post(metrics::update_from_path),
        )
        .route(PATH_UPDATE, post(metrics::update_json))
        .route(PATH_UPDATES, post(metrics::update_batch));

    let routes = match key {
        Some(key) => routes.route_layer(axum::middleware::from_fn_with_state(
            SignatureKey(Arc::from(key.as_bytes())),
            middleware::verify_signature,
        )),
        None => routes,
    };

    routes
        .fallback(middleware::handle_404)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .with_state(state)
}

pub struct ApiServer {
    address: String,
    router: Router,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(
        address: impl Into<String>,
        state: AppState,
        key: Option<&str>,
        shutdown: ShutdownService,
    ) -> Self {
        Self {
            address: address.into(),
            router: router(state, key),
            shutdown,
        }
    }

    /// Serve until the shutdown signal fires
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(&self.address)
            .await
            .with_context(|| format!("Failed to bind {}", self.address))?;
        let local = listener.local_addr()?;
        tracing::info!("Server listening on http://{}", local);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(self.shutdown.wait())
            .await?;

        tracing::debug!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryStore, MetricStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use osmetrics::core::constants::HASH_HEADER;
    use osmetrics::model::Metric;
    use osmetrics::signing::sign;
    use std::io::Write;
    use tower::ServiceExt;

    struct TestApp {
        store: Arc<MemoryStore>,
        key: Option<&'static str>,
    }

    impl TestApp {
        fn new(key: Option<&'static str>) -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                key,
            }
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, String) {
            let state = AppState {
                store: self.store.clone(),
            };
            let response = router(state, self.key).oneshot(req).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }

        async fn get(&self, uri: &str) -> (StatusCode, String) {
            self.send(Request::get(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post(&self, uri: &str, body: &str) -> (StatusCode, String) {
            self.send(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }
    }

    #[tokio::test]
    async fn test_path_update_then_text_read() {
        let app = TestApp::new(None);

        let (status, body) = app.post("/update/counter/PollCount/2", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2");
        let (_, body) = app.post("/update/counter/PollCount/3", "").await;
        assert_eq!(body, "5");

        app.post("/update/gauge/Alloc/1.5", "").await;
        assert_eq!(app.get("/value/gauge/Alloc").await, (StatusCode::OK, "1.5".to_string()));
        assert_eq!(
            app.get("/value/counter/PollCount").await,
            (StatusCode::OK, "5".to_string())
        );
    }

    #[tokio::test]
    async fn test_path_update_rejects_bad_input() {
        let app = TestApp::new(None);

        let (status, _) = app.post("/update/histogram/X/1", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.post("/update/counter/X/1.5", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.post("/update/gauge/X/abc", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_value_read_errors() {
        let app = TestApp::new(None);
        app.store
            .save_metric(Metric::gauge("Alloc", 1.0).unwrap())
            .await
            .unwrap();

        let (status, _) = app.get("/value/histogram/Alloc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = app.get("/value/gauge/Missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("METRIC_NOT_FOUND"));
        // Kind mismatch reads as absent
        let (status, _) = app.get("/value/counter/Alloc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_json_update_and_value() {
        let app = TestApp::new(None);

        let (status, body) = app
            .post("/update", r#"{"id":"Hits","type":"counter","delta":4}"#)
            .await;
        assert_eq!(status, StatusCode::OK);
        let stored: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(stored, serde_json::json!({"id":"Hits","type":"counter","delta":4}));

        let (status, body) = app.post("/value", r#"{"id":"Hits","type":"counter"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let read: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(read["delta"], 4);

        let (status, _) = app.post("/value", r#"{"id":"Nope","type":"gauge"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.post("/value", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_json_update_rejects_invalid_metric() {
        let app = TestApp::new(None);
        let (status, body) = app
            .post("/update", r#"{"id":"X","type":"gauge","delta":1}"#)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("INVALID_JSON"));
    }

    #[tokio::test]
    async fn test_json_batch() {
        let app = TestApp::new(None);
        let (status, body) = app
            .post(
                "/updates",
                r#"[{"id":"Hits","type":"counter","delta":1},
                    {"id":"Load","type":"gauge","value":0.25},
                    {"id":"Hits","type":"counter","delta":2}]"#,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let stored: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2]["delta"], 3);
        assert_eq!(app.get("/value/counter/Hits").await.1, "3");
        assert_eq!(app.get("/value/gauge/Load").await.1, "0.25");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let app = TestApp::new(None);
        assert_eq!(app.post("/updates", "[]").await, (StatusCode::OK, "[]".to_string()));
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_html_list() {
        let app = TestApp::new(None);
        app.post("/update/gauge/Alloc/1", "").await;
        app.post("/update/counter/PollCount/1", "").await;

        let response = router(
            AppState {
                store: app.store.clone(),
            },
            None,
        )
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let (_, body) = app.get("/").await;
        let alloc = body.find("<li>Alloc</li>").unwrap();
        let poll = body.find("<li>PollCount</li>").unwrap();
        assert!(alloc < poll);
    }

    #[tokio::test]
    async fn test_health_ping_and_unknown_route() {
        let app = TestApp::new(None);

        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(health["status"], "ok");

        assert_eq!(app.get("/ping").await.0, StatusCode::OK);
        assert_eq!(app.get("/nope").await.0, StatusCode::NOT_FOUND);
        assert_eq!(app.post("/update/gauge/Alloc", "").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_signature_required_when_key_set() {
        let app = TestApp::new(Some("secret"));
        let body = r#"{"id":"Alloc","type":"gauge","value":2}"#;

        let (status, text) = app.post("/update", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("MISSING_SIGNATURE"));

        let forged = sign(b"other", body.as_bytes()).unwrap();
        let (status, text) = app
            .send(
                Request::post("/update")
                    .header(HASH_HEADER, forged)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("INVALID_SIGNATURE"));
        assert!(app.store.is_empty());

        let valid = sign(b"secret", body.as_bytes()).unwrap();
        let (status, _) = app
            .send(
                Request::post("/update")
                    .header(HASH_HEADER, valid)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        // Reads are not signed
        assert_eq!(app.get("/value/gauge/Alloc").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gzip_body_with_signature_over_plain_bytes() {
        let app = TestApp::new(Some("secret"));
        let body = r#"[{"id":"Hits","type":"counter","delta":7}]"#;
        let signature = sign(b"secret", body.as_bytes()).unwrap();

        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let (status, _) = app
            .send(
                Request::post("/updates")
                    .header(header::CONTENT_ENCODING, "gzip")
                    .header(HASH_HEADER, signature)
                    .body(Body::from(compressed))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.get("/value/counter/Hits").await.1, "7");
    }
}
