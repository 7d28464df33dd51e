//! Local authoring server: the file-backed slide API plus static serving of
//! the `presentations/` tree.

pub mod error;
pub mod files;
pub mod handlers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use files::PresentationFiles;

/// Ports tried after the configured one is taken.
const MAX_PORT_ATTEMPTS: u16 = 10;

#[derive(Clone)]
pub struct DevState {
    pub files: Arc<PresentationFiles>,
}

pub struct DevServer {
    root: PathBuf,
    site_dir: Option<PathBuf>,
    host: String,
    port: u16,
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>, host: impl Into<String>, port: u16) -> Self {
        Self {
            root: root.into(),
            site_dir: None,
            host: host.into(),
            port,
        }
    }

    /// Serves a built site for everything outside the API and
    /// `presentations/`, with `index.html` as the fallback for deep links.
    pub fn with_site_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.site_dir = Some(dir.into());
        self
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let files = PresentationFiles::new(&self.root);
        files.prepare();
        let app = router(
            DevState {
                files: Arc::new(files),
            },
            self.site_dir.as_deref(),
        );

        let listener = bind_with_retry(&self.host, self.port).await?;
        let addr = listener.local_addr()?;
        tracing::info!("Serving {} on http://{addr}", self.root.display());
        println!("pptdeck dev server listening on http://{addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Could not listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
                tracing::info!("Shutting down dev server");
            })
            .await?;
        Ok(())
    }
}

pub fn router(state: DevState, site_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let presentations = ServeDir::new(state.files.presentations_dir());

    let api = Router::new()
        .route("/slides/create", post(handlers::create_slide))
        .route("/slides/duplicate", post(handlers::duplicate_slide))
        .route("/slides/reorder", post(handlers::reorder_slides))
        .route("/slides/delete", post(handlers::delete_slide))
        .route("/slides/save", post(handlers::save_slide))
        .route("/presentations/create", post(handlers::create_presentation))
        .route("/config/save", post(handlers::save_config));

    let mut app = Router::new()
        .nest("/api", api)
        .route("/healthz", get(handlers::healthz))
        .nest_service("/presentations", presentations);

    if let Some(site) = site_dir {
        let spa = ServeDir::new(site).fallback(ServeFile::new(site.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `host` (a name or an IP literal, brackets optional) on the first free
/// port from `base_port`.
async fn bind_with_retry(host: &str, base_port: u16) -> anyhow::Result<TcpListener> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let mut last_error = None;
    for attempt in 0..MAX_PORT_ATTEMPTS {
        let Some(port) = base_port.checked_add(attempt) else {
            break;
        };
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                if attempt > 0 {
                    tracing::warn!("Port {base_port} unavailable, using {port}");
                }
                return Ok(listener);
            }
            Err(e) => {
                tracing::debug!("{host}:{port} unavailable: {e}");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(anyhow::anyhow!(
            "No free port in {base_port}..{}: {e}",
            base_port.saturating_add(MAX_PORT_ATTEMPTS)
        )),
        None => anyhow::bail!("No usable port from {base_port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn setup() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let files = PresentationFiles::new(dir.path());
        files.prepare();
        let app = router(
            DevState {
                files: Arc::new(files),
            },
            None,
        );
        (dir, app)
    }

    async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_create_then_serve_slide() {
        let (_dir, app) = setup();
        let (status, body) = post_json(
            &app,
            "/api/slides/create",
            r#"{"group":"demo","file":"intro.html","title":"Hello"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["slide"]["title"], "Hello");

        let (status, html) = get(&app, "/presentations/demo/slides/intro.html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<h1>Hello</h1>"));

        let (status, config) = get(&app, "/presentations/demo/slides.config.json").await;
        assert_eq!(status, StatusCode::OK);
        let config: Value = serde_json::from_str(&config).unwrap();
        assert_eq!(config["slides"][0]["file"], "intro.html");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (_dir, app) = setup();
        let (status, body) = post_json(&app, "/api/slides/create", r#"{"file":"x.txt"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"ok": false, "error": "Invalid filename"}));

        let (status, _) =
            post_json(&app, "/api/slides/duplicate", r#"{"sourceFile":"ghost.html"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = post_json(&app, "/api/slides/reorder", "garbage").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid indices");

        let (status, body) =
            post_json(&app, "/api/slides/reorder", r#"{"from":0,"to":0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Index out of range");

        let (status, _) =
            post_json(&app, "/api/presentations/create", r#"{"group":"a b"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(&app, "/api/config/save", r#"{"config":{}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing group");
    }

    #[tokio::test]
    async fn test_presentation_lifecycle() {
        let (_dir, app) = setup();
        let (status, body) = post_json(
            &app,
            "/api/presentations/create",
            r#"{"group":"q3","title":"Q3","description":"Numbers"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["group"], "q3");
        assert_eq!(body["config"]["title"], "Q3");
        assert!(body["paths"]["configPath"].as_str().unwrap().ends_with("slides.config.json"));

        for file in ["a.html", "b.html"] {
            let payload = json!({"group": "q3", "file": file}).to_string();
            post_json(&app, "/api/slides/create", &payload).await;
        }
        let (status, _) = post_json(
            &app,
            "/api/slides/reorder",
            r#"{"group":"q3","from":"1","to":0}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) =
            post_json(&app, "/api/slides/delete", r#"{"group":"q3","file":"a.html"}"#).await;
        assert_eq!(body["ok"], true);
        let (status, _) = get(&app, "/presentations/q3/slides/a.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = post_json(
            &app,
            "/api/slides/save",
            r#"{"group":"q3","file":"b.html","html":"<p>new</p>"}"#,
        )
        .await;
        assert_eq!(body["ok"], true);
        let (_, html) = get(&app, "/presentations/q3/slides/b.html").await;
        assert_eq!(html, "<p>new</p>");
    }

    #[tokio::test]
    async fn test_healthz_and_traversal() {
        let (_dir, app) = setup();
        let (status, body) = get(&app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));

        let (status, _) = get(&app, "/presentations/../Cargo.toml").await;
        assert_ne!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_site_fallback_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("dist");
        std::fs::create_dir_all(&site).unwrap();
        std::fs::write(site.join("index.html"), "<div id=app></div>").unwrap();
        let files = PresentationFiles::new(dir.path());
        files.prepare();
        let app = router(
            DevState {
                files: Arc::new(files),
            },
            Some(&site),
        );

        let (status, body) = get(&app, "/demo?slide=2").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("id=app"));
    }

    #[tokio::test]
    async fn test_bind_accepts_names_and_ipv6_literals() {
        let listener = bind_with_retry("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());

        let listener = bind_with_retry("127.0.0.1", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().port() > 0);

        // Hosts without IPv6 may refuse the bind, but never the address.
        for host in ["::1", "[::1]"] {
            if let Err(e) = bind_with_retry(host, 0).await {
                assert!(!e.to_string().contains("syntax"), "{host}: {e}");
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_slides_is_server_error() {
        let (dir, app) = setup();
        let (status, _) = post_json(
            &app,
            "/api/config/save",
            r#"{"group":"demo","config":{"title":"Demo","slides":{}}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_json(
            &app,
            "/api/slides/create",
            r#"{"group":"demo","file":"a.html"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);

        let saved = std::fs::read_to_string(dir.path().join("presentations/demo/slides.config.json")).unwrap();
        let saved: Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved["slides"], json!({}));
    }
}
