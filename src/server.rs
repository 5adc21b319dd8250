use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    controller::ScanController,
    types::{ProbeOutcome, RunState, ScanEvent, ScanOptions, ScanReport, ScanSummary},
    wordlist::{self, WordlistSource},
};

/// Log lines retained for the UI; older lines are discarded.
const LOG_BACKLOG: usize = 200;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<ServerState>>, // shared mutable state for progress/results
}

struct ServerState {
    status: Status,
    results: Vec<ProbeOutcome>,
    logs: Vec<String>,
    controller: Option<Arc<ScanController>>,
    /// Bumped whenever a new run replaces the current one; event-consumer
    /// tasks from superseded runs see the mismatch and stop writing.
    run_gen: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub total: u64,
    pub processed: u64,
    pub hits: u64,
    pub state: RunState,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub target: String,
    /// Inline wordlist lines. Falls back to `wordlist_path`, then to the
    /// built-in default list.
    #[serde(default)]
    pub wordlist: Vec<String>,
    #[serde(default)]
    pub wordlist_path: Option<String>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub insecure_tls: bool,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub detect_sensitive: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Build the control API router with a fresh application state.
pub fn router() -> Router {
    let state = AppState {
        inner: Arc::new(RwLock::new(ServerState {
            status: Status {
                total: 0,
                processed: 0,
                hits: 0,
                state: RunState::Idle,
            },
            results: Vec::new(),
            logs: Vec::new(),
            controller: None,
            run_gen: 0,
        })),
    };

    let api = Router::new()
        .route("/status", get(get_status))
        .route("/scan", post(post_scan))
        .route("/stop", post(post_stop))
        .route("/results", get(get_results))
        .route("/logs", get(get_logs))
        .with_state(state);

    Router::new().nest("/api", api)
}

pub async fn spawn_server(bind: &str) -> Result<()> {
    let app = router();
    println!("Serving control API on http://{}", bind);
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    (StatusCode::OK, Json(s.status.clone()))
}

async fn get_results(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    let report = ScanReport {
        summary: ScanSummary {
            scanned_total: s.status.total,
            scanned_done: s.status.processed,
            hit_count: s.status.hits,
        },
        entries: s.results.clone(),
    };
    (StatusCode::OK, Json(report))
}

async fn get_logs(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    (StatusCode::OK, Json(s.logs.clone()))
}

async fn post_stop(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    match s.controller.as_ref() {
        Some(ctl) => {
            ctl.stop();
            StatusCode::ACCEPTED
        }
        None => StatusCode::CONFLICT,
    }
}

async fn post_scan(State(app): State<AppState>, Json(req): Json<ScanRequest>) -> impl IntoResponse {
    let options = ScanOptions {
        threads: req.threads.unwrap_or(10),
        timeout: Duration::from_secs_f64(req.timeout_secs.unwrap_or(5.0)),
        insecure_tls: req.insecure_tls,
        extensions: req.extensions,
        detect_sensitive: req.detect_sensitive,
        verbose: req.verbose,
    };
    let source = if !req.wordlist.is_empty() {
        WordlistSource::Inline(req.wordlist)
    } else if let Some(path) = req.wordlist_path {
        WordlistSource::FilePath(path.into())
    } else {
        WordlistSource::Inline(wordlist::default_wordlist().lines().map(Into::into).collect())
    };

    let (controller, mut events) = ScanController::new();
    let controller = Arc::new(controller);

    // Replace any previous run; a controller is single-use. The bumped
    // generation detaches the superseded run's event consumer.
    let my_gen;
    {
        let mut s = app.inner.write().await;
        if let Some(prev) = s.controller.take() {
            prev.stop();
        }
        s.run_gen += 1;
        my_gen = s.run_gen;
        s.status = Status {
            total: 0,
            processed: 0,
            hits: 0,
            state: RunState::Running,
        };
        s.results.clear();
        s.logs.clear();
        s.controller = Some(controller.clone());
    }

    if let Err(e) = controller.start(&req.target, source, options) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    // Consume the event stream into the shared state for the UI to poll.
    let app2 = app.clone();
    tokio::spawn(async move {
        while let Some(ev) = events.recv().await {
            let mut s = app2.inner.write().await;
            if s.run_gen != my_gen {
                // A newer run owns the shared state now; drop stragglers.
                break;
            }
            match ev {
                ScanEvent::Log { message } => {
                    s.logs.push(message);
                    if s.logs.len() > LOG_BACKLOG {
                        let excess = s.logs.len() - LOG_BACKLOG;
                        s.logs.drain(..excess);
                    }
                }
                ScanEvent::Progress { processed, total } => {
                    s.status.processed = processed;
                    s.status.total = total;
                }
                ScanEvent::Result { outcome } => {
                    s.status.hits += 1;
                    s.results.push(outcome);
                }
                ScanEvent::Finished => {
                    s.status.state = RunState::Completed;
                    break;
                }
            }
        }
    });

    let s = app.inner.read().await;
    (StatusCode::ACCEPTED, Json(s.status.clone())).into_response()
}
