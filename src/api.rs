// src/api.rs

//! HTTP API over a [`CrawlController`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CrawlStats, RunState};
use crate::pipeline::CrawlController;

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Deserialize)]
struct StartRequest {
    seeds: Vec<String>,
    #[serde(default)]
    max_depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct StatsBody {
    #[serde(flatten)]
    stats: CrawlStats,
    state: RunState,
}

#[derive(Debug, Serialize)]
struct PagesBody {
    pages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// Routes for crawl control and page queries.
pub fn router(controller: Arc<CrawlController>) -> Router {
    Router::new()
        .route("/api/crawl/start", post(start_handler))
        .route("/api/crawl/stop", post(stop_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/pages", get(pages_handler).delete(clear_handler))
        .with_state(controller)
}

/// Serve the API on `bind` until the process is interrupted.
///
/// An active crawl is stopped before returning.
pub async fn serve(controller: Arc<CrawlController>, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| AppError::server(format!("invalid bind address {bind}: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::server(format!("failed to bind {addr}: {e}")))?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, router(Arc::clone(&controller)))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .map_err(|e| AppError::server(format!("server shutdown: {e}")))?;

    let stats = controller.stop().await;
    log::info!("Server stopped; last crawl fetched {} page(s)", stats.fetched);
    Ok(())
}

async fn start_handler(
    State(controller): State<Arc<CrawlController>>,
    Json(request): Json<StartRequest>,
) -> std::result::Result<Json<StatusBody>, ApiError> {
    let depth = request
        .max_depth
        .unwrap_or_else(|| controller.default_depth());
    controller
        .start(request.seeds, depth)
        .await
        .map_err(bad_request)?;
    Ok(Json(StatusBody { status: "started" }))
}

async fn stop_handler(State(controller): State<Arc<CrawlController>>) -> Json<CrawlStats> {
    Json(controller.stop().await)
}

async fn stats_handler(State(controller): State<Arc<CrawlController>>) -> Json<StatsBody> {
    Json(StatsBody {
        stats: controller.stats(),
        state: controller.state(),
    })
}

async fn pages_handler(
    State(controller): State<Arc<CrawlController>>,
    Query(query): Query<PagesQuery>,
) -> std::result::Result<Json<PagesBody>, ApiError> {
    let pages = controller.pages(&query.q).await.map_err(internal_error)?;
    Ok(Json(PagesBody { pages }))
}

async fn clear_handler(
    State(controller): State<Arc<CrawlController>>,
) -> std::result::Result<Json<StatusBody>, ApiError> {
    controller.clear_pages().await.map_err(internal_error)?;
    Ok(Json(StatusBody { status: "cleared" }))
}

fn bad_request(err: AppError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}

fn internal_error(err: AppError) -> ApiError {
    log::error!("API request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}
