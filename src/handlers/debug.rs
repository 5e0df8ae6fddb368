//! Debug endpoints for diagnosing recording pages and the browser setup.
//!
//! When the target site changes its markup, `GET /debug?url=...` shows what
//! the turn blocks look like now, so the selector lists can be updated without
//! attaching a debugger to a headless browser.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::extraction::inspector::BlockStructure;
use crate::extraction::PageState;
use crate::handlers::transcript::require_url;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InspectPageQuery {
    pub url: Option<String>,
    /// Overrides `debug.max_blocks` for this call.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct InspectPageResponse {
    pub success: bool,
    pub url: String,
    pub page_state: PageState,
    pub container_found: bool,
    pub block_count: usize,
    pub blocks: Vec<BlockStructure>,
    /// Where the rendered markup was written, when dumping is enabled.
    pub dumped_to: Option<String>,
    pub elapsed_ms: u64,
}

/// Render a page and describe its first turn blocks.
///
/// GET /debug?url=<recording url>&limit=3
pub async fn inspect_page(
    state: web::Data<AppState>,
    query: web::Query<InspectPageQuery>,
) -> AppResult<HttpResponse> {
    let start_time = std::time::Instant::now();
    let query = query.into_inner();
    let config = state.get_config();
    let url = require_url(query.url, &config)?;
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(config.debug.max_blocks);

    let extractor = state
        .extractor(&config)
        .map_err(|e| AppError::extraction(&url, e))?;

    let inspection = {
        let _slot = state.acquire_session_slot().await?;
        extractor
            .inspect(&url, limit)
            .await
            .map_err(|e| AppError::extraction(&url, e))?
    };

    let dumped_to = match &config.debug.dump_path {
        Some(path) => match tokio::fs::write(path, inspection.markup.as_bytes()).await {
            Ok(()) => {
                info!(path = %path, bytes = inspection.markup.len(), "Debug markup written");
                Some(path.clone())
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to write debug markup");
                None
            }
        },
        None => None,
    };

    Ok(HttpResponse::Ok().json(InspectPageResponse {
        success: true,
        url,
        page_state: inspection.page_state,
        container_found: inspection.report.container_found,
        block_count: inspection.report.block_count,
        blocks: inspection.report.blocks,
        dumped_to,
        elapsed_ms: start_time.elapsed().as_millis() as u64,
    }))
}

/// Browser-related environment, for checking a deployment.
///
/// GET /debug/environment
pub async fn debug_environment(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let config = state.get_config();
    let env_or = |name: &str| std::env::var(name).unwrap_or_else(|_| "not set".to_string());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "provisioner": state.provisioner.describe(),
        "browser": config.browser,
        "chrome_env": env_or("CHROME"),
        "http_proxy": env_or("HTTP_PROXY"),
        "https_proxy": env_or("HTTPS_PROXY"),
        "no_proxy": env_or("NO_PROXY"),
        "temp_dir": std::env::temp_dir().display().to_string(),
        "available_formats": ["legacy", "word_timing", "lines"],
    })))
}

pub fn configure_debug_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/debug")
            .route("", web::get().to(inspect_page))
            .route("/environment", web::get().to(debug_environment)),
    );
}
