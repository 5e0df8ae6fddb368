//! Transcript endpoints.
//!
//! `GET /transcript` returns the whole transcript of a recording;
//! `GET /transcript/filter` additionally narrows it by speaker and time range.
//! Both accept `format=legacy|word_timing|lines` (defaults to the configured preset).

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::extraction::{assemble, render, Extraction, Filter, OutputPreset};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    pub url: Option<String>,
    pub format: Option<String>,
}

/// Time bounds arrive as strings so that a malformed number produces our
/// failure envelope instead of actix's default query rejection.
#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub url: Option<String>,
    pub format: Option<String>,
    pub speaker: Option<String>,
    pub start_ms: Option<String>,
    pub end_ms: Option<String>,
}

pub async fn get_transcript(
    state: web::Data<AppState>,
    query: web::Query<TranscriptQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let config = state.get_config();
    let url = require_url(query.url, &config)?;
    let preset = resolve_format(query.format.as_deref(), &config)?;

    let filter = Filter::default();
    let extraction = run_extraction(&state, &config, &url, preset, &filter).await?;
    let assembled = assemble(extraction.entries, &filter);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "url": url,
        "format": preset,
        "transcript": render(&assembled.entries, preset),
        "total_lines": assembled.total_count,
        "speakers": assembled.speakers,
        "stats": {
            "total_blocks": extraction.total_blocks,
            "skipped_blocks": extraction.skipped_blocks,
            "elapsed_ms": extraction.elapsed_ms
        }
    })))
}

pub async fn filter_transcript(
    state: web::Data<AppState>,
    query: web::Query<FilterQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let config = state.get_config();
    let url = require_url(query.url, &config)?;
    let preset = resolve_format(query.format.as_deref(), &config)?;

    let filter = Filter {
        speaker: query.speaker.filter(|s| !s.trim().is_empty()),
        start_ms: parse_bound("start_ms", query.start_ms.as_deref())?,
        end_ms: parse_bound("end_ms", query.end_ms.as_deref())?,
    };

    let extraction = run_extraction(&state, &config, &url, preset, &filter).await?;
    let extracted = extraction.entries.len();
    let assembled = assemble(extraction.entries, &filter);

    info!(
        url = %url,
        extracted,
        matched = assembled.total_count,
        "Transcript filtered"
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "url": url,
        "format": preset,
        "transcript": render(&assembled.entries, preset),
        "total_lines": assembled.total_count,
        "speakers": assembled.speakers,
        "filters_applied": filter,
        "stats": {
            "total_blocks": extraction.total_blocks,
            "skipped_blocks": extraction.skipped_blocks,
            "extracted_lines": extracted,
            "elapsed_ms": extraction.elapsed_ms
        }
    })))
}

/// The recording URL, trimmed, after the precondition checks.
pub(crate) fn require_url(url: Option<String>, config: &AppConfig) -> AppResult<String> {
    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(AppError::MissingUrl)?;

    let marker = &config.extraction.required_url_marker;
    if !url.contains(marker.as_str()) {
        return Err(AppError::UnsupportedUrl {
            url,
            marker: marker.clone(),
        });
    }

    Ok(url)
}

fn resolve_format(format: Option<&str>, config: &AppConfig) -> AppResult<OutputPreset> {
    match format.map(str::trim).filter(|f| !f.is_empty()) {
        Some(name) => name.parse().map_err(AppError::BadRequest),
        None => Ok(config.extraction.preset),
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> AppResult<Option<u64>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(value) => value.parse::<u64>().map(Some).map_err(|_| {
            AppError::ValidationError(format!("{} must be a non-negative integer, got '{}'", name, value))
        }),
        None => Ok(None),
    }
}

/// Reserve a browser slot, extract, and count the outcome.
async fn run_extraction(
    state: &AppState,
    config: &AppConfig,
    url: &str,
    preset: OutputPreset,
    filter: &Filter,
) -> AppResult<Extraction> {
    let mut options = config.extraction.parser_options(preset);
    if filter.has_time_bounds() {
        options.millisecond_timing = true;
    }

    let extractor = state
        .extractor(config)
        .map_err(|e| AppError::extraction(url, e))?;

    let _slot = state.acquire_session_slot().await?;
    match extractor.extract(url, options).await {
        Ok(extraction) => {
            state.record_extraction_outcome("success");
            Ok(extraction)
        }
        Err(e) => {
            state.record_extraction_outcome(e.kind());
            Err(AppError::extraction(url, e))
        }
    }
}
