use crate::config::AppConfig;
use crate::state::{AppMetrics, AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::process;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    let memory_info = get_memory_info();
    let system_status = get_system_status(&config, &metrics);

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": ratio(metrics.error_count, metrics.request_count),
            "active_sessions": metrics.active_sessions,
            "queued_requests": metrics.queued_requests
        },
        "memory": memory_info,
        "browser": {
            "provisioner": state.provisioner.describe(),
            "headless": config.browser.headless,
            "available_slots": state.available_session_slots(),
            "max_sessions": config.performance.max_concurrent_sessions
        },
        "extraction": {
            "default_format": config.extraction.preset,
            "ready_timeout_ms": config.extraction.ready_timeout_ms,
            "outcomes": metrics.extraction_outcomes
        },
        "system": system_status
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();
    let config = state.get_config();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    let extractions: u64 = metrics.extraction_outcomes.values().sum();
    let successes = metrics.extraction_outcomes.get("success").copied().unwrap_or(0);

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": ratio(metrics.error_count, metrics.request_count),
            "active_sessions": metrics.active_sessions,
            "queued_requests": metrics.queued_requests,
            "requests_per_second": ratio(metrics.request_count, uptime_seconds)
        },
        "extractions": {
            "total": extractions,
            "success_rate": ratio(successes, extractions),
            "outcomes": metrics.extraction_outcomes
        },
        "endpoints": endpoint_stats,
        "memory": get_memory_info(),
        "performance": {
            "max_concurrent_sessions": config.performance.max_concurrent_sessions,
            "available_slots": state.available_session_slots()
        }
    }))
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

fn get_memory_info() -> serde_json::Value {
    let pid = process::id();

    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", pid)) {
            let mut vm_rss = 0;
            let mut vm_size = 0;

            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        vm_rss = kb_str.parse::<u64>().unwrap_or(0) * 1024;
                    }
                } else if line.starts_with("VmSize:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        vm_size = kb_str.parse::<u64>().unwrap_or(0) * 1024;
                    }
                }
            }

            // Browsers run as child processes and are not included here.
            return json!({
                "resident_memory_bytes": vm_rss,
                "virtual_memory_bytes": vm_size,
                "available": true
            });
        }
    }

    let _ = pid;
    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false,
        "note": "Memory info not available on this platform"
    })
}

fn get_system_status(config: &AppConfig, metrics: &AppMetrics) -> serde_json::Value {
    let session_usage = ratio(
        metrics.active_sessions as u64,
        config.performance.max_concurrent_sessions as u64,
    );

    let status = if metrics.queued_requests > 0 {
        "saturated"
    } else if session_usage > 0.7 {
        "moderate_load"
    } else {
        "normal"
    };

    let mut load_warnings = Vec::new();
    if metrics.queued_requests > 0 {
        load_warnings.push("Requests are waiting for a browser slot - consider increasing max_concurrent_sessions");
    }

    json!({
        "status": status,
        "session_usage_percent": (session_usage * 100.0).round(),
        "max_sessions": config.performance.max_concurrent_sessions,
        "current_sessions": metrics.active_sessions,
        "load_warnings": load_warnings
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedProvisioner;
    use actix_web::{test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health_reports_browser_and_outcomes() {
        let state = AppState::new(AppConfig::default(), Arc::new(ScriptedProvisioner::new()));
        state.record_extraction_outcome("success");

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["browser"]["provisioner"], "scripted");
        assert_eq!(body["browser"]["available_slots"], 4);
        assert_eq!(body["extraction"]["default_format"], "word_timing");
        assert_eq!(body["extraction"]["outcomes"]["success"], 1);
        assert_eq!(body["system"]["status"], "normal");
    }

    #[actix_web::test]
    async fn test_metrics_success_rate() {
        let state = AppState::new(AppConfig::default(), Arc::new(ScriptedProvisioner::new()));
        state.record_extraction_outcome("success");
        state.record_extraction_outcome("timed_out");

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/metrics", web::get().to(detailed_metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["extractions"]["total"], 2);
        assert_eq!(body["extractions"]["success_rate"], 0.5);
    }
}
