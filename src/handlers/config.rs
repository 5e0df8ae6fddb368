use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config
    })))
}

/// Partial runtime update of the `extraction` and `debug` sections.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    tracing::info!(
        preset = %current_config.extraction.preset,
        ready_timeout_ms = current_config.extraction.ready_timeout_ms,
        "Configuration updated"
    );

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": current_config
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedProvisioner;
    use crate::config::AppConfig;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    macro_rules! config_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .route("/config", web::get().to(get_config))
                    .route("/config", web::put().to(update_config)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_update_extraction_settings() {
        let state = AppState::new(AppConfig::default(), Arc::new(ScriptedProvisioner::new()));
        let app = config_app!(state.clone());

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"extraction": {"preset": "lines", "ready_timeout_ms": 45000}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let config = state.get_config();
        assert_eq!(config.extraction.ready_timeout_ms, 45_000);
        assert_eq!(config.extraction.preset.as_str(), "lines");

        let req = test::TestRequest::get().uri("/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["config"]["extraction"]["preset"], "lines");
    }

    #[actix_web::test]
    async fn test_invalid_update_is_rejected() {
        let state = AppState::new(AppConfig::default(), Arc::new(ScriptedProvisioner::new()));
        let app = config_app!(state.clone());

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"extraction": {"poll_interval_ms": 0}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.get_config().extraction.poll_interval_ms, 500);
    }
}
