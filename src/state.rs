//! # Application State Management
//!
//! Shared state handed to every request handler through `web::Data<AppState>`.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc<RwLock<T>> Pattern
//! - **Arc**: many handlers (on many worker threads) hold the same state
//! - **RwLock**: many concurrent readers of the config, one writer on `PUT /config`
//!
//! ### Semaphore
//! - Each extraction launches a whole browser process, so the number of
//!   simultaneous extractions is capped with a `tokio::sync::Semaphore`
//! - Requests beyond the cap wait for a permit instead of failing
//!
//! ### RAII slots
//! - `SessionSlot` holds the permit and the active-session counter; dropping it
//!   (on success, error or cancellation) releases both

use crate::browser::BrowserProvisioner;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::extraction::{ExtractError, TranscriptExtractor};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration (extraction and debug sections can change at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Counters updated by the middleware and the handlers
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    /// Source of browser sessions; Chromium in production
    pub provisioner: Arc<dyn BrowserProvisioner>,

    /// One permit per browser allowed to run at the same time
    sessions: Arc<Semaphore>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("start_time", &self.start_time)
            .field("provisioner", &self.provisioner.describe())
            .field("available_sessions", &self.sessions.available_permits())
            .finish()
    }
}

/// Counters collected since server start.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed
    pub request_count: u64,

    /// Total number of 4xx/5xx responses
    pub error_count: u64,

    /// Browser sessions currently running
    pub active_sessions: u32,

    /// Requests currently waiting for a free browser slot
    pub queued_requests: u32,

    /// Per-endpoint statistics keyed by `"METHOD /path"`
    pub endpoint_metrics: HashMap<String, EndpointMetric>,

    /// Extraction results keyed by outcome (`success`, `expired`, `timed_out`, ...)
    pub extraction_outcomes: HashMap<String, u64>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

/// A reserved browser slot. Dropping it frees the slot.
pub struct SessionSlot {
    metrics: Arc<RwLock<AppMetrics>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions = metrics.active_sessions.saturating_sub(1);
    }
}

/// Counts a request as queued until it gets a slot or is cancelled.
struct QueuedRequest<'a> {
    metrics: &'a RwLock<AppMetrics>,
}

impl<'a> QueuedRequest<'a> {
    fn enter(metrics: &'a RwLock<AppMetrics>) -> Self {
        metrics.write().unwrap().queued_requests += 1;
        Self { metrics }
    }
}

impl Drop for QueuedRequest<'_> {
    fn drop(&mut self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.queued_requests = metrics.queued_requests.saturating_sub(1);
    }
}

impl AppState {
    pub fn new(config: AppConfig, provisioner: Arc<dyn BrowserProvisioner>) -> Self {
        let max_sessions = config.performance.max_concurrent_sessions;
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            provisioner,
            sessions: Arc::new(Semaphore::new(max_sessions)),
        }
    }

    /// Get a copy of the current configuration; the lock is released immediately.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration if it validates.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Build an extractor from the current extraction settings.
    pub fn extractor(&self, config: &AppConfig) -> Result<TranscriptExtractor, ExtractError> {
        TranscriptExtractor::new(Arc::clone(&self.provisioner), config.extraction.readiness())
    }

    /// Wait for a free browser slot.
    pub async fn acquire_session_slot(&self) -> Result<SessionSlot, AppError> {
        let queued = QueuedRequest::enter(&self.metrics);
        let permit = Arc::clone(&self.sessions)
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Browser session pool is closed".to_string()))?;
        drop(queued);

        self.metrics.write().unwrap().active_sessions += 1;
        Ok(SessionSlot {
            metrics: Arc::clone(&self.metrics),
            _permit: permit,
        })
    }

    pub fn available_session_slots(&self) -> usize {
        self.sessions.available_permits()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Count one extraction result: `"success"` or an `ExtractError::kind()`.
    pub fn record_extraction_outcome(&self, outcome: &str) {
        let mut metrics = self.metrics.write().unwrap();
        *metrics.extraction_outcomes.entry(outcome.to_string()).or_default() += 1;
    }

    /// Consistent copy of the metrics, taken under a single read lock.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of failed requests, from 0.0 to 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedProvisioner;
    use std::time::Duration;

    fn state_with_sessions(max: usize) -> AppState {
        let mut config = AppConfig::default();
        config.performance.max_concurrent_sessions = max;
        AppState::new(config, Arc::new(ScriptedProvisioner::new()))
    }

    #[tokio::test]
    async fn test_slot_tracks_active_sessions() {
        let state = state_with_sessions(2);

        let slot = state.acquire_session_slot().await.unwrap();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 1);
        assert_eq!(state.available_session_slots(), 1);

        drop(slot);
        assert_eq!(state.get_metrics_snapshot().active_sessions, 0);
        assert_eq!(state.available_session_slots(), 2);
    }

    #[tokio::test]
    async fn test_requests_beyond_cap_wait() {
        let state = state_with_sessions(1);
        let held = state.acquire_session_slot().await.unwrap();

        let waiting = tokio::time::timeout(Duration::from_millis(20), state.acquire_session_slot()).await;
        assert!(waiting.is_err());

        drop(held);
        let slot = tokio::time::timeout(Duration::from_millis(20), state.acquire_session_slot()).await;
        assert!(slot.is_ok());
        assert_eq!(state.get_metrics_snapshot().queued_requests, 0);
    }

    #[test]
    fn test_extraction_outcomes() {
        let state = state_with_sessions(1);
        state.record_extraction_outcome("success");
        state.record_extraction_outcome("success");
        state.record_extraction_outcome("expired");

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.extraction_outcomes.get("success"), Some(&2));
        assert_eq!(metrics.extraction_outcomes.get("expired"), Some(&1));
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = state_with_sessions(1);
        state.record_endpoint_request("GET /transcript", 100, false);
        state.record_endpoint_request("GET /transcript", 300, true);

        let metrics = state.get_metrics_snapshot();
        let endpoint = &metrics.endpoint_metrics["GET /transcript"];
        assert_eq!(endpoint.average_duration_ms(), 200.0);
        assert_eq!(endpoint.error_rate(), 0.5);
    }

    #[test]
    fn test_invalid_config_update_is_rejected() {
        let state = state_with_sessions(1);
        let mut config = state.get_config();
        config.extraction.ready_timeout_ms = 0;

        assert!(state.update_config(config).is_err());
        assert_eq!(state.get_config().extraction.ready_timeout_ms, 20_000);
    }
}
