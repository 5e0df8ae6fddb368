//! # Configuration Management
//!
//! Loads the scraper's settings from layered sources:
//! - Default values (built into the code)
//! - `config.toml` (optional)
//! - Environment variables with the `APP_` prefix, nested with `__`
//!   (e.g. `APP_EXTRACTION__READY_TIMEOUT_MS=30000`)
//! - `HOST` / `PORT`, as set by most deployment platforms
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: the same structs are read from TOML/env and served as JSON on `GET /config`
//! - **impl Default**: documents every default in one place
//! - **Conversion methods**: config sections turn themselves into the engine's
//!   runtime types (`ReadinessSettings`, `ParserOptions`)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT`
//! 2. `APP_*` environment variables
//! 3. Configuration file (config.toml)
//! 4. Default values

use crate::extraction::{OutputPreset, ParserOptions, ReadinessSettings};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Main application configuration.
///
/// Only `extraction` and `debug` can change at runtime (`PUT /config`);
/// the other sections are read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub browser: BrowserSettings,
    pub extraction: ExtractionConfig,
    pub performance: PerformanceConfig,
    pub debug: DebugConfig,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Launch options for the headless browser.
///
/// ## Fields:
/// - `headless`: run without a window (turn off only for local debugging)
/// - `no_sandbox`: required when running as root inside most containers
/// - `window_width` / `window_height`: viewport used for rendering the page
/// - `executable`: explicit Chrome/Chromium path; auto-detected when absent
/// - `request_timeout_ms`: per-CDP-request timeout, including navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    pub headless: bool,
    pub no_sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub executable: Option<String>,
    pub request_timeout_ms: u64,
}

/// Transcript extraction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Output shape used when a request does not pass `format`.
    pub preset: OutputPreset,
    pub initial_settle_ms: u64,
    pub final_settle_ms: u64,
    /// How long to wait for the transcript container before giving up.
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Substring every requested URL must contain.
    pub required_url_marker: String,
    /// Overrides the preset's speaker/timestamp split when set.
    pub split_speaker_timestamp: Option<bool>,
    pub numbered_unknown_speakers: bool,
    pub scroll_before_snapshot: bool,
}

/// Resource limits.
///
/// Every extraction runs its own browser process, so `max_concurrent_sessions`
/// is effectively a cap on Chromium processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub max_concurrent_sessions: usize,
}

/// Settings for the `/debug` diagnostic endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// How many turn blocks to describe.
    pub max_blocks: usize,
    /// When set, the rendered markup of each `/debug` call is written here.
    pub dump_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            browser: BrowserSettings {
                headless: true,
                no_sandbox: true,
                window_width: 1920,
                window_height: 1080,
                executable: None,
                request_timeout_ms: 30_000,
            },
            extraction: ExtractionConfig {
                preset: OutputPreset::WordTiming,
                initial_settle_ms: 2_000,
                final_settle_ms: 3_000,
                ready_timeout_ms: 20_000,
                poll_interval_ms: 500,
                required_url_marker: "gong.io".to_string(),
                split_speaker_timestamp: None,
                numbered_unknown_speakers: false,
                scroll_before_snapshot: true,
            },
            performance: PerformanceConfig {
                max_concurrent_sessions: 4,
            },
            debug: DebugConfig {
                max_blocks: 3,
                dump_path: None,
            },
        }
    }
}

impl ExtractionConfig {
    /// Timing knobs for the readiness detector.
    pub fn readiness(&self) -> ReadinessSettings {
        ReadinessSettings {
            initial_settle: Duration::from_millis(self.initial_settle_ms),
            final_settle: Duration::from_millis(self.final_settle_ms),
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            scroll_before_snapshot: self.scroll_before_snapshot,
        }
    }

    /// Parser options for `preset` with the configured overrides applied.
    pub fn parser_options(&self, preset: OutputPreset) -> ParserOptions {
        let mut options = ParserOptions::for_preset(preset);
        if let Some(split) = self.split_speaker_timestamp {
            options.split_speaker_timestamp = split;
        }
        options.numbered_unknown_speakers = self.numbered_unknown_speakers;
        options
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=8080`
    /// - `APP_BROWSER__EXECUTABLE=/usr/bin/chromium`
    /// - `APP_EXTRACTION__PRESET=lines`
    /// - `PORT=8080`: special case for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject values that would make the service unusable.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port cannot be 0"));
        }

        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(anyhow!("Browser window size must be non-zero"));
        }

        if self.browser.request_timeout_ms == 0 {
            return Err(anyhow!("Browser request timeout must be greater than 0"));
        }

        let extraction = &self.extraction;
        if extraction.ready_timeout_ms == 0 {
            return Err(anyhow!("Ready timeout must be greater than 0"));
        }

        if extraction.poll_interval_ms == 0 {
            return Err(anyhow!("Poll interval must be greater than 0"));
        }

        if extraction.poll_interval_ms > extraction.ready_timeout_ms {
            return Err(anyhow!(
                "Poll interval ({}ms) cannot exceed the ready timeout ({}ms)",
                extraction.poll_interval_ms,
                extraction.ready_timeout_ms
            ));
        }

        if extraction.required_url_marker.trim().is_empty() {
            return Err(anyhow!("Required URL marker cannot be empty"));
        }

        if self.performance.max_concurrent_sessions == 0 {
            return Err(anyhow!("Max concurrent sessions must be greater than 0"));
        }

        if self.debug.max_blocks == 0 {
            return Err(anyhow!("Debug max_blocks must be greater than 0"));
        }

        Ok(())
    }

    /// Apply a partial JSON update, e.g. `{"extraction": {"ready_timeout_ms": 30000}}`.
    ///
    /// Unknown keys are ignored. Server, browser and performance settings are
    /// fixed at startup and cannot be changed here.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        for fixed in ["server", "browser", "performance"] {
            if partial_config.get(fixed).is_some() {
                return Err(anyhow!("The '{}' section cannot be changed at runtime", fixed));
            }
        }

        if let Some(extraction) = partial_config.get("extraction") {
            let target = &mut self.extraction;

            if let Some(preset) = extraction.get("preset").and_then(|v| v.as_str()) {
                target.preset = preset.parse().map_err(|e: String| anyhow!(e))?;
            }
            if let Some(ms) = extraction.get("initial_settle_ms").and_then(|v| v.as_u64()) {
                target.initial_settle_ms = ms;
            }
            if let Some(ms) = extraction.get("final_settle_ms").and_then(|v| v.as_u64()) {
                target.final_settle_ms = ms;
            }
            if let Some(ms) = extraction.get("ready_timeout_ms").and_then(|v| v.as_u64()) {
                target.ready_timeout_ms = ms;
            }
            if let Some(ms) = extraction.get("poll_interval_ms").and_then(|v| v.as_u64()) {
                target.poll_interval_ms = ms;
            }
            if let Some(marker) = extraction.get("required_url_marker").and_then(|v| v.as_str()) {
                target.required_url_marker = marker.to_string();
            }
            if let Some(split) = extraction.get("split_speaker_timestamp") {
                // `null` clears the override and falls back to the preset.
                target.split_speaker_timestamp = split.as_bool();
            }
            if let Some(numbered) = extraction.get("numbered_unknown_speakers").and_then(|v| v.as_bool()) {
                target.numbered_unknown_speakers = numbered;
            }
            if let Some(scroll) = extraction.get("scroll_before_snapshot").and_then(|v| v.as_bool()) {
                target.scroll_before_snapshot = scroll;
            }
        }

        if let Some(debug) = partial_config.get("debug") {
            if let Some(max_blocks) = debug.get("max_blocks").and_then(|v| v.as_u64()) {
                self.debug.max_blocks = max_blocks as usize;
            }
            if let Some(path) = debug.get("dump_path") {
                self.debug.dump_path = path.as_str().map(str::to_string);
            }
        }

        self.validate()?;
        Ok(())
    }
}
