//! # Chromium Provisioner
//!
//! Launches a dedicated headless Chromium per extraction via `chromiumoxide`.
//! Every session gets its own throwaway profile directory so concurrent
//! launches never fight over the profile lock.

use crate::browser::{BrowserProvisioner, BrowserSession};
use crate::config::BrowserSettings;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SCROLL_TO_END_JS: &str = "window.scrollTo(0, document.body.scrollHeight);";
const OUTER_HTML_JS: &str = "document.documentElement.outerHTML";

pub struct ChromiumProvisioner {
    settings: BrowserSettings,
}

impl ChromiumProvisioner {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn launch_config(&self, profile_dir: &Path) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .window_size(self.settings.window_width, self.settings.window_height)
            .request_timeout(Duration::from_millis(self.settings.request_timeout_ms))
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }

        builder
            .build()
            .map_err(|e| anyhow!("invalid browser configuration: {}", e))
    }
}

#[async_trait]
impl BrowserProvisioner for ChromiumProvisioner {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
        let id = Uuid::new_v4();
        let profile_dir = std::env::temp_dir().join(format!("transcript-scraper-{}", id));
        let config = self.launch_config(&profile_dir)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The CDP handler must be polled for the browser connection to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Chromium handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                return Err(anyhow!("failed to open a browser tab: {}", e));
            }
        };

        info!(session = %id, headless = self.settings.headless, "Chromium session started");
        Ok(Box::new(ChromiumSession {
            id,
            browser,
            page,
            handler_task,
            profile_dir,
        }))
    }

    fn describe(&self) -> String {
        format!(
            "chromium (headless={}, no_sandbox={}, executable={})",
            self.settings.headless,
            self.settings.no_sandbox,
            self.settings.executable.as_deref().unwrap_or("auto-detect")
        )
    }
}

struct ChromiumSession {
    id: Uuid,
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(session = %self.id, url = %url, "Navigating");
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigation to {} failed", url))?;
        Ok(())
    }

    async fn markup(&mut self) -> Result<String> {
        // The live DOM via JS first; Page::content as a fallback.
        if let Ok(result) = self.page.evaluate(OUTER_HTML_JS).await {
            if let Ok(html) = result.into_value::<String>() {
                if !html.is_empty() {
                    return Ok(html);
                }
            }
        }
        self.page.content().await.context("failed to read page content")
    }

    async fn scroll_to_end(&mut self) -> Result<()> {
        self.page
            .evaluate(SCROLL_TO_END_JS)
            .await
            .context("scroll script failed")?;
        Ok(())
    }

    async fn terminate(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            id,
            mut browser,
            page,
            handler_task,
            profile_dir,
        } = *self;

        if let Err(e) = page.close().await {
            debug!(session = %id, error = %e, "Closing tab failed");
        }
        let closed = browser.close().await.map(|_| ()).context("browser close failed");
        let exited = browser.wait().await.map(|_| ()).context("waiting for browser exit failed");
        handler_task.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&profile_dir).await {
            warn!(session = %id, path = %profile_dir.display(), error = %e, "Failed to remove browser profile");
        }

        info!(session = %id, "Chromium session closed");
        closed.and(exited)
    }
}
