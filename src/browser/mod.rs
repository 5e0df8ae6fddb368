//! # Browser Provisioning
//!
//! Abstraction over the headless browser that renders recording pages. The
//! extraction engine only needs to navigate, read the rendered markup and
//! terminate the session, so that is all the traits expose.
//!
//! ## Key Components:
//! - **BrowserProvisioner**: creates one isolated session per extraction call
//! - **BrowserSession**: a single page in a running browser
//! - **SessionGuard**: scoped ownership of a session, terminated on release or drop
//!
//! ## Rust Concepts:
//! - **async_trait**: async methods in traits used as `dyn` objects
//! - **Drop**: runs when the guard goes out of scope, including when a request
//!   future is cancelled halfway through an extraction

pub mod chromium;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

pub use chromium::ChromiumProvisioner;

/// Produces fresh, fully isolated browser sessions. Sessions are never pooled.
#[async_trait]
pub trait BrowserProvisioner: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>>;

    /// Short human-readable description for health output.
    fn describe(&self) -> String;
}

/// One navigable page in a running browser.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Current rendered markup of the page.
    async fn markup(&mut self) -> Result<String>;

    /// Scroll to the bottom of the page to trigger lazy loading.
    async fn scroll_to_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Shut the browser down and release its resources.
    async fn terminate(self: Box<Self>) -> Result<()>;
}

/// Owns a session for the duration of one extraction.
///
/// Call `release()` on every normal path. If the guard is dropped without
/// being released (panic, cancelled request future), termination is spawned
/// on the Tokio runtime instead.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    label: String,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>, label: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            label: label.into(),
        }
    }

    /// Terminate the session. Termination failures are logged, never returned.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            match session.terminate().await {
                Ok(()) => debug!(session = %self.label, "Browser session terminated"),
                Err(e) => warn!(session = %self.label, error = %e, "Browser session termination failed"),
            }
        }
    }

    fn active(&mut self) -> Result<&mut Box<dyn BrowserSession>> {
        self.session
            .as_mut()
            .ok_or_else(|| anyhow!("browser session {} already released", self.label))
    }
}

#[async_trait]
impl BrowserSession for SessionGuard {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.active()?.navigate(url).await
    }

    async fn markup(&mut self) -> Result<String> {
        self.active()?.markup().await
    }

    async fn scroll_to_end(&mut self) -> Result<()> {
        self.active()?.scroll_to_end().await
    }

    async fn terminate(self: Box<Self>) -> Result<()> {
        (*self).release().await;
        Ok(())
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let label = std::mem::take(&mut self.label);
        warn!(session = %label, "Browser session dropped without release, terminating in background");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.terminate().await {
                        warn!(session = %label, error = %e, "Background termination failed");
                    }
                });
            }
            Err(_) => warn!(session = %label, "No async runtime available, browser process may leak"),
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted in-memory browser used by the extraction and handler tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a fixed sequence of snapshots; the last one repeats forever.
    pub struct ScriptedSession {
        snapshots: Vec<String>,
        pages: HashMap<String, Vec<String>>,
        cursor: usize,
        fail_navigation: bool,
        scrolls: usize,
        terminated: Arc<AtomicUsize>,
    }

    impl ScriptedSession {
        pub fn new(snapshots: Vec<String>) -> Self {
            Self {
                snapshots,
                pages: HashMap::new(),
                cursor: 0,
                fail_navigation: false,
                scrolls: 0,
                terminated: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn failing_navigation() -> Self {
            Self {
                fail_navigation: true,
                ..Self::new(Vec::new())
            }
        }

        pub fn snapshots_taken(&self) -> usize {
            self.cursor
        }

        pub fn scrolls(&self) -> usize {
            self.scrolls
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            if self.fail_navigation {
                return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED"));
            }
            if let Some(snapshots) = self.pages.get(url) {
                self.snapshots = snapshots.clone();
            } else if !self.pages.is_empty() {
                return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {}", url));
            }
            Ok(())
        }

        async fn markup(&mut self) -> Result<String> {
            let snapshot = self
                .snapshots
                .get(self.cursor.min(self.snapshots.len().saturating_sub(1)))
                .cloned()
                .ok_or_else(|| anyhow!("page has no content"))?;
            self.cursor += 1;
            Ok(snapshot)
        }

        async fn scroll_to_end(&mut self) -> Result<()> {
            self.scrolls += 1;
            Ok(())
        }

        async fn terminate(self: Box<Self>) -> Result<()> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Hands out `ScriptedSession`s serving the registered pages by URL.
    #[derive(Clone, Default)]
    pub struct ScriptedProvisioner {
        pages: HashMap<String, Vec<String>>,
        fail_open: bool,
        pub opened: Arc<AtomicUsize>,
        pub terminated: Arc<AtomicUsize>,
    }

    impl ScriptedProvisioner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn unavailable() -> Self {
            Self {
                fail_open: true,
                ..Self::default()
            }
        }

        pub fn with_page(mut self, url: &str, snapshots: &[&str]) -> Self {
            self.pages
                .insert(url.to_string(), snapshots.iter().map(|s| s.to_string()).collect());
            self
        }

        pub fn opened_count(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn terminated_count(&self) -> usize {
            self.terminated.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrowserProvisioner for ScriptedProvisioner {
        async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
            if self.fail_open {
                return Err(anyhow!("Chrome executable not found"));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                pages: self.pages.clone(),
                terminated: Arc::clone(&self.terminated),
                ..ScriptedSession::new(Vec::new())
            }))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }
}
