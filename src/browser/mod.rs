//! Browser automation abstraction for the publish adapters.
//!
//! Defines the `BrowserDriver` and `BrowserSession` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide), so
//! adapters can be exercised in tests without a real browser.

pub mod chromium;

pub use chromium::{find_chromium, ChromiumDriver};

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// A browser engine that can open fresh page sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a new page in its own tab.
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>>;

    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// One browser tab driven through a posting flow.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate and wait for the page to load.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Click the first element matching a CSS selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the first clickable element whose text matches `text`.
    async fn click_text(&self, text: &str) -> Result<()>;

    /// Focus an input matching the selector and type into it.
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// Attach a local file to a file input matching the selector.
    async fn upload_file(&self, selector: &str, file: &Path) -> Result<()>;

    /// Give the page time to react before the next step.
    async fn settle(&self, duration: Duration);

    /// The page's current URL.
    async fn current_url(&self) -> Result<String>;

    /// Close the tab.
    async fn close(self: Box<Self>) -> Result<()>;
}

impl std::fmt::Debug for dyn BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BrowserSession")
    }
}

/// A no-op driver used when Chromium is unavailable or automation is
/// disabled. Sessions cannot be opened, so every publish target fails with
/// a recorded outcome while the rest of the run proceeds.
pub struct NoopDriver;

#[async_trait]
impl BrowserDriver for NoopDriver {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>> {
        Err(anyhow::anyhow!(
            "Browser automation not available; publishing is disabled"
        ))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
