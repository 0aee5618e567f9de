//! Chromium-based driver using chromiumoxide.

use super::{BrowserDriver, BrowserSession};
use crate::config::AutomationConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for the Chromium binary.
const CHROMIUM_PATH_ENV: &str = "REELCAST_CHROMIUM_PATH";

/// Find the Chromium binary path.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    // 1. REELCAST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Configured executable
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    None
}

/// Chromium-based browser driver. One browser process serves all sessions;
/// each session is its own tab.
pub struct ChromiumDriver {
    browser: Browser,
    nav_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch a Chromium instance according to the automation config.
    pub async fn launch(config: &AutomationConfig) -> Result<Self> {
        let executable = find_chromium(config.executable.as_deref()).with_context(|| {
            format!(
                "Chromium not found; set automation.executable or {}",
                CHROMIUM_PATH_ENV
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .window_size(1280, 800)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage");
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch Chromium")?;

        // Drive the CDP connection until the browser goes away.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            nav_timeout: Duration::from_secs(config.nav_timeout_secs),
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        Ok(Box::new(ChromiumSession {
            page,
            nav_timeout: self.nav_timeout,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // The browser process goes down when the driver is dropped.
        Ok(())
    }
}

/// A single Chromium tab.
pub struct ChromiumSession {
    page: Page,
    nav_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let result = tokio::time::timeout(self.nav_timeout, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!(
                "navigation to {url} timed out after {}s",
                self.nav_timeout.as_secs()
            ),
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("element not found: {selector}"))?
            .click()
            .await
            .with_context(|| format!("failed to click: {selector}"))?;
        Ok(())
    }

    async fn click_text(&self, text: &str) -> Result<()> {
        // No text selectors in CDP, so match candidates in the page. The
        // shortest matching textContent is the most specific element.
        let needle = serde_json::to_string(text)?;
        let script = format!(
            r#"(() => {{
                const needle = {needle};
                const nodes = Array.from(document.querySelectorAll('button, a, div[role="button"]'));
                let hit = nodes.find(el => el.textContent.trim() === needle);
                if (!hit) {{
                    const matches = nodes.filter(el => el.textContent.includes(needle));
                    matches.sort((a, b) => a.textContent.length - b.textContent.length);
                    hit = matches[0];
                }}
                if (!hit) return false;
                hit.click();
                return true;
            }})()"#
        );

        let clicked: bool = self
            .page
            .evaluate(script)
            .await
            .context("click-by-text script failed")?
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to read click-by-text result: {e:?}"))?;

        if !clicked {
            bail!("no clickable element with text: {text}");
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("input not found: {selector}"))?
            .click()
            .await
            .with_context(|| format!("failed to focus: {selector}"))?
            .type_str(text)
            .await
            .with_context(|| format!("failed to type into: {selector}"))?;
        Ok(())
    }

    async fn upload_file(&self, selector: &str, file: &Path) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("file input not found: {selector}"))?;

        let params = SetFileInputFilesParams::builder()
            .file(file.to_string_lossy())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build file upload command: {e}"))?;

        self.page
            .execute(params)
            .await
            .with_context(|| format!("failed to attach file to: {selector}"))?;
        Ok(())
    }

    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
