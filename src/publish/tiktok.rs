//! TikTok target: uploads the assembled slideshow video.

use super::{PayloadKind, PostBatch, PublishTarget};
use crate::browser::{BrowserDriver, BrowserSession};
use crate::config::TiktokConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const LOGIN_URL: &str = "https://www.tiktok.com/login";
const UPLOAD_URL: &str = "https://www.tiktok.com/upload?lang=en";

const LOGIN_PAGE_SETTLE: Duration = Duration::from_secs(5);
const STEP_SETTLE: Duration = Duration::from_secs(2);
const LOGIN_SETTLE: Duration = Duration::from_secs(8);
// Server-side transcode of the uploaded video; the caption form is not
// usable before it finishes.
const PROCESSING_SETTLE: Duration = Duration::from_secs(15);
const POST_SETTLE: Duration = Duration::from_secs(8);

pub struct TiktokTarget {
    name: String,
    username: String,
    password: String,
    caption: String,
    driver: Arc<dyn BrowserDriver>,
}

impl TiktokTarget {
    pub fn new(config: &TiktokConfig, driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            name: config.name.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            caption: config.caption.clone(),
            driver,
        }
    }

    async fn run_flow(&self, session: &mut dyn BrowserSession, batch: &PostBatch) -> Result<()> {
        session.navigate(LOGIN_URL).await?;
        session.settle(LOGIN_PAGE_SETTLE).await;

        // The login page sometimes lands directly on the credential form,
        // so the two menu steps are best-effort.
        if let Err(e) = session.click_text("Use phone / email / username").await {
            tracing::debug!(target = %self.name, error = %e, "login menu step skipped");
        }
        session.settle(STEP_SETTLE).await;
        if let Err(e) = session.click_text("Email / Username").await {
            tracing::debug!(target = %self.name, error = %e, "login tab step skipped");
        }
        session.settle(STEP_SETTLE).await;

        session
            .fill(r#"input[name="username"]"#, &self.username)
            .await?;
        session
            .fill(r#"input[name="password"]"#, &self.password)
            .await?;
        session.click_text("Log in").await?;
        session.settle(LOGIN_SETTLE).await;

        let url = session.current_url().await.unwrap_or_default();
        if url.contains("/login") {
            bail!("TikTok login failed for '{}'; check credentials", self.name);
        }

        session.navigate(UPLOAD_URL).await?;

        session
            .upload_file(r#"input[type="file"]"#, &batch.video)
            .await
            .context("video upload input not found")?;
        session.settle(PROCESSING_SETTLE).await;

        if let Err(e) = session
            .fill(r#"textarea[placeholder*="Describe your video"]"#, &self.caption)
            .await
        {
            tracing::warn!(target = %self.name, error = %e, "caption field not found");
        }

        session
            .click_text("Post")
            .await
            .context("post button not found")?;
        session.settle(POST_SETTLE).await;

        Ok(())
    }
}

#[async_trait]
impl PublishTarget for TiktokTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PayloadKind {
        PayloadKind::Video
    }

    async fn publish(&self, batch: &PostBatch) -> Result<()> {
        let mut session = self
            .driver
            .new_session()
            .await
            .context("failed to open browser session")?;
        let result = self.run_flow(session.as_mut(), batch).await;
        let _ = session.close().await;
        result
    }
}
