//! Pinterest target: pins the batch's lead image to a configured board.

use super::{PayloadKind, PostBatch, PublishTarget};
use crate::browser::{BrowserDriver, BrowserSession};
use crate::config::PinterestConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const LOGIN_URL: &str = "https://www.pinterest.com/login/";
const PIN_BUILDER_URL: &str = "https://www.pinterest.com/pin-builder/";

// Settle times tuned against the real UI; Pinterest renders the pin
// builder well after navigation reports complete.
const LOGIN_SETTLE: Duration = Duration::from_secs(6);
const BUILDER_SETTLE: Duration = Duration::from_secs(4);
const UPLOAD_SETTLE: Duration = Duration::from_secs(5);
const STEP_SETTLE: Duration = Duration::from_secs(2);
const SAVE_SETTLE: Duration = Duration::from_secs(6);

pub struct PinterestTarget {
    name: String,
    email: String,
    password: String,
    board_url: String,
    title: String,
    description: String,
    driver: Arc<dyn BrowserDriver>,
}

impl PinterestTarget {
    pub fn new(config: &PinterestConfig, driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            name: config.name.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            board_url: config.board_url.clone(),
            title: config.title.clone(),
            description: config.description.clone(),
            driver,
        }
    }

    /// The board's display name, as it appears in the board dropdown: the
    /// last segment of the board URL.
    fn board_name(&self) -> &str {
        self.board_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    async fn run_flow(&self, session: &mut dyn BrowserSession, image: &Path) -> Result<()> {
        session.navigate(LOGIN_URL).await?;
        session.fill(r#"input[name="id"]"#, &self.email).await?;
        session
            .fill(r#"input[name="password"]"#, &self.password)
            .await?;
        session.click(r#"button[type="submit"]"#).await?;
        session.settle(LOGIN_SETTLE).await;

        let url = session.current_url().await.unwrap_or_default();
        if url.contains("/login") {
            bail!("Pinterest login failed for '{}'; check credentials", self.name);
        }

        session.navigate(PIN_BUILDER_URL).await?;
        session.settle(BUILDER_SETTLE).await;

        session
            .upload_file(r#"input[type="file"]"#, image)
            .await
            .context("pin image upload failed")?;
        session.settle(UPLOAD_SETTLE).await;

        // Title and description fields come and go with UI experiments;
        // a pin without them is still worth saving.
        if let Err(e) = session
            .fill(r#"textarea[data-test-id="pin-draft-title"]"#, &self.title)
            .await
        {
            tracing::warn!(target = %self.name, error = %e, "title field not found");
        }
        if let Err(e) = session
            .fill(
                r#"textarea[data-test-id="pin-draft-description"]"#,
                &self.description,
            )
            .await
        {
            tracing::warn!(target = %self.name, error = %e, "description field not found");
        }
        session.settle(STEP_SETTLE).await;

        session
            .click(r#"[data-test-id="board-dropdown-select-button"]"#)
            .await
            .context("board dropdown not found")?;
        session.settle(STEP_SETTLE).await;

        if let Err(e) = session.click_text(self.board_name()).await {
            tracing::warn!(
                target = %self.name,
                board = self.board_name(),
                error = %e,
                "could not pick board by name"
            );
        }
        session.settle(STEP_SETTLE).await;

        session
            .click(r#"button[data-test-id="board-dropdown-save-button"]"#)
            .await
            .context("save button not found")?;
        session.settle(SAVE_SETTLE).await;

        Ok(())
    }
}

#[async_trait]
impl PublishTarget for PinterestTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PayloadKind {
        PayloadKind::Image
    }

    async fn publish(&self, batch: &PostBatch) -> Result<()> {
        let image = batch.images.first().context("batch has no image to pin")?;

        let mut session = self
            .driver
            .new_session()
            .await
            .context("failed to open browser session")?;
        let result = self.run_flow(session.as_mut(), image).await;
        let _ = session.close().await;
        result
    }
}
