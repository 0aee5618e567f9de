//! Fan-out publishing of an assembled batch to the configured targets.

pub mod pinterest;
pub mod tiktok;

pub use pinterest::PinterestTarget;
pub use tiktok::TiktokTarget;

use crate::browser::BrowserDriver;
use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// What a target consumes from the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// The assembled slideshow video.
    Video,
    /// A still image from the batch.
    Image,
}

/// Everything a posting run hands to the targets: the assembled video and
/// the batch images in selection order.
#[derive(Debug, Clone)]
pub struct PostBatch {
    pub video: PathBuf,
    pub images: Vec<PathBuf>,
}

/// One destination for a posting run.
///
/// Implementations drive a browser session through the target's posting
/// flow. A failure is the target's own; the dispatcher records it and moves
/// on.
#[async_trait]
pub trait PublishTarget: Send + Sync {
    /// Instance name from the config, used in logs and outcomes.
    fn name(&self) -> &str;

    fn kind(&self) -> PayloadKind;

    async fn publish(&self, batch: &PostBatch) -> Result<()>;
}

/// Result of one target's attempt, kept in the run report.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub target: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Holds the enabled targets and runs them one at a time.
pub struct PublishDispatcher {
    targets: Vec<Box<dyn PublishTarget>>,
}

impl PublishDispatcher {
    pub fn new(targets: Vec<Box<dyn PublishTarget>>) -> Self {
        Self { targets }
    }

    /// Build targets for every enabled adapter in the config, all sharing
    /// one browser driver.
    pub fn from_config(config: &Config, driver: Arc<dyn BrowserDriver>) -> Self {
        let mut targets: Vec<Box<dyn PublishTarget>> = Vec::new();
        for pinterest in config.pinterest.iter().filter(|p| p.enabled) {
            targets.push(Box::new(PinterestTarget::new(pinterest, driver.clone())));
        }
        for tiktok in config.tiktok.iter().filter(|t| t.enabled) {
            targets.push(Box::new(TiktokTarget::new(tiktok, driver.clone())));
        }
        Self { targets }
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name()).collect()
    }

    /// Publish the batch to every target in order. Errors are recorded, not
    /// propagated; one broken target never blocks the others.
    pub async fn dispatch(&self, batch: &PostBatch) -> Vec<PublishOutcome> {
        let mut outcomes = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            tracing::info!(target = target.name(), "publishing batch");
            match target.publish(batch).await {
                Ok(()) => {
                    tracing::info!(target = target.name(), "published");
                    outcomes.push(PublishOutcome {
                        target: target.name().to_string(),
                        ok: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(target = target.name(), error = %e, "publish failed");
                    outcomes.push(PublishOutcome {
                        target: target.name().to_string(),
                        ok: false,
                        error: Some(format!("{e:#}")),
                    });
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTarget {
        name: String,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PublishTarget for FixedTarget {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> PayloadKind {
            PayloadKind::Video
        }

        async fn publish(&self, _batch: &PostBatch) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("session could not be opened")
            }
            Ok(())
        }
    }

    fn batch() -> PostBatch {
        PostBatch {
            video: PathBuf::from("/tmp/out.mp4"),
            images: vec![PathBuf::from("/tmp/a.jpg")],
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_targets() {
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));
        let dispatcher = PublishDispatcher::new(vec![
            Box::new(FixedTarget {
                name: "first".to_string(),
                fail: true,
                calls: calls_a.clone(),
            }),
            Box::new(FixedTarget {
                name: "second".to_string(),
                fail: false,
                calls: calls_b.clone(),
            }),
        ]);

        let outcomes = dispatcher.dispatch(&batch()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].ok);
        assert!(outcomes[0].error.as_deref().unwrap().contains("session"));
        assert!(outcomes[1].ok);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_dispatcher_yields_no_outcomes() {
        let dispatcher = PublishDispatcher::new(Vec::new());
        assert!(!dispatcher.has_targets());
        assert!(dispatcher.dispatch(&batch()).await.is_empty());
    }
}
