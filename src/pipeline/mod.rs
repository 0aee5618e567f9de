//! The posting pipeline: one run from acquisition through ledger commit.
//!
//! A run moves through fixed stages: acquire new images into the pool,
//! select a batch the ledger has not seen, assemble the batch into a
//! slideshow, publish it to every configured target, and commit the batch
//! to the ledger. The commit happens whether or not individual targets
//! succeeded; a batch is spent once posting was attempted.

use crate::acquire::{AcquisitionChain, CandidateAsset, PageClient};
use crate::assemble::{pick_music, Assembler, AssemblyRequest};
use crate::config::Config;
use crate::ledger::PostLedger;
use crate::publish::{PostBatch, PublishDispatcher, PublishOutcome};
use crate::store::{stable_id, AssetOrigin, AssetStore, LocalAsset};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where a run ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// The run went through every stage.
    Completed,
    /// The run stopped early without touching the ledger.
    Aborted,
}

/// What one run did, for logs and the `run` command output.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: RunState,
    /// Candidates discovered upstream, after de-duplication.
    pub candidates_found: usize,
    /// New files admitted into the pool this run.
    pub downloaded: usize,
    /// Asset ids selected for the batch.
    pub selected: Vec<String>,
    /// The assembled video, when assembly ran.
    pub artifact: Option<PathBuf>,
    pub outcomes: Vec<PublishOutcome>,
    /// Ledger entries added by the commit stage.
    pub newly_ledgered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

/// One scheduled content run. Everything is injected so tests can swap the
/// chain, assembler, and targets for stubs.
pub struct Pipeline {
    config: Arc<Config>,
    client: Arc<PageClient>,
    chain: AcquisitionChain,
    store: AssetStore,
    assembler: Arc<dyn Assembler>,
    dispatcher: PublishDispatcher,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        client: Arc<PageClient>,
        chain: AcquisitionChain,
        store: AssetStore,
        assembler: Arc<dyn Assembler>,
        dispatcher: PublishDispatcher,
    ) -> Self {
        Self {
            config,
            client,
            chain,
            store,
            assembler,
            dispatcher,
            dry_run: false,
        }
    }

    /// Stop after assembly: no publishing, no ledger commit.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Execute one full run.
    ///
    /// Returns `Err` only for infrastructure failures that need operator
    /// attention, such as an unreadable ledger. Running out of assets or an
    /// assembly failure aborts the run with a report instead, leaving the
    /// ledger untouched.
    pub async fn run_once(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run = %run_id, "run started");

        // The ledger must be readable before anything else happens; a
        // corrupt ledger must never be mistaken for an empty one.
        let mut ledger = PostLedger::load(&self.config.store.ledger_path)?;

        let (candidates, downloaded) = self.acquire_stage(&ledger).await;
        let candidates_found = candidates.len();

        let selection = self
            .store
            .list_unposted(self.config.store.batch_size, &ledger)?;
        if selection.is_empty() {
            warn!(run = %run_id, "no postable assets in pool, aborting run");
            return Ok(RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                state: RunState::Aborted,
                candidates_found,
                downloaded,
                selected: Vec::new(),
                artifact: None,
                outcomes: Vec::new(),
                newly_ledgered: 0,
                abort_reason: Some("no postable assets in pool".to_string()),
            });
        }
        let selected: Vec<String> = selection.iter().map(|a| a.id.clone()).collect();
        let manual = selection
            .iter()
            .filter(|a| a.origin == AssetOrigin::Manual)
            .count();
        info!(run = %run_id, batch = selection.len(), manual, ids = ?selected, "batch selected");

        let artifact = match self.assemble_stage(&selection).await {
            Ok(path) => path,
            Err(e) => {
                error!(run = %run_id, error = %e, "assembly failed, aborting run");
                return Ok(RunReport {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    state: RunState::Aborted,
                    candidates_found,
                    downloaded,
                    selected,
                    artifact: None,
                    outcomes: Vec::new(),
                    newly_ledgered: 0,
                    abort_reason: Some(format!("assembly failed: {e:#}")),
                });
            }
        };
        info!(run = %run_id, artifact = %artifact.display(), "batch assembled");

        if self.dry_run {
            info!(run = %run_id, "dry run, skipping publish and commit");
            return Ok(RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                state: RunState::Completed,
                candidates_found,
                downloaded,
                selected,
                artifact: Some(artifact),
                outcomes: Vec::new(),
                newly_ledgered: 0,
                abort_reason: None,
            });
        }

        let batch = PostBatch {
            video: artifact.clone(),
            images: selection.iter().map(|a| a.path.clone()).collect(),
        };
        if !self.dispatcher.has_targets() {
            warn!(run = %run_id, "no publish targets enabled, batch will be spent unposted");
        }
        let outcomes = self.dispatcher.dispatch(&batch).await;

        // Commit regardless of outcomes: the batch was attempted, and
        // attempting it again would double-post on the targets that
        // succeeded.
        let newly_ledgered = ledger.mark_many(selected.clone(), Utc::now());
        ledger.flush().context("Failed to persist ledger")?;
        info!(
            run = %run_id,
            newly_ledgered,
            ok = outcomes.iter().filter(|o| o.ok).count(),
            failed = outcomes.iter().filter(|o| !o.ok).count(),
            "run completed"
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            state: RunState::Completed,
            candidates_found,
            downloaded,
            selected,
            artifact: Some(artifact),
            outcomes,
            newly_ledgered,
            abort_reason: None,
        })
    }

    /// Acquisition only: refresh the pool without posting anything. Backs
    /// the `fetch` command. Returns the candidates found and how many files
    /// were downloaded.
    pub async fn fetch_only(&self) -> Result<(Vec<CandidateAsset>, usize)> {
        let ledger = PostLedger::load(&self.config.store.ledger_path)?;
        Ok(self.acquire_stage(&ledger).await)
    }

    /// Discover candidates and download the ones the pool and ledger have
    /// not seen. Per-candidate failures are logged and skipped; acquisition
    /// problems never kill a run.
    async fn acquire_stage(&self, ledger: &PostLedger) -> (Vec<CandidateAsset>, usize) {
        let refs = &self.config.source.product_urls;
        if refs.is_empty() {
            debug!("no product references configured, skipping acquisition");
            return (Vec::new(), 0);
        }

        let candidates = self.chain.acquire_all(refs).await;
        let mut downloaded = 0;
        for candidate in &candidates {
            let id = stable_id(candidate);
            if ledger.has(&id) {
                debug!(id = %id, "already posted, skipping download");
                continue;
            }
            if self.store.contains(&id) {
                debug!(id = %id, "already pooled, skipping download");
                continue;
            }
            match self.client.get_bytes(&candidate.locator).await {
                Ok(bytes) => match self.store.admit(&id, &bytes) {
                    Ok(asset) => {
                        info!(id = %asset.id, bytes = bytes.len(), "asset downloaded");
                        downloaded += 1;
                    }
                    Err(e) => warn!(id = %id, error = %e, "failed to store downloaded asset"),
                },
                Err(e) => {
                    warn!(id = %id, url = %candidate.locator, error = %e, "download failed");
                }
            }
        }
        (candidates, downloaded)
    }

    async fn assemble_stage(&self, selection: &[LocalAsset]) -> Result<PathBuf> {
        let request = AssemblyRequest {
            images: selection.iter().map(|a| a.path.clone()).collect(),
            music: pick_music(self.config.assembly.music_dir.as_deref()),
            out_dir: self.config.assembly.out_dir.clone(),
        };
        let assembler = self.assembler.clone();
        tokio::task::spawn_blocking(move || assembler.assemble(&request)).await?
    }
}
