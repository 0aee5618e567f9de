//! Pipeline integration tests
//!
//! Drives full runs through a real store and ledger on disk, with the
//! acquisition chain, assembler, and publish targets replaced by stubs.
//! The focus is batch consumption: a batch is committed exactly once,
//! and aborted runs never touch the ledger.

use reelcast::acquire::{
    AcquisitionChain, AcquisitionStrategy, CandidateAsset, FetchError, PageClient, RetryPolicy,
};
use reelcast::assemble::{Assembler, AssemblyRequest};
use reelcast::config::{Config, StrategyKind};
use reelcast::ledger::PostLedger;
use reelcast::pipeline::{Pipeline, RunState};
use reelcast::publish::{PayloadKind, PostBatch, PublishDispatcher, PublishTarget};
use reelcast::store::AssetStore;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.store.pool_dir = dir.path().join("pool");
    config.store.ledger_path = dir.path().join("posted.json");
    config.assembly.out_dir = dir.path().join("out");
    config.source.product_urls = Vec::new();
    config
}

fn empty_chain() -> AcquisitionChain {
    AcquisitionChain::new(
        Vec::new(),
        RetryPolicy {
            attempts: 1,
            delay: Duration::from_millis(1),
        },
    )
}

/// Writes `slideshow.mp4` into the request's out dir, or fails on demand.
struct StubAssembler {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StubAssembler {
    fn ok() -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                fail: false,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn failing() -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                fail: true,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

impl Assembler for StubAssembler {
    fn assemble(&self, request: &AssemblyRequest) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("scripted assembly failure");
        }
        std::fs::create_dir_all(&request.out_dir)?;
        let out = request.out_dir.join("slideshow.mp4");
        std::fs::write(&out, b"video")?;
        Ok(out)
    }
}

struct RecordingTarget {
    name: &'static str,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl RecordingTarget {
    fn new(name: &'static str, fail: bool) -> (Box<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                name,
                fail,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl PublishTarget for RecordingTarget {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> PayloadKind {
        PayloadKind::Video
    }

    async fn publish(&self, batch: &PostBatch) -> Result<()> {
        assert!(batch.video.exists());
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("scripted publish failure");
        }
        Ok(())
    }
}

fn seed_pool(pool: &Path, names: &[&str]) {
    std::fs::create_dir_all(pool).unwrap();
    for name in names {
        std::fs::write(pool.join(name), b"\xff\xd8\xff\xe0 fake").unwrap();
    }
}

fn pipeline_with(
    config: Config,
    assembler: Arc<dyn Assembler>,
    targets: Vec<Box<dyn PublishTarget>>,
) -> Pipeline {
    let config = Arc::new(config);
    let client = Arc::new(PageClient::new(&config.source));
    let store = AssetStore::new(&config.store.pool_dir).unwrap();
    Pipeline::new(
        config,
        client,
        empty_chain(),
        store,
        assembler,
        PublishDispatcher::new(targets),
    )
}

#[tokio::test]
async fn test_successive_runs_never_repost() {
    let dir = tempdir().unwrap();
    let mut config = test_config(&dir);
    config.store.batch_size = 6;
    seed_pool(
        &config.store.pool_dir,
        &[
            "01.jpg", "02.jpg", "03.jpg", "04.jpg", "05.jpg", "06.jpg", "07.jpg", "08.jpg",
            "09.jpg", "10.jpg",
        ],
    );
    let ledger_path = config.store.ledger_path.clone();
    let (assembler, _) = StubAssembler::ok();
    let (target, target_calls) = RecordingTarget::new("main", false);
    let pipeline = pipeline_with(config, assembler, vec![target]);

    // First run takes the six lexicographically smallest assets.
    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(
        report.selected,
        vec!["01.jpg", "02.jpg", "03.jpg", "04.jpg", "05.jpg", "06.jpg"]
    );
    assert_eq!(report.newly_ledgered, 6);
    assert_eq!(target_calls.load(Ordering::SeqCst), 1);

    let ledger = PostLedger::load(&ledger_path).unwrap();
    assert_eq!(ledger.len(), 6);
    assert!(ledger.has("01.jpg"));
    assert!(!ledger.has("07.jpg"));

    // Second run picks up the remainder.
    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(
        report.selected,
        vec!["07.jpg", "08.jpg", "09.jpg", "10.jpg"]
    );
    assert_eq!(PostLedger::load(&ledger_path).unwrap().len(), 10);

    // Third run finds nothing left to post.
    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Aborted);
    assert_eq!(target_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_target_still_spends_batch() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    seed_pool(&config.store.pool_dir, &["a.jpg", "b.jpg"]);
    let ledger_path = config.store.ledger_path.clone();
    let (assembler, _) = StubAssembler::ok();
    let (good, good_calls) = RecordingTarget::new("good", false);
    let (bad, bad_calls) = RecordingTarget::new("bad", true);
    let pipeline = pipeline_with(config, assembler, vec![good, bad]);

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.outcomes.len(), 2);

    let good_outcome = report.outcomes.iter().find(|o| o.target == "good").unwrap();
    assert!(good_outcome.ok);
    let bad_outcome = report.outcomes.iter().find(|o| o.target == "bad").unwrap();
    assert!(!bad_outcome.ok);
    assert!(bad_outcome
        .error
        .as_deref()
        .unwrap()
        .contains("scripted publish failure"));

    // Both targets were attempted, and the batch is spent either way.
    assert_eq!(good_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bad_calls.load(Ordering::SeqCst), 1);
    let ledger = PostLedger::load(&ledger_path).unwrap();
    assert!(ledger.has("a.jpg"));
    assert!(ledger.has("b.jpg"));
}

#[tokio::test]
async fn test_no_targets_still_spends_batch() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    seed_pool(&config.store.pool_dir, &["a.jpg"]);
    let ledger_path = config.store.ledger_path.clone();
    let (assembler, _) = StubAssembler::ok();
    let pipeline = pipeline_with(config, assembler, Vec::new());

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert!(report.outcomes.is_empty());
    assert_eq!(report.newly_ledgered, 1);
    assert!(PostLedger::load(&ledger_path).unwrap().has("a.jpg"));
}

#[tokio::test]
async fn test_empty_pool_aborts_without_side_effects() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let ledger_path = config.store.ledger_path.clone();
    let (assembler, assembler_calls) = StubAssembler::ok();
    let (target, target_calls) = RecordingTarget::new("main", false);
    let pipeline = pipeline_with(config, assembler, vec![target]);

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Aborted);
    assert!(report
        .abort_reason
        .as_deref()
        .unwrap()
        .contains("no postable assets"));
    assert_eq!(assembler_calls.load(Ordering::SeqCst), 0);
    assert_eq!(target_calls.load(Ordering::SeqCst), 0);
    assert!(!ledger_path.exists());
}

#[tokio::test]
async fn test_assembly_failure_aborts_without_marks() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    seed_pool(&config.store.pool_dir, &["a.jpg", "b.jpg"]);
    let ledger_path = config.store.ledger_path.clone();
    let (assembler, _) = StubAssembler::failing();
    let (target, target_calls) = RecordingTarget::new("main", false);
    let pipeline = pipeline_with(config, assembler, vec![target]);

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Aborted);
    assert!(report
        .abort_reason
        .as_deref()
        .unwrap()
        .contains("assembly failed"));
    assert_eq!(report.selected, vec!["a.jpg", "b.jpg"]);
    assert_eq!(target_calls.load(Ordering::SeqCst), 0);
    assert!(!ledger_path.exists());

    // The batch is still there for the next run.
    let store = AssetStore::new(dir.path().join("pool")).unwrap();
    let ledger = PostLedger::load(&ledger_path).unwrap();
    assert_eq!(store.list_unposted(6, &ledger).unwrap().len(), 2);
}

#[tokio::test]
async fn test_dry_run_skips_publish_and_commit() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    seed_pool(&config.store.pool_dir, &["a.jpg", "b.jpg"]);
    let ledger_path = config.store.ledger_path.clone();
    let (assembler, assembler_calls) = StubAssembler::ok();
    let (target, target_calls) = RecordingTarget::new("main", false);
    let pipeline = pipeline_with(config, assembler, vec![target]).dry_run(true);

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert!(report.artifact.is_some());
    assert!(report.outcomes.is_empty());
    assert_eq!(report.newly_ledgered, 0);

    // Assembly really ran, but nothing was published or committed.
    assert_eq!(assembler_calls.load(Ordering::SeqCst), 1);
    assert_eq!(target_calls.load(Ordering::SeqCst), 0);
    assert!(!ledger_path.exists());
}

#[tokio::test]
async fn test_corrupt_ledger_is_fatal() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    seed_pool(&config.store.pool_dir, &["a.jpg"]);
    std::fs::write(&config.store.ledger_path, "{ not json").unwrap();
    let (assembler, _) = StubAssembler::ok();
    let pipeline = pipeline_with(config, assembler, Vec::new());

    let err = pipeline.run_once().await.unwrap_err();
    assert!(format!("{err:#}").contains("corrupt"));
}

/// One strategy that always yields the given locators.
struct FixedStrategy {
    locators: Vec<Url>,
}

#[async_trait]
impl AcquisitionStrategy for FixedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Api
    }

    async fn acquire(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError> {
        Ok(self
            .locators
            .iter()
            .map(|l| CandidateAsset::new(product_url.as_str(), l.clone(), StrategyKind::Api))
            .collect())
    }
}

#[tokio::test]
async fn test_fetch_only_downloads_new_assets_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/covers/one.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-one".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/covers/two.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-two".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut config = test_config(&dir);
    config.source.product_urls = vec![format!("{}/l/alpha", server.uri())];
    let pool_dir = config.store.pool_dir.clone();

    let locators = vec![
        Url::parse(&format!("{}/covers/one.jpg", server.uri())).unwrap(),
        Url::parse(&format!("{}/covers/two.webp", server.uri())).unwrap(),
    ];
    let config = Arc::new(config);
    let client = Arc::new(PageClient::new(&config.source));
    let chain = AcquisitionChain::new(
        vec![Box::new(FixedStrategy { locators })],
        RetryPolicy {
            attempts: 1,
            delay: Duration::from_millis(1),
        },
    );
    let store = AssetStore::new(&pool_dir).unwrap();
    let (assembler, _) = StubAssembler::ok();
    let pipeline = Pipeline::new(
        config,
        client,
        chain,
        store,
        assembler,
        PublishDispatcher::new(Vec::new()),
    );

    let (candidates, downloaded) = pipeline.fetch_only().await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(downloaded, 2);

    let store = AssetStore::new(&pool_dir).unwrap();
    let assets = store.scan().unwrap();
    assert_eq!(assets.len(), 2);
    assert!(assets.iter().any(|a| a.id.ends_with(".jpg")));
    assert!(assets.iter().any(|a| a.id.ends_with(".webp")));

    // A second fetch sees the same candidates but downloads nothing; the
    // mock expectations hold the download count at one per asset.
    let (candidates, downloaded) = pipeline.fetch_only().await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(downloaded, 0);
}
