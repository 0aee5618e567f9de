//! Local pool of downloaded images awaiting posting.

use crate::acquire::CandidateAsset;
use crate::ledger::PostLedger;
use crate::paths::{image_extensions, is_image_file};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Length of the hash prefix used in stored file names.
const ID_HASH_LEN: usize = 16;

/// How an asset entered the pool, derived from its file name. Downloads
/// carry the stable hash-prefix name; any other name was placed by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    Downloaded,
    Manual,
}

/// One image in the pool. The id is the file name, which doubles as the
/// ledger key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub id: String,
    pub path: PathBuf,
    pub origin: AssetOrigin,
}

/// Flat directory of image files. Downloads land here under a stable name
/// derived from their upstream locator; files dropped in by hand
/// participate under whatever name they carry.
#[derive(Debug, Clone)]
pub struct AssetStore {
    pool_dir: PathBuf,
}

impl AssetStore {
    pub fn new(pool_dir: impl Into<PathBuf>) -> Result<Self> {
        let pool_dir = pool_dir.into();
        fs::create_dir_all(&pool_dir)
            .with_context(|| format!("Failed to create pool directory: {}", pool_dir.display()))?;
        Ok(Self { pool_dir })
    }

    pub fn pool_dir(&self) -> &Path {
        &self.pool_dir
    }

    /// All image files in the pool, sorted by file name. The ordering is
    /// what makes selection deterministic, so it must not depend on
    /// directory enumeration order.
    pub fn scan(&self) -> Result<Vec<LocalAsset>> {
        let mut assets = Vec::new();
        for entry in WalkDir::new(&self.pool_dir).max_depth(1).follow_links(true) {
            let entry = entry.with_context(|| {
                format!("Failed to read pool directory: {}", self.pool_dir.display())
            })?;
            let path = entry.path();
            if !path.is_file() || !is_image_file(path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            let origin = origin_of(&name);
            assets.push(LocalAsset {
                id: name,
                path: entry.into_path(),
                origin,
            });
        }
        assets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(assets)
    }

    /// Up to `n` pool assets that the ledger has not seen, in scan order.
    pub fn list_unposted(&self, n: usize, ledger: &PostLedger) -> Result<Vec<LocalAsset>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|asset| !ledger.has(&asset.id))
            .take(n)
            .collect())
    }

    /// Whether an asset with this id is already in the pool.
    pub fn contains(&self, id: &str) -> bool {
        self.pool_dir.join(id).is_file()
    }

    /// Write downloaded bytes into the pool under `id`, through a temp file
    /// in the same directory so partial downloads never become visible. If
    /// the id already exists the existing file wins.
    pub fn admit(&self, id: &str, bytes: &[u8]) -> Result<LocalAsset> {
        let path = self.pool_dir.join(id);
        if path.exists() {
            return Ok(LocalAsset {
                id: id.to_string(),
                path,
                origin: origin_of(id),
            });
        }

        let temp_path = path.with_extension("part");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to write asset temp file: {}", temp_path.display()))?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to place asset file: {}", path.display()))?;

        Ok(LocalAsset {
            id: id.to_string(),
            path,
            origin: origin_of(id),
        })
    }
}

fn origin_of(id: &str) -> AssetOrigin {
    let Some((stem, _)) = id.rsplit_once('.') else {
        return AssetOrigin::Manual;
    };
    let hashed = stem.len() == ID_HASH_LEN
        && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if hashed {
        AssetOrigin::Downloaded
    } else {
        AssetOrigin::Manual
    }
}

/// Stable pool file name for a candidate: a hash prefix of its normalized
/// locator plus the locator's image extension. URL variants that differ
/// only in query parameters map to the same name.
pub fn stable_id(candidate: &CandidateAsset) -> String {
    let mut hasher = Sha256::new();
    hasher.update(candidate.identity().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}.{}", &digest[..ID_HASH_LEN], locator_extension(candidate))
}

fn locator_extension(candidate: &CandidateAsset) -> String {
    Path::new(candidate.locator.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| image_extensions().contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string())
}
