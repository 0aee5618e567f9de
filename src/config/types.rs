use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub assembly: AssemblyConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub automation: AutomationConfig,

    #[serde(default)]
    pub pinterest: Vec<PinterestConfig>,

    #[serde(default)]
    pub tiktok: Vec<TiktokConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Upstream product pages. Entries may themselves be comma-separated
    /// lists; they are flattened on load.
    #[serde(default)]
    pub product_urls: Vec<String>,

    /// Acquisition strategies in priority order.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,

    /// Attempts per strategy before giving up on a transient failure.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay between retry attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![
        StrategyKind::Api,
        StrategyKind::Markup,
        StrategyKind::EmbeddedJson,
    ]
}
fn default_attempts() -> u32 {
    4
}
fn default_retry_delay_ms() -> u64 {
    1500
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/118 Safari/537.36"
        .to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            product_urls: Vec::new(),
            strategies: default_strategies(),
            attempts: default_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// One acquisition strategy, named the way the config file spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Api,
    Markup,
    EmbeddedJson,
}

impl StrategyKind {
    /// Config-file spelling, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Api => "api",
            StrategyKind::Markup => "markup",
            StrategyKind::EmbeddedJson => "embedded-json",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding downloaded and manually dropped images.
    #[serde(default = "default_pool_dir")]
    pub pool_dir: PathBuf,

    /// Ledger of already-posted asset ids.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// How many unposted assets one run consumes.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_pool_dir() -> PathBuf {
    PathBuf::from("./pool")
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("./posted.json")
}
fn default_batch_size() -> usize {
    6
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            pool_dir: default_pool_dir(),
            ledger_path: default_ledger_path(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssemblyConfig {
    /// Directory the assembled videos are written into.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Optional pool of accompaniment tracks; the first audio file in
    /// lexicographic order is used.
    #[serde(default)]
    pub music_dir: Option<PathBuf>,

    #[serde(default = "default_seconds_per_image")]
    pub seconds_per_image: u32,

    #[serde(default = "default_canvas_width")]
    pub width: u32,

    #[serde(default = "default_canvas_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("./tmp")
}
fn default_seconds_per_image() -> u32 {
    3
}
fn default_canvas_width() -> u32 {
    1080
}
fn default_canvas_height() -> u32 {
    1920
}
fn default_fps() -> u32 {
    30
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            music_dir: None,
            seconds_per_image: default_seconds_per_image(),
            width: default_canvas_width(),
            height: default_canvas_height(),
            fps: default_fps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first).
    #[serde(default = "default_cron")]
    pub cron: String,

    /// Run the pipeline once immediately at startup (default: true).
    #[serde(default = "default_run_at_start")]
    pub run_at_start: bool,
}

fn default_cron() -> String {
    "0 */30 * * * *".to_string()
}
fn default_run_at_start() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_at_start: default_run_at_start(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutomationConfig {
    /// Run the browser without a visible window (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Browser executable; discovered from the environment and PATH when
    /// unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Navigation timeout in seconds.
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,
}

fn default_headless() -> bool {
    true
}
fn default_nav_timeout_secs() -> u64 {
    30
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            nav_timeout_secs: default_nav_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PinterestConfig {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    /// Login email. Supports `${VAR}` environment references.
    #[serde(default)]
    pub email: String,

    /// Login password. Supports `${VAR}` environment references.
    #[serde(default)]
    pub password: String,

    /// Board the pin is saved to; the board name is the last path segment.
    #[serde(default)]
    pub board_url: String,

    #[serde(default = "default_pin_title")]
    pub title: String,

    #[serde(default = "default_pin_description")]
    pub description: String,
}

fn default_pin_title() -> String {
    "New aesthetic wallpaper".to_string()
}
fn default_pin_description() -> String {
    "Aesthetic phone wallpaper ✨".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TiktokConfig {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    /// Login username or email. Supports `${VAR}` environment references.
    #[serde(default)]
    pub username: String,

    /// Login password. Supports `${VAR}` environment references.
    #[serde(default)]
    pub password: String,

    #[serde(default = "default_caption")]
    pub caption: String,
}

fn default_caption() -> String {
    "Aesthetic wallpaper 💫".to_string()
}
