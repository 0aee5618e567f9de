mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare_config(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./reelcast.toml",
        "~/.config/reelcast/config.toml",
        "/etc/reelcast/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    prepare_config(&mut config)?;
    Ok(config)
}

/// Flatten comma-separated sources, expand `~` in paths and `${VAR}`
/// references in credentials.
fn prepare_config(config: &mut Config) -> Result<()> {
    flatten_sources(&mut config.source);
    expand_paths(config);
    expand_secrets(config)?;
    Ok(())
}

fn flatten_sources(source: &mut SourceConfig) {
    source.product_urls = source
        .product_urls
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
}

fn expand_paths(config: &mut Config) {
    config.store.pool_dir = expand_tilde(&config.store.pool_dir);
    config.store.ledger_path = expand_tilde(&config.store.ledger_path);
    config.assembly.out_dir = expand_tilde(&config.assembly.out_dir);
    if let Some(dir) = config.assembly.music_dir.take() {
        config.assembly.music_dir = Some(expand_tilde(&dir));
    }
    if let Some(exe) = config.automation.executable.take() {
        config.automation.executable = Some(expand_tilde(&exe));
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn expand_secrets(config: &mut Config) -> Result<()> {
    for pin in &mut config.pinterest {
        pin.email = expand_env(&pin.email, &pin.name, "email")?;
        pin.password = expand_env(&pin.password, &pin.name, "password")?;
    }
    for tiktok in &mut config.tiktok {
        tiktok.username = expand_env(&tiktok.username, &tiktok.name, "username")?;
        tiktok.password = expand_env(&tiktok.password, &tiktok.name, "password")?;
    }
    Ok(())
}

fn expand_env(value: &str, target: &str, field: &str) -> Result<String> {
    shellexpand::env(value)
        .map(|v| v.into_owned())
        .with_context(|| format!("Failed to expand {field} for target '{target}'"))
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    // Validate upstream sources
    if config.source.product_urls.is_empty() {
        anyhow::bail!("No upstream product URLs configured");
    }
    for product_url in &config.source.product_urls {
        url::Url::parse(product_url)
            .with_context(|| format!("Invalid product URL: {product_url}"))?;
    }
    if config.source.strategies.is_empty() {
        anyhow::bail!("Acquisition strategy list cannot be empty");
    }
    if config.source.attempts == 0 {
        anyhow::bail!("Acquisition attempts cannot be 0");
    }

    // Validate store config
    if config.store.batch_size == 0 {
        anyhow::bail!("Batch size cannot be 0");
    }

    // Validate assembly config
    if let Some(dir) = &config.assembly.music_dir {
        if !dir.exists() {
            tracing::warn!("Music directory does not exist: {:?}", dir);
        }
    }

    // Validate publish targets
    for pin in &config.pinterest {
        if pin.enabled && (pin.email.is_empty() || pin.password.is_empty()) {
            anyhow::bail!(
                "Pinterest target '{}' is enabled but has no credentials",
                pin.name
            );
        }
        if pin.enabled && pin.board_url.is_empty() {
            anyhow::bail!(
                "Pinterest target '{}' is enabled but has no board URL",
                pin.name
            );
        }
    }
    for tiktok in &config.tiktok {
        if tiktok.enabled && (tiktok.username.is_empty() || tiktok.password.is_empty()) {
            anyhow::bail!(
                "TikTok target '{}' is enabled but has no credentials",
                tiktok.name
            );
        }
    }

    Ok(())
}
