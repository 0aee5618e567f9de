mod cli;

use reelcast::{
    acquire::{AcquisitionChain, PageClient},
    assemble::SlideshowAssembler,
    browser::{find_chromium, BrowserDriver, ChromiumDriver, NoopDriver},
    config::{self, Config},
    pipeline::Pipeline,
    publish::PublishDispatcher,
    schedule,
    store::AssetStore,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_scheduler(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    tracing::info!("Starting reelcast scheduler");
    tracing::info!(
        "Posting on cron '{}' with batches of {}",
        config.schedule.cron,
        config.store.batch_size
    );

    let schedule = config.schedule.clone();
    let pipeline = build_pipeline(config, true).await?;
    schedule::run_forever(pipeline, &schedule).await
}

async fn run_once(config_path: Option<&std::path::Path>, dry_run: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    // A dry run never publishes, so it never needs a browser.
    let pipeline = build_pipeline(config, !dry_run).await?.dry_run(dry_run);
    let report = pipeline.run_once().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn fetch(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pipeline = build_pipeline(config, false).await?;

    let (candidates, downloaded) = pipeline.fetch_only().await?;
    println!("Found {} candidate assets upstream", candidates.len());
    for candidate in &candidates {
        println!("  {} ({})", candidate.locator, candidate.discovered_via.as_str());
    }
    println!(
        "Downloaded {} new files into {}",
        downloaded,
        pipeline.store().pool_dir().display()
    );
    Ok(())
}

/// Wire the pipeline from config. `publishing` decides whether a real
/// browser is launched; fetch-only and dry runs make do without one.
async fn build_pipeline(config: Config, publishing: bool) -> Result<Pipeline> {
    let config = Arc::new(config);
    let client = Arc::new(PageClient::new(&config.source));
    let chain = AcquisitionChain::from_config(&config.source, client.clone());
    let store = AssetStore::new(&config.store.pool_dir)?;
    let assembler = Arc::new(SlideshowAssembler::from_config(&config.assembly));

    let wants_browser = publishing
        && (config.pinterest.iter().any(|t| t.enabled) || config.tiktok.iter().any(|t| t.enabled));
    let driver: Arc<dyn BrowserDriver> = if wants_browser {
        Arc::new(ChromiumDriver::launch(&config.automation).await?)
    } else {
        Arc::new(NoopDriver)
    };
    let dispatcher = PublishDispatcher::from_config(&config, driver);

    Ok(Pipeline::new(
        config, client, chain, store, assembler, dispatcher,
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode: trace for reelcast, debug for the browser wire
            "reelcast=trace,reelcast_av=trace,chromiumoxide=debug".to_string()
        } else {
            // Normal mode: debug for reelcast crates, quiet browser internals
            "reelcast=debug,reelcast_av=debug,chromiumoxide=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_scheduler(cli.config.as_deref()))
        }
        Commands::Run { dry_run } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_once(cli.config.as_deref(), dry_run))
        }
        Commands::Fetch => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(fetch(cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = reelcast_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    // The browser is probed separately; it only serves publishing.
    match find_chromium(None) {
        Some(path) => println!("✓ chromium - {}", path.display()),
        None => {
            all_ok = false;
            println!("✗ chromium");
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Product URLs: {}", config.source.product_urls.len());
            println!(
                "  Strategies: {}",
                config
                    .source
                    .strategies
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("  Pool: {}", config.store.pool_dir.display());
            println!("  Batch size: {}", config.store.batch_size);
            println!("  Cron: {}", config.schedule.cron);
            println!(
                "  Pinterest targets: {} ({} enabled)",
                config.pinterest.len(),
                config.pinterest.iter().filter(|t| t.enabled).count()
            );
            println!(
                "  TikTok targets: {} ({} enabled)",
                config.tiktok.len(),
                config.tiktok.iter().filter(|t| t.enabled).count()
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Batch size: {}", config.store.batch_size);
            println!("  Cron: {}", config.schedule.cron);
        }
    }

    Ok(())
}
