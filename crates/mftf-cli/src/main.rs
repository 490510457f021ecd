//! mftf CLI - admin-UI test helpers from the command line
//!
//! Usage:
//!   mftf init                          Write a default .mftf/config.toml
//!   mftf cron [GROUPS...]              Run cron through the CLI bridge
//!   mftf cli <COMMAND>                 Run one console command through the CLI bridge
//!   mftf wait <URL>                    Open a page and wait until it is idle
//!   mftf drag <URL> <SOURCE> <TARGET>  Open a page and drag one element onto another
//!   mftf delete <URL>                  Delete an entity through the REST web API

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mftf_browser::{
    am_on_page, drag_and_drop, BrowserConfig, BrowserSession, IdleWaitProtocol,
};
use mftf_core::{timeout_from_secs, Locator, MftfConfig, SystemClock};
use mftf_remote::{
    AdminTokenProvider, CliBridge, CommandExecutor, CronThrottleScheduler, EnvToken, WebApiAuth,
    WebApiClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mftf")]
#[command(author, version, about = "Admin-UI test helpers: idle waits, drag and drop, CLI bridge")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to .mftf/config.toml in the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .mftf/config.toml
    Init {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run cron for the given groups (all groups when none are given)
    Cron {
        /// Cron groups to run
        groups: Vec<String>,

        /// Command timeout in seconds, passed to the backend
        #[arg(long)]
        timeout: Option<u64>,

        /// Extra arguments passed to the backend
        #[arg(long)]
        arguments: Option<String>,
    },

    /// Run one console command through the CLI bridge
    Cli {
        /// Command line, e.g. "cache:flush full_page"
        command: String,

        /// Command timeout in seconds, passed to the backend
        #[arg(long)]
        timeout: Option<u64>,

        /// Extra arguments passed to the backend
        #[arg(long)]
        arguments: Option<String>,
    },

    /// Open a page and wait until it is idle
    Wait {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Open a page, wait for it, and drag SOURCE onto TARGET
    Drag {
        #[command(flatten)]
        page: PageArgs,

        /// Element to drag (XPath, or CSS; `xpath=` / `css=` prefixes force one)
        source: Locator,

        /// Element to drop onto
        target: Locator,

        /// Horizontal drop offset from the target's top-left corner
        #[arg(long, allow_hyphen_values = true)]
        x_offset: Option<f64>,

        /// Vertical drop offset from the target's top-left corner
        #[arg(long, allow_hyphen_values = true)]
        y_offset: Option<f64>,
    },

    /// Delete an entity through the REST web API
    Delete {
        /// Entity URL, e.g. /V1/products/simple-1 (resolved under <url>/rest/)
        url: String,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    /// Page URL; a path is resolved against the configured base url
    url: String,

    /// Resolve the path against the admin area (`<url>/<backend_name>/`) instead
    #[arg(long)]
    admin: bool,

    /// Idle-wait timeout in seconds (defaults to the configured page-load timeout)
    #[arg(long)]
    timeout: Option<f64>,

    /// Attach to a Chrome already listening on this debugging port instead of launching one
    #[arg(long)]
    port: Option<u16>,

    /// Launch Chrome with a visible window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config;
    match cli.command {
        Commands::Init { path } => cmd_init(path).await,
        Commands::Cron {
            groups,
            timeout,
            arguments,
        } => {
            let config = load_config(config_path)?;
            cmd_cron(&config, groups, timeout, arguments).await
        }
        Commands::Cli {
            command,
            timeout,
            arguments,
        } => {
            let config = load_config(config_path)?;
            cmd_cli(&config, command, timeout, arguments).await
        }
        Commands::Wait { page } => {
            let config = load_config(config_path)?;
            cmd_wait(&config, page).await
        }
        Commands::Drag {
            page,
            source,
            target,
            x_offset,
            y_offset,
        } => {
            let config = load_config(config_path)?;
            cmd_drag(&config, page, source, target, x_offset, y_offset).await
        }
        Commands::Delete { url } => {
            let config = load_config(config_path)?;
            cmd_delete(&config, url).await
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<MftfConfig> {
    let config = match path {
        Some(path) => {
            let mut config = MftfConfig::from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides()?;
            config
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            MftfConfig::load_or_default(&cwd)?
        }
    };

    config.validate()?;
    debug!("Using base url {}", config.url);
    Ok(config)
}

/// Web API auth when admin credentials are configured, `MAGENTO_ADMIN_TOKEN` otherwise
fn token_provider(config: &MftfConfig) -> Result<Arc<dyn AdminTokenProvider>> {
    if config.admin.username.is_some() && config.admin.password.is_some() {
        Ok(Arc::new(WebApiAuth::from_config(config)?))
    } else {
        Ok(Arc::new(EnvToken))
    }
}

fn cli_bridge(config: &MftfConfig) -> Result<CliBridge> {
    let bridge = CliBridge::from_config(config, token_provider(config)?)
        .context("Failed to set up CLI bridge")?;
    debug!("CLI endpoint: {}", bridge.endpoint());
    Ok(bridge)
}

/// Base url the page path is resolved against
fn page_base_url(config: &MftfConfig, page: &PageArgs) -> String {
    if page.admin {
        config.backend_url()
    } else {
        config.url.clone()
    }
}

async fn launch_browser(page: &PageArgs) -> Result<BrowserSession> {
    let session = match page.port {
        Some(port) => BrowserSession::connect(port)
            .await
            .with_context(|| format!("Failed to connect to Chrome on port {}", port))?,
        None => BrowserSession::launch_with_config(BrowserConfig {
            headless: !page.headed,
            ..BrowserConfig::default()
        })
        .await
        .context("Failed to launch Chrome")?,
    };
    Ok(session)
}

/// `--timeout` when given, the configured page-load timeout otherwise
fn page_timeout(config: &MftfConfig, page: &PageArgs) -> Result<Duration> {
    match page.timeout {
        Some(secs) => timeout_from_secs(secs).context("Invalid --timeout"),
        None => Ok(config.pageload_timeout()),
    }
}

/// Open the page and wait until it is idle, returning the URL that was loaded
async fn open_page(
    session: &BrowserSession,
    config: &MftfConfig,
    page: &PageArgs,
    timeout: Duration,
) -> Result<String> {
    let base_url = page_base_url(config, page);
    let url = am_on_page(session, &SystemClock, &base_url, &page.url, timeout)
        .await
        .with_context(|| format!("Failed to open {}", page.url))?;
    Ok(url)
}

async fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing mftf in {:?}", path);

    MftfConfig::write_default(&path).context("Failed to write default config")?;

    println!("Initialized mftf in {:?}", path);
    println!("Created:");
    println!("  .mftf/config.toml");
    println!();
    println!("Set `url` (or MAGENTO_BASE_URL) before running cron, cli, wait or drag.");
    Ok(())
}

async fn cmd_cron(
    config: &MftfConfig,
    groups: Vec<String>,
    timeout: Option<u64>,
    arguments: Option<String>,
) -> Result<()> {
    let bridge = cli_bridge(config)?;
    let mut scheduler =
        CronThrottleScheduler::from_config(config, Arc::new(bridge), Arc::new(SystemClock));

    let output = scheduler
        .run_cron_groups(&groups, timeout, arguments.as_deref())
        .await
        .context("Cron run failed")?;

    println!("{}", output);
    Ok(())
}

async fn cmd_cli(
    config: &MftfConfig,
    command: String,
    timeout: Option<u64>,
    arguments: Option<String>,
) -> Result<()> {
    let bridge = cli_bridge(config)?;

    let output = bridge
        .execute(&command, timeout, arguments.as_deref())
        .await
        .with_context(|| format!("Command failed: {}", command))?;

    println!("{}", output);
    Ok(())
}

async fn cmd_wait(config: &MftfConfig, page: PageArgs) -> Result<()> {
    let timeout = page_timeout(config, &page)?;
    let session = launch_browser(&page).await?;

    let started = std::time::Instant::now();
    let url = open_page(&session, config, &page, timeout).await?;

    println!("{} idle after {:.2}s", url, started.elapsed().as_secs_f64());
    session.close().await?;
    Ok(())
}

async fn cmd_drag(
    config: &MftfConfig,
    page: PageArgs,
    source: Locator,
    target: Locator,
    x_offset: Option<f64>,
    y_offset: Option<f64>,
) -> Result<()> {
    let timeout = page_timeout(config, &page)?;
    let session = launch_browser(&page).await?;
    open_page(&session, config, &page, timeout).await?;

    let ops = drag_and_drop(&session, &source, &target, x_offset, y_offset)
        .await
        .with_context(|| format!("Failed to drag {} onto {}", source, target))?;
    IdleWaitProtocol::new(&session, &SystemClock, timeout)
        .wait_for_page_load(None)
        .await?;

    if tracing::enabled!(Level::DEBUG) {
        debug!("Performed: {}", serde_json::to_string(&ops)?);
    }
    println!("Dragged {} onto {} ({} pointer actions)", source, target, ops.len());

    session.close().await?;
    Ok(())
}

async fn cmd_delete(config: &MftfConfig, url: String) -> Result<()> {
    let api = WebApiClient::from_config(config, token_provider(config)?);

    let body = api
        .delete_entity_by_url(&url)
        .await
        .with_context(|| format!("Failed to delete {}", url))?;

    println!("{}", body);
    Ok(())
}
