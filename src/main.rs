mod cli;

use slidequeue::{
    config::{self, Config, ProviderMode},
    navigation::NavigationController,
    queue::QueueManager,
    registry::SessionRegistry,
    signal::ScanSignal,
    source::{LocalSource, MediaSource},
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "slidequeue=trace,slidequeue_common=debug".to_string()
        } else {
            "slidequeue=debug,slidequeue_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan { root, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan(&root, cli.config.as_deref(), json))
        }
        Commands::Play {
            root,
            mode,
            count,
            interval_ms,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(
                &root,
                cli.config.as_deref(),
                mode.as_deref(),
                count,
                Duration::from_millis(interval_ms),
            ))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("slidequeue {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config and point it at `root`.
fn session_config(root: &Path, config_path: Option<&Path>, mode: Option<&str>) -> Result<Config> {
    let mut config = config::load_config_or_default(config_path)?;
    config.engine.root = Some(root.to_string_lossy().into_owned());
    if let Some(mode) = mode {
        config.engine.mode = mode.parse::<ProviderMode>().map_err(anyhow::Error::msg)?;
    }
    Ok(config)
}

async fn scan(root: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !root.is_dir() {
        anyhow::bail!("Root is not a directory: {:?}", root);
    }
    let config = Arc::new(session_config(root, config_path, Some("random"))?.resolve()?);
    let source: Arc<dyn MediaSource> = Arc::new(LocalSource::new());

    tracing::info!("Scanning {}", root.display());
    let queue = QueueManager::new(config, source, SessionRegistry::new(), ScanSignal::new())?;
    let ready = queue.initialize().await?;
    let stats = queue.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Root: {}", root.display());
    println!("State: {:?}", stats.state);
    println!("Folders: {}", stats.folders);
    println!("Files: {}", stats.known);
    println!("Queued: {}", stats.pending);
    println!("Estimated total: {}", stats.estimated_total);
    if !ready {
        println!("\nNothing to show under this root.");
    }
    Ok(())
}

async fn play(
    root: &Path,
    config_path: Option<&Path>,
    mode: Option<&str>,
    count: usize,
    interval: Duration,
) -> Result<()> {
    let config = session_config(root, config_path, mode)?.resolve()?;
    let source: Arc<dyn MediaSource> = Arc::new(LocalSource::new());
    let registry = SessionRegistry::new();

    let mut nav = NavigationController::new(config, source, registry)?;
    if !nav.initialize().await? {
        println!("Nothing to show under {}", root.display());
        return Ok(());
    }
    tracing::info!("Playing {} in {} mode", root.display(), nav.mode());

    for shown in 1..=count {
        let Some(item) = nav.next().await else {
            println!("Nothing left to show.");
            break;
        };
        let position = nav.current_position();
        println!(
            "[{}/{}] {} ({})",
            position.index.map_or(0, |i| i + 1),
            position.total,
            item.id,
            item.kind
        );

        if shown < count && !interval.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }
    }

    nav.detach().await;
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let engine = config.resolve()?;
    println!("  Mode: {}", engine.mode);
    println!("  Root: {}", engine.root.as_deref().unwrap_or("(from command line)"));
    println!("  Target queue size: {}", engine.sampling.target_queue_size);
    println!("  Window: {} (bound {})", engine.navigation.window_size, engine.window_bound());
    println!("  History capacity: {}", engine.history_capacity());
    println!("  Priority patterns: {}", engine.priority.len());
    for warning in config.warnings() {
        println!("  ! {}", warning);
    }

    Ok(())
}
