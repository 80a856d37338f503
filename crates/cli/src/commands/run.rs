//! `run` command implementation.

use anyhow::{Context, Result};
use clap::CommandFactory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use config_loader::{ConfigLoader, ConfigOutcome};
use contracts::{BridgeConfig, BridgeError, FetchMode, IngestMode, ServerAddress, TailEndpoint};
use ingestion::{IngestSource, PeriodicPull, TailReader};
use upstream::TcpUpstreamClient;

use crate::bridge::Bridge;
use crate::cli::{Cli, RunArgs};

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    let config = match resolve_config(args) {
        ConfigOutcome::Ready(config) => config,
        ConfigOutcome::HelpRequested(text) => {
            println!("{text}");
            return Ok(());
        }
        ConfigOutcome::Rejected(error) => {
            // Configuration errors surface the usage text before giving up.
            eprintln!("{}", Cli::command().render_usage());
            return Err(error).context("Invalid configuration");
        }
    };

    info!(
        channel = %config.channel,
        server = %config.server,
        mode = ?config.mode,
        "Configuration resolved"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!(port = args.metrics_port, "Metrics endpoint available");
    }

    if !config.autostart {
        confirm_start().await?;
    }

    let source = build_source(&config);
    let bridge = Bridge::new(config, source);

    // Signals flip a watch flag the loop observes at poll boundaries.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        warn!("Received shutdown signal, stopping bridge...");
        let _ = shutdown_tx.send(true);
    });

    info!("Starting bridge...");
    let report = bridge
        .run(shutdown_rx)
        .await
        .context("Bridge run failed")?;

    info!(
        frames = report.stats.frames_ingested,
        delivered = report.stats.datagrams_delivered,
        duration_secs = report.duration.as_secs_f64(),
        "Bridge completed"
    );
    report.print_summary();

    info!("streamcast finished");
    Ok(())
}

/// Assemble the configuration from an optional file plus flag overrides,
/// then run the single validation pass.
fn resolve_config(args: &RunArgs) -> ConfigOutcome {
    let mut config = if let Some(path) = &args.config {
        match ConfigLoader::parse_from_path(path) {
            Ok(config) => config,
            Err(error) => return ConfigOutcome::Rejected(error),
        }
    } else {
        let Some(channel) = args.channel.as_deref() else {
            return ConfigOutcome::Rejected(BridgeError::config_validation(
                "channel",
                "a channel name is required (pass --channel or a config file)",
            ));
        };
        BridgeConfig::new(channel)
    };

    if let Err(error) = apply_overrides(&mut config, args) {
        return ConfigOutcome::Rejected(error);
    }

    ConfigOutcome::from_config(config)
}

fn apply_overrides(config: &mut BridgeConfig, args: &RunArgs) -> Result<(), BridgeError> {
    if let Some(server) = &args.server {
        config.server = server.parse::<ServerAddress>()?;
    }
    if let Some(channel) = &args.channel {
        config.channel = channel.clone();
    }
    if let Some(port) = args.sender_port {
        config.sender_port = port;
    }
    if let Some(recipients) = &args.recipients {
        config.recipients = Some(recipients.clone());
    }
    if let Some(period) = args.fetch_period_ms {
        config.fetch_period_ms = period;
    }
    if let Some(endpoint) = &args.tail {
        config.mode = IngestMode::Tail {
            endpoint: endpoint.parse::<TailEndpoint>()?,
        };
    }
    if args.stream_from_oldest {
        config.stream_from_oldest = true;
    }
    if args.autostart {
        config.autostart = true;
    }
    if args.headless {
        config.headless = true;
    }
    if let Some(path) = &args.filter_file {
        config.filter_file = Some(path.clone());
    }
    if let Some(names) = &args.field_names {
        config.field_names = names
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
    }
    if let Some(backoff) = args.reconnect_backoff_ms {
        config.reconnect_backoff_ms = backoff;
    }
    if let Some(idle) = args.idle_interval_ms {
        config.idle_interval_ms = idle;
    }
    Ok(())
}

/// Pick the ingest cadence the configuration calls for.
fn build_source(config: &BridgeConfig) -> IngestSource<TcpUpstreamClient> {
    match &config.mode {
        IngestMode::Tail { endpoint } => IngestSource::Tail(TailReader::new(
            config.channel.as_str(),
            endpoint.clone(),
            config.stream_from_oldest,
            config.idle_interval(),
        )),
        IngestMode::Pull => {
            if config.stream_from_oldest {
                debug!("stream_from_oldest is recorded but has no effect in pull mode");
            }
            IngestSource::Pull(PeriodicPull::new(
                TcpUpstreamClient::new(format!("streamcast/{}", config.channel)),
                config.server.clone(),
                config.channel.as_str(),
                FetchMode::Newest,
                config.fetch_period(),
            ))
        }
    }
}

/// Wait for the operator to confirm the start.
async fn confirm_start() -> Result<()> {
    println!("Press Enter to start the bridge...");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read start confirmation")?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Channel: {}", config.channel);
    println!("Server: {}", config.server);
    match &config.mode {
        IngestMode::Pull => {
            println!("Mode: periodic pull (every {} ms)", config.fetch_period_ms);
        }
        IngestMode::Tail { endpoint } => {
            println!("Mode: tail {endpoint}");
        }
    }
    println!("Sender port: {}", config.sender_port);
    match &config.recipients {
        Some(list) => println!("Recipients: {list}"),
        None => println!(
            "Recipients: {}:{} (built-in default)",
            dissemination::DEFAULT_RECIPIENT_HOST,
            dissemination::DEFAULT_RECIPIENT_PORT
        ),
    }
    match &config.filter_file {
        Some(path) => println!("Filter file: {}", path.display()),
        None => println!("Filter file: (none)"),
    }
    println!(
        "Flags: stream_from_oldest={} autostart={} headless={}",
        config.stream_from_oldest, config.autostart, config.headless
    );
    println!();
}
