//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use admission::FilterSet;
use config_loader::ConfigLoader;
use contracts::{BridgeConfig, IngestMode};
use dissemination::RecipientRegistry;

use crate::cli::InfoArgs;

/// Resolved configuration for JSON output
#[derive(Debug, Serialize)]
struct ConfigInfo {
    channel: String,
    server: String,
    mode: String,
    sender_port: u16,
    fetch_period_ms: u64,
    reconnect_backoff_ms: u64,
    idle_interval_ms: u64,
    stream_from_oldest: bool,
    autostart: bool,
    headless: bool,
    recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    field_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<FilterInfo>,
}

#[derive(Debug, Serialize)]
struct FilterInfo {
    channel: String,
    min_value: f64,
    max_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_index: Option<usize>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args)?;

    if args.json {
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig, args: &InfoArgs) -> Result<ConfigInfo> {
    let registry = RecipientRegistry::from_option(config.recipients.as_deref())
        .context("Recipient list is unusable")?;
    let recipients = registry
        .recipients()
        .iter()
        .map(|recipient| recipient.identity())
        .collect();

    let filters = if args.filters {
        let mut set = match &config.filter_file {
            Some(path) => admission::load_filter_file(path).context("Failed to load filter file")?,
            None => FilterSet::default(),
        };
        set.bind_fields(&config.field_names);
        set.filters()
            .iter()
            .map(|filter| FilterInfo {
                channel: filter.channel().to_string(),
                min_value: filter.min_value(),
                max_value: filter.max_value(),
                field_index: filter.index(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let mode = match &config.mode {
        IngestMode::Pull => "pull".to_string(),
        IngestMode::Tail { endpoint } => format!("tail {endpoint}"),
    };

    Ok(ConfigInfo {
        channel: config.channel.clone(),
        server: config.server.to_string(),
        mode,
        sender_port: config.sender_port,
        fetch_period_ms: config.fetch_period_ms,
        reconnect_backoff_ms: config.reconnect_backoff_ms,
        idle_interval_ms: config.idle_interval_ms,
        stream_from_oldest: config.stream_from_oldest,
        autostart: config.autostart,
        headless: config.headless,
        recipients,
        filter_file: config
            .filter_file
            .as_ref()
            .map(|path| path.display().to_string()),
        field_names: config.field_names.clone(),
        filters,
    })
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   streamcast Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Ingest");
    println!("   ├─ Channel: {}", info.channel);
    println!("   ├─ Server: {}", info.server);
    println!("   ├─ Mode: {}", info.mode);
    println!("   ├─ Fetch period: {} ms", info.fetch_period_ms);
    println!("   ├─ Idle interval: {} ms", info.idle_interval_ms);
    println!("   ├─ Reconnect backoff: {} ms", info.reconnect_backoff_ms);
    println!("   └─ Stream from oldest: {}", info.stream_from_oldest);

    println!("\nDissemination");
    println!("   ├─ Sender port: {}", info.sender_port);
    println!("   └─ Recipients ({})", info.recipients.len());
    for (i, recipient) in info.recipients.iter().enumerate() {
        let prefix = if i == info.recipients.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("      {} {}", prefix, recipient);
    }

    println!("\nAdmission");
    match &info.filter_file {
        Some(path) => println!("   ├─ Filter file: {}", path),
        None => println!("   ├─ Filter file: (none)"),
    }
    if info.field_names.is_empty() {
        println!("   └─ Field names: (none)");
    } else {
        println!("   └─ Field names: {}", info.field_names.join(", "));
    }
    for (i, filter) in info.filters.iter().enumerate() {
        let prefix = if i == info.filters.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        let bound = match filter.field_index {
            Some(index) => format!("field {index}"),
            None => "unbound".to_string(),
        };
        println!(
            "      {} {} in [{}, {}] ({})",
            prefix, filter.channel, filter.min_value, filter.max_value, bound
        );
    }

    println!("\nControl");
    println!("   ├─ Autostart: {}", info.autostart);
    println!("   └─ Headless: {}", info.headless);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_info_resolves_the_default_recipient() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "channel = \"met/wind\"").unwrap();

        let args = InfoArgs {
            config: file.path().to_path_buf(),
            json: false,
            filters: false,
        };
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        let info = build_config_info(&config, &args).unwrap();

        assert_eq!(info.channel, "met/wind");
        assert_eq!(info.recipients, vec!["localhost:5555"]);
        assert_eq!(info.mode, "pull");
        assert!(info.filters.is_empty());
    }

    #[test]
    fn test_info_lists_bound_filters() {
        let mut filter_file = Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(filter_file, "wind 0 25").unwrap();

        let mut config_file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            config_file,
            "channel = \"met/wind\"\nfilter_file = \"{}\"\nfield_names = [\"wind\"]\n",
            filter_file.path().display()
        )
        .unwrap();

        let args = InfoArgs {
            config: config_file.path().to_path_buf(),
            json: false,
            filters: true,
        };
        let config = ConfigLoader::load_from_path(config_file.path()).unwrap();
        let info = build_config_info(&config, &args).unwrap();

        assert_eq!(info.filters.len(), 1);
        assert_eq!(info.filters[0].channel, "wind");
        assert_eq!(info.filters[0].field_index, Some(0));
    }
}
