//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use admission::FilterSet;
use config_loader::ConfigLoader;
use contracts::{BridgeConfig, IngestMode};
use dissemination::{RecipientRegistry, DEFAULT_RECIPIENT_HOST, DEFAULT_RECIPIENT_PORT};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

impl ValidationResult {
    fn invalid(config_path: String, error: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(error),
            warnings: None,
            summary: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    channel: String,
    server: String,
    mode: String,
    recipient_count: usize,
    filter_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult::invalid(
            config_path,
            format!("File not found: {}", args.config.display()),
        );
    }

    let config = match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => config,
        Err(e) => return ValidationResult::invalid(config_path, e.to_string()),
    };

    // Exercise the same startup checks the bridge performs.
    let registry = match RecipientRegistry::from_option(config.recipients.as_deref()) {
        Ok(registry) => registry,
        Err(e) => return ValidationResult::invalid(config_path, e.to_string()),
    };

    let mut filters = match &config.filter_file {
        Some(path) => match admission::load_filter_file(path) {
            Ok(filters) => filters,
            Err(e) => return ValidationResult::invalid(config_path, e.to_string()),
        },
        None => FilterSet::default(),
    };
    filters.bind_fields(&config.field_names);

    let warnings = collect_warnings(&config, &filters);

    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            channel: config.channel.clone(),
            server: config.server.to_string(),
            mode: describe_mode(&config),
            recipient_count: registry.len(),
            filter_count: filters.len(),
        }),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig, filters: &FilterSet) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.recipients.is_none() {
        warnings.push(format!(
            "No recipients configured - frames go to the built-in default {}:{}",
            DEFAULT_RECIPIENT_HOST, DEFAULT_RECIPIENT_PORT
        ));
    }

    if !config.mode.is_tail() && config.fetch_period_ms == 0 {
        warnings.push("fetch_period is 0 - the bridge will pull as fast as possible".to_string());
    }

    if !config.mode.is_tail() && config.stream_from_oldest {
        warnings.push("stream_from_oldest has no effect in pull mode".to_string());
    }

    if config.filter_file.is_some() && filters.is_empty() {
        warnings.push(
            "the filter file yielded no usable filters - every record will be admitted"
                .to_string(),
        );
    }

    warnings
}

fn describe_mode(config: &BridgeConfig) -> String {
    match &config.mode {
        IngestMode::Pull => format!("pull every {} ms", config.fetch_period_ms),
        IngestMode::Tail { endpoint } => format!("tail {endpoint}"),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Channel: {}", summary.channel);
            println!("  Server: {}", summary.server);
            println!("  Mode: {}", summary.mode);
            println!("  Recipients: {}", summary.recipient_count);
            println!("  Filters: {}", summary.filter_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
