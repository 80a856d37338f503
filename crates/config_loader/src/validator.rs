//! Configuration validation.
//!
//! Rules:
//! - channel name is non-blank
//! - server host is non-empty
//! - sender_port is non-zero
//! - headless implies autostart
//! - a filter file needs a field-name schema to bind against
//! - a tail endpoint address/path is non-empty

use contracts::{BridgeConfig, BridgeError, IngestMode, TailEndpoint};

/// Validate a BridgeConfig.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &BridgeConfig) -> Result<(), BridgeError> {
    validate_channel(config)?;
    validate_server(config)?;
    validate_sender_port(config)?;
    validate_headless_policy(config)?;
    validate_filter_schema(config)?;
    validate_tail_endpoint(config)?;
    Ok(())
}

fn validate_channel(config: &BridgeConfig) -> Result<(), BridgeError> {
    if config.channel.trim().is_empty() {
        return Err(BridgeError::config_validation(
            "channel",
            "channel name cannot be blank",
        ));
    }
    Ok(())
}

fn validate_server(config: &BridgeConfig) -> Result<(), BridgeError> {
    if config.server.host.is_empty() {
        return Err(BridgeError::config_validation(
            "server",
            "server host cannot be empty",
        ));
    }
    Ok(())
}

fn validate_sender_port(config: &BridgeConfig) -> Result<(), BridgeError> {
    if config.sender_port == 0 {
        return Err(BridgeError::config_validation(
            "sender_port",
            "sender port cannot be 0",
        ));
    }
    Ok(())
}

/// Headless runs have no interactive confirmation path, so everything needed
/// to start must already be decided.
fn validate_headless_policy(config: &BridgeConfig) -> Result<(), BridgeError> {
    if config.headless && !config.autostart {
        return Err(BridgeError::config_validation(
            "headless",
            "headless mode requires autostart",
        ));
    }
    Ok(())
}

/// Filters bind to record positions through the field-name schema; a filter
/// file without one would silently cull every filter.
fn validate_filter_schema(config: &BridgeConfig) -> Result<(), BridgeError> {
    if config.filter_file.is_some() && config.field_names.is_empty() {
        return Err(BridgeError::config_validation(
            "field_names",
            "filter_file requires field_names to bind filters against",
        ));
    }
    Ok(())
}

fn validate_tail_endpoint(config: &BridgeConfig) -> Result<(), BridgeError> {
    if let IngestMode::Tail { endpoint } = &config.mode {
        match endpoint {
            TailEndpoint::Tcp { addr } if addr.trim().is_empty() => {
                return Err(BridgeError::config_validation(
                    "mode.endpoint",
                    "tail tcp endpoint address cannot be empty",
                ));
            }
            TailEndpoint::File { path } if path.as_os_str().is_empty() => {
                return Err(BridgeError::config_validation(
                    "mode.endpoint",
                    "tail file endpoint path cannot be empty",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn minimal_config() -> BridgeConfig {
        BridgeConfig::new("met/wind")
    }

    #[test]
    fn test_valid_config() {
        let config = minimal_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_blank_channel() {
        let mut config = minimal_config();
        config.channel = "   ".into();
        let result = validate(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("channel"), "got: {err}");
    }

    #[test]
    fn test_zero_sender_port() {
        let mut config = minimal_config();
        config.sender_port = 0;
        let result = validate(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("sender_port"), "got: {err}");
    }

    #[test]
    fn test_headless_without_autostart() {
        let mut config = minimal_config();
        config.headless = true;
        config.autostart = false;
        let result = validate(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("autostart"), "got: {err}");
    }

    #[test]
    fn test_headless_with_autostart() {
        let mut config = minimal_config();
        config.headless = true;
        config.autostart = true;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_filter_file_without_field_names() {
        let mut config = minimal_config();
        config.filter_file = Some(PathBuf::from("filters.txt"));
        let result = validate(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("field_names"), "got: {err}");
    }

    #[test]
    fn test_filter_file_with_field_names() {
        let mut config = minimal_config();
        config.filter_file = Some(PathBuf::from("filters.txt"));
        config.field_names = vec!["speed".into()];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_tail_endpoint() {
        let mut config = minimal_config();
        config.mode = IngestMode::Tail {
            endpoint: TailEndpoint::Tcp { addr: "  ".into() },
        };
        assert!(validate(&config).is_err());
    }
}
