//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a ready-to-run `BridgeConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("bridge.toml")).unwrap();
//! println!("Channel: {}", config.channel);
//! ```

mod parser;
mod validator;

pub use contracts::BridgeConfig;
pub use parser::ConfigFormat;

use contracts::BridgeError;
use std::path::Path;

/// Final outcome of assembling the startup configuration from files and
/// arguments.
///
/// A help request is an ordinary outcome of argument handling, not an error:
/// callers print the usage text and exit cleanly instead of reporting a
/// failure.
#[derive(Debug)]
pub enum ConfigOutcome {
    /// Configuration parsed and validated; the bridge may start
    Ready(BridgeConfig),
    /// The operator asked for usage text, carried here already rendered
    HelpRequested(String),
    /// Configuration is unusable; fatal before any connection attempt
    Rejected(BridgeError),
}

impl ConfigOutcome {
    /// Run validation over an assembled configuration and wrap the result.
    pub fn from_config(config: BridgeConfig) -> Self {
        match validator::validate(&config) {
            Ok(()) => Self::Ready(config),
            Err(e) => Self::Rejected(e),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path
    ///
    /// Automatically detects format from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BridgeConfig, BridgeError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeConfig, BridgeError> {
        Self::parse_and_validate(content, format)
    }

    /// Parse configuration from a file without validating it.
    ///
    /// For flows that overlay further settings on top of the file (CLI
    /// flags, environment) before a single validation pass at the end.
    pub fn parse_from_path(path: &Path) -> Result<BridgeConfig, BridgeError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        parser::parse(&content, format)
    }

    /// Validate an already-assembled configuration (e.g. built from CLI
    /// arguments without a file).
    pub fn validate(config: &BridgeConfig) -> Result<(), BridgeError> {
        validator::validate(config)
    }

    /// Serialize a BridgeConfig to a TOML string
    pub fn to_toml(config: &BridgeConfig) -> Result<String, BridgeError> {
        toml::to_string_pretty(config)
            .map_err(|e| BridgeError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a BridgeConfig to a JSON string
    pub fn to_json(config: &BridgeConfig) -> Result<String, BridgeError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| BridgeError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from the file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, BridgeError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            BridgeError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| BridgeError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, BridgeError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeConfig, BridgeError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
