//! CLI argument parsing for rJMX-Collector
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: RJMX_CONFIG)
//! - `--port` / `-p`: Server port (overrides config file, env: RJMX_PORT)
//! - `--bind-address`: Server bind address (env: RJMX_BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: RJMX_METRICS_PATH)
//! - `--mode`: Host discovery mode, standalone or orchestrated (env: RJMX_MODE)
//! - `--bridge-host`: Bridge host in standalone mode (env: RJMX_BRIDGE_HOST)
//! - `--bridge-port`: Bridge port (env: RJMX_BRIDGE_PORT)
//! - `--validate`: Validate configuration without starting server
//! - `--once`: Run a single collection cycle and print the result
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: RJMX_LOG_LEVEL)
//! - `--output-format`: Output format for validate/once (text/json/yaml)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// rJMX-Collector - JMX bridge metrics discovery and extraction agent
///
/// Discovers JMX bridge hosts, walks every bean they expose and
/// publishes the numeric attributes in Prometheus format.
///
/// Environment variables can be used for all configuration options.
/// CLI arguments take precedence over environment variables,
/// which take precedence over config file values.
#[derive(Parser, Debug)]
#[command(name = "rjmx-collector")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "RJMX_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "RJMX_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "RJMX_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    /// Must start with '/'
    #[arg(long, value_name = "PATH", env = "RJMX_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Host discovery mode: standalone or orchestrated (overrides config file)
    #[arg(long, value_name = "MODE", env = "RJMX_MODE")]
    pub mode: Option<String>,

    /// Bridge host used in standalone mode (overrides config file)
    #[arg(long, value_name = "HOST", env = "RJMX_BRIDGE_HOST")]
    pub bridge_host: Option<String>,

    /// Bridge port (overrides config file)
    #[arg(long, value_name = "PORT", env = "RJMX_BRIDGE_PORT")]
    pub bridge_port: Option<u16>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Run one collection cycle, print the metrics and exit
    #[arg(long, conflicts_with = "validate")]
    pub once: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "RJMX_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Output format for --validate and --once
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref bind_address) = self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(ref path) = self.metrics_path {
            config.server.path = path.clone();
        }
        if let Some(ref mode) = self.mode {
            config.mode = mode.clone();
        }
        if let Some(ref host) = self.bridge_host {
            config.bridge.host = host.clone();
        }
        if let Some(port) = self.bridge_port {
            config.bridge.port = port;
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Output format options for validate and once modes
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Prometheus text exposition, or a readable summary for --validate
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Yaml.to_string(), "yaml");
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["rjmx-collector"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert_eq!(cli.port, None);
        assert_eq!(cli.bind_address, None);
        assert_eq!(cli.metrics_path, None);
        assert_eq!(cli.mode, None);
        assert_eq!(cli.bridge_host, None);
        assert_eq!(cli.bridge_port, None);
        assert!(!cli.validate);
        assert!(!cli.once);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_cli_with_options() {
        let cli = Cli::parse_from([
            "rjmx-collector",
            "-c",
            "custom.yaml",
            "-p",
            "8080",
            "--log-level",
            "debug",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.yaml"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(cli.validate);
    }

    #[test]
    fn test_cli_once_json() {
        let cli = Cli::parse_from(["rjmx-collector", "--once", "--output-format", "json"]);
        assert!(cli.once);
        assert_eq!(cli.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_once_conflicts_with_validate() {
        assert!(Cli::try_parse_from(["rjmx-collector", "--once", "--validate"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "rjmx-collector",
            "--port",
            "9191",
            "--bind-address",
            "127.0.0.1",
            "--metrics-path",
            "/jmx",
            "--mode",
            "orchestrated",
            "--bridge-host",
            "10.0.0.5",
            "--bridge-port",
            "8779",
        ]);

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.path, "/jmx");
        assert_eq!(config.mode, "orchestrated");
        assert_eq!(config.bridge.host, "10.0.0.5");
        assert_eq!(config.bridge.port, 8779);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let cli = Cli::parse_from(["rjmx-collector"]);
        let mut config = Config::default();
        config.bridge.host = "bridge.local".to_string();
        cli.apply_overrides(&mut config);

        assert_eq!(config.bridge.host, "bridge.local");
        assert_eq!(config.server.port, 9090);
    }
}
