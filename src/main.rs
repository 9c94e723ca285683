//! rJMX-Collector - JMX bridge metrics discovery and extraction agent
//!
//! This binary discovers JMX bridge hosts, collects every numeric bean
//! attribute they expose and serves the result in Prometheus format.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rjmx_collector::cli::{Cli, OutputFormat};
use rjmx_collector::collector::Collector;
use rjmx_collector::config::Config;
use rjmx_collector::metrics::CollectorMetrics;
use rjmx_collector::server;
use rjmx_collector::transformer::PrometheusExposition;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rjmx_collector::init_logging(&cli.log_level.to_string())?;

    let mut config = Config::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.validate {
        print_summary(&config, cli.output_format)?;
        return Ok(());
    }

    if cli.once {
        return run_once(&config, cli.output_format).await;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.mode,
        formatter = %config.formatter.kind,
        "Starting rJMX-Collector"
    );

    server::run(config).await
}

/// Print the effective configuration
fn print_summary(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Configuration is valid");
            println!("  mode:             {}", config.mode);
            println!(
                "  bridge:           {}:{}/{}",
                config.bridge.host, config.bridge.port, config.bridge.url_path
            );
            println!("  formatter:        {}", config.formatter.kind);
            println!("  whitelist:        {} entries", config.mbeans.len());
            println!("  domain blacklist: {} entries", config.domain_blacklist.len());
            println!("  mbean blacklist:  {} entries", config.mbean_blacklist.len());
            println!("  rewrites:         {}", config.rewrite.len());
            println!(
                "  listening on:     {}:{}{}",
                config.server.bind_address, config.server.port, config.server.path
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}

/// Run a single collection cycle and print the batches
async fn run_once(config: &Config, format: OutputFormat) -> Result<()> {
    let mut collector = Collector::from_config(config, Arc::new(CollectorMetrics::new()))?;
    let batches = collector.collect().await;

    match format {
        OutputFormat::Text => {
            let samples = PrometheusExposition::samples_from_batches(&batches);
            print!("{}", PrometheusExposition::new().format(&samples));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batches)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&batches)?),
    }
    Ok(())
}
