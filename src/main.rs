// src/main.rs
use anyhow::Context;
use clap::Parser;
use cloudsync::providers::ProviderRegistry;
use cloudsync::{
    BuildContext, Catalog, CommandLineInput, ExecutionClient, RegionMode, RunConfig,
    StaticRegionCatalog,
};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging configuration.
///
/// Console output goes to stderr so stdout stays clean for the JSON result.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("cloudsync.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Loads configuration, runs one synchronization and delivers its JSON.
async fn execute_sync(config: &RunConfig) -> anyhow::Result<()> {
    let catalog = Arc::new(
        Catalog::from_dir(&config.config_dir)
            .with_context(|| format!("loading providers from {}", config.config_dir.display()))?,
    );

    let regions = match &config.regions_file {
        Some(path) => StaticRegionCatalog::from_file(path)
            .with_context(|| format!("loading regions from {}", path.display()))?,
        None => {
            if config.region_mode == RegionMode::AllRegions {
                log::warn!("Region mode 'all' without --regions: no region will be queried");
            }
            StaticRegionCatalog::new()
        }
    };

    let registry = ProviderRegistry::builtin(&catalog)?;
    let ctx = BuildContext::new(catalog, Arc::new(regions));
    let client = ExecutionClient::with_workers(ctx, registry, config.concurrency);

    let request = config.logical_request()?;
    let response = client.execute(&request).await?;
    for fault in response.faults() {
        log::warn!("Provider fault: {}", fault);
    }

    let json = response.to_json();
    let rendered = if config.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };

    match &config.output_file {
        Some(path) => {
            fs::write(path, rendered + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "✓ {} of {} record(s) written to {}",
                response.current(),
                response.total(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = RunConfig::resolve(cli)?;

    execute_sync(&config).await?;

    Ok(())
}
