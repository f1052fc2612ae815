// src/config.rs
use crate::constants::{CONFIG_DIR_ENV, DEFAULT_CONFIG_DIR};
use crate::error::SyncError;
use crate::request::{LogicalRequest, RegionMode};
use crate::types::{parse_param, ActionId, Params, ProviderId};
use clap::Parser;
use std::path::PathBuf;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Provider to synchronize (e.g., "alicloud", "qcloud")
    pub provider: String,

    /// Action to run (e.g., "query_hosts", "operation_stop_hosts")
    pub action: String,

    /// Directory holding one <provider>.yaml per provider (defaults to $CLOUDSYNC_CONFIG_DIR, then "config/providers")
    #[arg(short = 'c', long)]
    pub config_dir: Option<String>,

    /// YAML file mapping each provider to its region codes
    #[arg(short = 'r', long)]
    pub regions: Option<String>,

    /// Region fan-out: "single", "all" or "massive"
    #[arg(short = 'm', long, default_value = "single")]
    pub region_mode: String,

    /// Known record count; paginated actions fetch all pages at once
    #[arg(long)]
    pub hint: Option<u64>,

    /// Request parameter as KEY=VALUE; repeatable. JSON values are accepted
    #[arg(short = 'P', long = "param")]
    pub params: Vec<String>,

    /// Number of concurrent leaf workers (default: auto, max 64)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output file for the canonical JSON (defaults to stdout)
    #[arg(short, long)]
    pub output_file: Option<String>,

    /// Write compact JSON instead of pretty-printed
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved run configuration, validated and ready to drive one sync.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub provider: ProviderId,
    pub action: ActionId,
    pub config_dir: PathBuf,
    pub regions_file: Option<PathBuf>,
    pub region_mode: RegionMode,
    pub record_count_hint: u64,
    pub params: Params,
    pub concurrency: Option<usize>,
    pub output_file: Option<PathBuf>,
    pub compact: bool,
    pub verbose: bool,
}

impl RunConfig {
    /// Resolves a run configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, SyncError> {
        Self::resolve_with(cli, std::env::var(CONFIG_DIR_ENV).ok())
    }

    /// Like [`resolve`](Self::resolve) with the environment's config
    /// directory passed in.
    pub fn resolve_with(cli: CommandLineInput, env_dir: Option<String>) -> Result<Self, SyncError> {
        let provider = ProviderId::parse(&cli.provider)?;
        let action = ActionId::parse(&cli.action)?;
        let region_mode: RegionMode = cli.region_mode.parse()?;

        let config_dir = cli
            .config_dir
            .or(env_dir.filter(|dir| !dir.trim().is_empty()))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

        let mut params = Params::new();
        for raw in &cli.params {
            let (key, value) = parse_param(raw)?;
            params.insert(key, value);
        }

        if cli.concurrency == Some(0) {
            return Err(SyncError::config("--concurrency must be at least 1"));
        }

        Ok(RunConfig {
            provider,
            action,
            config_dir,
            regions_file: cli.regions.map(PathBuf::from),
            region_mode,
            record_count_hint: cli.hint.unwrap_or(0),
            params,
            concurrency: cli.concurrency,
            output_file: cli.output_file.map(PathBuf::from),
            compact: cli.compact,
            verbose: cli.verbose,
        })
    }

    /// The logical request this run executes.
    pub fn logical_request(&self) -> Result<LogicalRequest, SyncError> {
        LogicalRequest::builder(self.provider.clone(), self.action.clone())
            .region_mode(self.region_mode)
            .record_count_hint(self.record_count_hint)
            .params(self.params.clone())
            .build()
    }
}
