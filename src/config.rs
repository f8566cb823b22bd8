//! Runtime configuration for the staking identity generator.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::api::{UploadOptions, DEFAULT_POP_VERIFY_URL};
use crate::matcher::SearchConstraint;
use crate::output::OutputTarget;
use crate::worker::RoundSettings;

/// Validator staking identity generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate node identities, optionally matching a vanity node ID pattern
    Generate(GenerateConfig),
    /// Convert a JSON node file into per-node staking directories
    Convert(ConvertConfig),
    /// Verify the BLS proof-of-possession of every node in a JSON node file
    Verify(VerifyConfig),
    /// Upload nodes from a JSON node file to the provider API
    Upload(UploadConfig),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateConfig {
    /// Number of node identities to generate
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Required node ID prefix (after "NodeID-")
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Required node ID suffix
    #[arg(short, long, default_value = "")]
    pub suffix: String,

    /// Case sensitive matching
    #[arg(short = 'c', long)]
    pub case_sensitive: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Active provider label attached to every generated node
    #[arg(short = 'a', long)]
    pub active_provider: Option<String>,

    /// Output file (.csv or .json) or staking directory (single node only)
    #[arg(short, long, default_value = "nodes.csv")]
    pub output: PathBuf,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "1")]
    pub report_interval: u64,

    /// Give up on a node after this many attempts
    #[arg(long)]
    pub max_attempts: Option<u64>,

    /// Give up on a node after this many seconds
    #[arg(long)]
    pub max_duration: Option<u64>,
}

impl GenerateConfig {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }

    /// Returns the search constraint (normalized for case sensitivity)
    pub fn constraint(&self) -> SearchConstraint {
        SearchConstraint::new(self.prefix.as_str(), self.suffix.as_str(), self.case_sensitive)
    }

    /// Returns where and how results are written
    pub fn output_target(&self) -> Result<OutputTarget, ConfigError> {
        OutputTarget::from_path(&self.output, self.count)
    }

    pub fn round_settings(&self) -> RoundSettings {
        RoundSettings {
            workers: self.worker_count(),
            active_provider: self.active_provider.clone().filter(|p| !p.is_empty()),
            progress_interval: Duration::from_secs(self.report_interval),
            max_attempts: self.max_attempts,
            max_duration: self.max_duration.map(Duration::from_secs),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::InvalidConfig(
                "Count must be at least 1".into(),
            ));
        }

        if self.max_attempts == Some(0) || self.max_duration == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Search limits must be greater than zero".into(),
            ));
        }

        self.constraint().validate()?;
        self.round_settings().validate()?;
        self.output_target()?;

        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    /// Input JSON file containing nodes
    #[arg(short, long, default_value = "nodes.json")]
    pub input: PathBuf,

    /// Output directory for staking directories
    #[arg(short, long, default_value = "staking-dirs")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyConfig {
    /// JSON file containing nodes
    #[arg(short, long, default_value = "nodes.json")]
    pub data_file: PathBuf,

    /// Verify against the remote API instead of locally
    #[arg(long)]
    pub remote: bool,

    /// Remote proof-of-possession verification endpoint
    #[arg(long, default_value = DEFAULT_POP_VERIFY_URL)]
    pub url: String,
}

#[derive(Args, Debug, Clone)]
pub struct UploadConfig {
    /// JSON file containing nodes
    #[arg(short, long)]
    pub data_file: PathBuf,

    /// Base URL of the provider API
    #[arg(long, env = "STAKER_API_URL")]
    pub api_url: String,

    /// Public API key sent as the `apikey` header
    #[arg(long, env = "STAKER_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Bearer token of an authenticated session
    #[arg(long, env = "STAKER_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// User ID that owns the uploaded nodes
    #[arg(long, env = "STAKER_USER_ID")]
    pub user_id: String,

    /// Hardware provider ID
    #[arg(long = "hp-id")]
    pub hardware_provider_id: i64,

    /// L1 ID for the nodes
    #[arg(short = 'L', long, default_value = "")]
    pub l1_id: String,

    /// Network for the nodes (e.g. fuji, mainnet)
    #[arg(long, default_value = "fuji")]
    pub network: String,

    /// Include staker cert, staker key and BLS private key in the upload
    #[arg(long)]
    pub include_secrets: bool,

    /// Number of nodes per request
    #[arg(long, default_value = "25")]
    pub batch_size: usize,

    /// Directory where each batch response is saved
    #[arg(long, default_value = ".")]
    pub response_dir: PathBuf,
}

impl UploadConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hardware_provider_id == 0 {
            return Err(ConfigError::InvalidConfig(
                "Hardware provider ID must be non-zero".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("api-url", &self.api_url),
            ("api-key", &self.api_key),
            ("access-token", &self.access_token),
            ("user-id", &self.user_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!("--{} cannot be empty", name)));
            }
        }
        Ok(())
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            hardware_provider_id: self.hardware_provider_id,
            user_id: self.user_id.clone(),
            l1_id: self.l1_id.clone(),
            network: self.network.clone(),
            include_secrets: self.include_secrets,
            batch_size: self.batch_size,
            response_dir: Some(self.response_dir.clone()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Unsupported output: {0}")]
    UnsupportedOutput(String),
}
