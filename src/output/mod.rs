//! Serialization of generated identities.
//!
//! Supported targets:
//! - CSV file (one row per node)
//! - JSON node file (`{"nodes": [...]}`)
//! - Staking directory (`staker.crt`, `staker.key`, `signer.key`)

mod csv_file;
mod json_file;
mod staking_dir;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::crypto::IdentityBundle;

pub use csv_file::{write_csv, CSV_HEADER};
pub use json_file::{read_json, write_json, NodeFile};
pub use staking_dir::{
    convert_to_staking_dirs, write_staking_dir, SIGNER_KEY_FILE, STAKER_CERT_FILE,
    STAKER_KEY_FILE,
};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid BLS private key hex for {node_id}: {source}")]
    Hex {
        node_id: String,
        #[source]
        source: hex::FromHexError,
    },
    #[error("A staking directory holds exactly one node, got {0}")]
    StakingDirCount(usize),
}

/// Where generated identities are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Csv(PathBuf),
    Json(PathBuf),
    StakingDir(PathBuf),
}

impl OutputTarget {
    /// Picks a target from the output path.
    ///
    /// `.csv` and `.json` select file formats; a path without an extension
    /// is a staking directory, which only holds a single node.
    pub fn from_path(path: &Path, count: usize) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv(path.to_path_buf())),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json(path.to_path_buf())),
            None if count == 1 => Ok(Self::StakingDir(path.to_path_buf())),
            None => Err(ConfigError::UnsupportedOutput(format!(
                "{} is a staking directory, which holds a single node (requested {})",
                path.display(),
                count
            ))),
            Some(_) => Err(ConfigError::UnsupportedOutput(format!(
                "{} (expected .csv, .json or a directory)",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Csv(p) | Self::Json(p) | Self::StakingDir(p) => p,
        }
    }

    /// Writes all bundles to this target.
    pub fn write(&self, bundles: &[IdentityBundle]) -> Result<(), OutputError> {
        match self {
            Self::Csv(path) => write_csv(BufWriter::new(File::create(path)?), bundles),
            Self::Json(path) => write_json(BufWriter::new(File::create(path)?), bundles),
            Self::StakingDir(path) => match bundles {
                [bundle] => write_staking_dir(path, bundle),
                _ => Err(OutputError::StakingDirCount(bundles.len())),
            },
        }
    }
}
