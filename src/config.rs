//! Database configuration and durability levels
//!
//! Provides the knobs for where tables live, how hard writes are pushed to
//! disk, and how many SELECT results are memoized.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Durability level for table and backup writes
///
/// Every write goes through a temp file + rename regardless of the level, so
/// readers never observe a torn file. The level only decides whether the data
/// and the rename are fsynced before the statement returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DurabilityLevel {
    /// fsync the file and its parent directory on every write
    #[default]
    Synchronous,

    /// Leave flushing to the OS (tests and benchmarks only)
    NoSync,
}

impl DurabilityLevel {
    pub fn requires_sync(&self) -> bool {
        matches!(self, Self::Synchronous)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous (fsync on every write)",
            Self::NoSync => "no sync (testing only)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DBConfig {
    /// Root directory holding one sub-directory per database
    pub data_dir: PathBuf,

    pub durability: DurabilityLevel,

    /// Maximum number of memoized SELECT results
    pub result_cache_capacity: usize,
}

impl Default for DBConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            durability: DurabilityLevel::default(),
            result_cache_capacity: 1024,
        }
    }
}

impl DBConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn for_testing<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            durability: DurabilityLevel::NoSync,
            result_cache_capacity: 64,
        }
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn with_durability(mut self, durability: DurabilityLevel) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.result_cache_capacity = capacity;
        self
    }
}
