//! Checkpoint system for resumable crawling
//!
//! This module persists the frontier's host records so an interrupted crawl
//! can resume where it stopped.
//!
//! # Features
//!
//! - Atomic writes (temp file + rename)
//! - JSON-based state serialization
//! - Monotonic fetch times stored as remaining delay
//!
//! # Example
//!
//! ```no_run
//! use baram_frontier::storage::checkpoint::{CheckpointManager, FrontierCheckpoint};
//! use std::path::Path;
//!
//! # fn example(frontier: &baram_frontier::frontier::Frontier) -> anyhow::Result<()> {
//! let manager = CheckpointManager::new(Path::new("./checkpoints"))?;
//!
//! // Save checkpoint
//! let checkpoint = FrontierCheckpoint::new(frontier.snapshot());
//! manager.save("frontier", &checkpoint)?;
//!
//! // Load checkpoint
//! if let Some(restored) = manager.load::<FrontierCheckpoint>("frontier")? {
//!     println!("Resuming {} hosts", restored.hosts.len());
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::frontier::HostSnapshot;

/// Current checkpoint format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Name the crawler uses for its frontier checkpoint
pub const FRONTIER_CHECKPOINT: &str = "frontier";

// ============================================================================
// Checkpoint State Types
// ============================================================================

/// Saved state of a frontier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierCheckpoint {
    /// Format version
    pub version: u32,

    /// Checkpoint creation time
    pub created_at: DateTime<Utc>,

    /// One record per tracked host
    pub hosts: Vec<HostSnapshot>,
}

impl FrontierCheckpoint {
    pub fn new(hosts: Vec<HostSnapshot>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            created_at: Utc::now(),
            hosts,
        }
    }

    /// Total pending path-queries across hosts
    pub fn pending_urls(&self) -> usize {
        self.hosts.iter().map(|h| h.path_queries.len()).sum()
    }

    /// Hosts that recorded at least one consecutive failure
    pub fn failing_hosts(&self) -> usize {
        self.hosts.iter().filter(|h| h.retry_count > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

// ============================================================================
// Checkpoint Manager
// ============================================================================

/// Manages checkpoint files in one directory
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    /// Directory for checkpoint files
    checkpoint_dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new checkpoint manager
    pub fn new(checkpoint_dir: &Path) -> Result<Self> {
        fs::create_dir_all(checkpoint_dir).map_err(|e| {
            Error::storage(
                format!(
                    "Failed to create checkpoint directory: {}",
                    checkpoint_dir.display()
                ),
                e,
            )
        })?;

        Ok(Self {
            checkpoint_dir: checkpoint_dir.to_path_buf(),
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.checkpoint_dir.join(format!("{name}.checkpoint.json"))
    }

    /// Save checkpoint state
    pub fn save<T: Serialize>(&self, name: &str, state: &T) -> Result<PathBuf> {
        let filepath = self.path_for(name);

        // Write to temp file first, then rename (atomic)
        let temp_path = self
            .checkpoint_dir
            .join(format!("{name}.checkpoint.json.tmp"));

        let file = File::create(&temp_path).map_err(|e| {
            Error::storage(
                format!("Failed to create checkpoint file: {}", temp_path.display()),
                e,
            )
        })?;

        // The temp file must be complete on disk before it replaces the
        // previous checkpoint
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.flush().map_err(|e| {
            Error::storage(
                format!("Failed to write checkpoint file: {}", temp_path.display()),
                e,
            )
        })?;
        writer.get_ref().sync_all().map_err(|e| {
            Error::storage(
                format!("Failed to sync checkpoint file: {}", temp_path.display()),
                e,
            )
        })?;
        drop(writer);

        fs::rename(&temp_path, &filepath).map_err(|e| {
            Error::storage(
                format!("Failed to rename checkpoint file: {}", filepath.display()),
                e,
            )
        })?;

        tracing::debug!(path = %filepath.display(), "Checkpoint saved");
        Ok(filepath)
    }

    /// Load checkpoint state
    pub fn load<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Option<T>> {
        let filepath = self.path_for(name);

        if !filepath.exists() {
            return Ok(None);
        }

        let file = File::open(&filepath).map_err(|e| {
            Error::storage(
                format!("Failed to open checkpoint file: {}", filepath.display()),
                e,
            )
        })?;

        let reader = BufReader::new(file);
        let state = serde_json::from_reader(reader)?;

        tracing::debug!(path = %filepath.display(), "Checkpoint loaded");
        Ok(Some(state))
    }

    /// Load a frontier checkpoint, rejecting unknown format versions
    pub fn load_frontier(&self, name: &str) -> Result<Option<FrontierCheckpoint>> {
        let Some(checkpoint) = self.load::<FrontierCheckpoint>(name)? else {
            return Ok(None);
        };

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(Error::UnsupportedCheckpoint {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }

        Ok(Some(checkpoint))
    }

    /// Check if checkpoint exists
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Delete checkpoint
    pub fn delete(&self, name: &str) -> Result<()> {
        let filepath = self.path_for(name);

        if filepath.exists() {
            fs::remove_file(&filepath).map_err(|e| {
                Error::storage(
                    format!("Failed to delete checkpoint: {}", filepath.display()),
                    e,
                )
            })?;
            tracing::debug!(path = %filepath.display(), "Checkpoint deleted");
        }

        Ok(())
    }

    /// List all checkpoints
    pub fn list(&self) -> Result<Vec<String>> {
        let mut checkpoints = Vec::new();

        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if let Some(session) = name.strip_suffix(".checkpoint.json") {
                    checkpoints.push(session.to_string());
                }
            }
        }

        checkpoints.sort();
        Ok(checkpoints)
    }

    /// Get checkpoint directory
    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }
}

// ============================================================================
// Tests
// ============================================================================
