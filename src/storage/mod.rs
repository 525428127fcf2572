//! Persistent storage
//!
//! This module handles persistence of the modeler settings and of the diagram
//! currently loaded in the modeler.

pub mod diagram;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No data directory available on this system")]
    NoDataDir,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Get the per-user data directory
///
/// Linux: ~/.local/share/flowable-ai-modeler
/// macOS: ~/Library/Application Support/org.flowable.flowable-ai-modeler
/// Windows: %APPDATA%/flowable/flowable-ai-modeler/data
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    directories::ProjectDirs::from("org", "flowable", "flowable-ai-modeler")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}
