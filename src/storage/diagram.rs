//! Current diagram storage
//!
//! Keeps the diagram loaded in the modeler between runs, together with where
//! it came from and when it was last replaced.

use crate::storage::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the stored diagram
pub const DIAGRAM_FILE: &str = "current-diagram.json";

/// How the current diagram was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramOrigin {
    /// The starter process shown on startup and after a reset
    Starter,
    /// Laid out locally from the steps of a prompt
    Skeleton,
    /// Returned by the remote chat endpoint
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentDiagram {
    /// Flowable-compliant BPMN XML
    pub xml: String,
    pub origin: DiagramOrigin,
    pub updated_at: DateTime<Utc>,
}

impl CurrentDiagram {
    pub fn new(xml: impl Into<String>, origin: DiagramOrigin) -> Self {
        Self {
            xml: xml.into(),
            origin,
            updated_at: Utc::now(),
        }
    }
}

fn get_diagram_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DIAGRAM_FILE)
}

/// Load the stored diagram, if any
pub fn load_current_diagram(data_dir: &Path) -> Result<Option<CurrentDiagram>, StorageError> {
    let path = get_diagram_path(data_dir);
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path)?;
    let diagram: CurrentDiagram = serde_json::from_str(&json)?;

    tracing::debug!("Loaded current diagram from {}", path.display());
    Ok(Some(diagram))
}

/// Replace the stored diagram
pub fn save_current_diagram(data_dir: &Path, diagram: &CurrentDiagram) -> Result<(), StorageError> {
    fs::create_dir_all(data_dir)?;

    let path = get_diagram_path(data_dir);
    let json = serde_json::to_string_pretty(diagram)?;
    fs::write(&path, json)?;

    tracing::debug!("Saved current diagram to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_diagram() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_current_diagram(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_diagram_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let diagram = CurrentDiagram::new("<definitions/>", DiagramOrigin::Remote);

        save_current_diagram(dir.path(), &diagram).unwrap();
        let loaded = load_current_diagram(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, diagram);

        let raw = fs::read_to_string(dir.path().join(DIAGRAM_FILE)).unwrap();
        assert!(raw.contains("\"origin\": \"remote\""));
    }

    #[test]
    fn test_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        save_current_diagram(&nested, &CurrentDiagram::new("<x/>", DiagramOrigin::Starter)).unwrap();
        assert!(nested.join(DIAGRAM_FILE).exists());
    }

    #[test]
    fn test_corrupt_diagram_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DIAGRAM_FILE), "[]").unwrap();
        assert!(matches!(
            load_current_diagram(dir.path()),
            Err(StorageError::Json(_))
        ));
    }
}
