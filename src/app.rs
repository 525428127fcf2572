//! Modeler session
//!
//! Holds the settings and the loaded diagram, and implements the user actions:
//! initialize, generate, reset and export. Every action reports exactly one
//! [`Status`]; failures never escape an action.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bpmn::document::ImportError;
use crate::bpmn::{
    create_skeleton_xml, format_xml, import_xml, BpmnDocument, ImportWarning, XmlError,
    STARTER_PROCESS_NAME,
};
use crate::generation::{generator_for, GenerationError, WorkflowGenerator};
use crate::storage::diagram::{load_current_diagram, save_current_diagram, CurrentDiagram, DiagramOrigin};
use crate::storage::settings::{load_settings, save_settings, ModelerSettings, SettingsOverrides};
use crate::storage::StorageError;
use crate::types::Status;

/// Default name of exported files
pub const DEFAULT_EXPORT_FILE: &str = "workflow.bpmn";

/// Errors raised inside a modeler action
#[derive(Debug, Error)]
pub enum ModelerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("No diagram loaded")]
    NoDiagram,
    #[error("Cannot write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

fn report(result: Result<(), ModelerError>, success: &str, failure: &str) -> Status {
    match result {
        Ok(()) => {
            tracing::info!("{}", success);
            Status::info(success)
        }
        Err(e) => {
            tracing::debug!("{}: {}", failure, e);
            Status::error(format!("{}: {}", failure, e))
        }
    }
}

/// State of one modeler session
pub struct Modeler {
    data_dir: PathBuf,
    settings: ModelerSettings,
    current: Option<CurrentDiagram>,
    document: Option<BpmnDocument>,
    warnings: Vec<ImportWarning>,
}

impl Modeler {
    /// Open a session on `data_dir`, loading saved settings
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let settings = load_settings(&data_dir);
        tracing::info!("Modeler session opened on {}", data_dir.display());

        Self {
            data_dir,
            settings,
            current: None,
            document: None,
            warnings: Vec::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &ModelerSettings {
        &self.settings
    }

    /// The diagram currently loaded, if any
    pub fn current(&self) -> Option<&CurrentDiagram> {
        self.current.as_ref()
    }

    /// Structure of the loaded diagram
    pub fn document(&self) -> Option<&BpmnDocument> {
        self.document.as_ref()
    }

    /// Warnings raised when the loaded diagram was imported
    pub fn warnings(&self) -> &[ImportWarning] {
        &self.warnings
    }

    /// Patch and import `xml`, then make it the current diagram
    fn render_xml(&mut self, xml: &str, origin: DiagramOrigin) -> Result<(), ModelerError> {
        let imported = import_xml(xml)?;
        let diagram = CurrentDiagram::new(imported.xml, origin);
        save_current_diagram(&self.data_dir, &diagram)?;

        self.current = Some(diagram);
        self.document = Some(imported.document);
        self.warnings = imported.warnings;
        Ok(())
    }

    fn render_starter(&mut self) -> Result<(), ModelerError> {
        let xml = create_skeleton_xml::<&str>(STARTER_PROCESS_NAME, &[])?;
        self.render_xml(&xml, DiagramOrigin::Starter)
    }

    fn try_initialize(&mut self) -> Result<(), ModelerError> {
        match load_current_diagram(&self.data_dir)? {
            Some(stored) => {
                let imported = import_xml(&stored.xml)?;
                self.current = Some(stored);
                self.document = Some(imported.document);
                self.warnings = imported.warnings;
                Ok(())
            }
            None => self.render_starter(),
        }
    }

    /// Load the stored diagram, or the starter process on first use
    pub fn initialize(&mut self) -> Status {
        let result = self.try_initialize();
        report(
            result,
            "Modeler ready. Provide a prompt to generate a workflow.",
            "Initialization failed",
        )
    }

    /// Save the settings for this run, with overrides applied
    pub fn update_settings(&mut self, overrides: &SettingsOverrides) -> Result<(), StorageError> {
        let settings = self.settings.merged(overrides);
        save_settings(&self.data_dir, &settings)?;
        self.settings = settings;
        Ok(())
    }

    async fn try_generate(
        &mut self,
        prompt: &str,
        generator: &dyn WorkflowGenerator,
    ) -> Result<(), ModelerError> {
        let xml = generator.generate(prompt).await?;
        self.render_xml(&xml, generator.origin())
    }

    /// Generate a diagram for `prompt` with a specific generator
    ///
    /// The previous diagram stays loaded when generation fails.
    pub async fn generate_with(&mut self, prompt: &str, generator: &dyn WorkflowGenerator) -> Status {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Status::error("Please provide a workflow prompt.");
        }

        tracing::info!("Generating BPMN from prompt...");
        let result = self.try_generate(prompt, generator).await;
        report(result, "Workflow generated and loaded successfully.", "Generation failed")
    }

    /// Save settings, then generate with the remote endpoint when configured
    /// or the skeleton builder otherwise
    pub async fn generate(&mut self, prompt: &str, overrides: &SettingsOverrides) -> Status {
        if prompt.trim().is_empty() {
            return Status::error("Please provide a workflow prompt.");
        }

        if let Err(e) = self.update_settings(overrides) {
            return report(Err(e.into()), "", "Generation failed");
        }
        let generator = match generator_for(&self.settings) {
            Ok(generator) => generator,
            Err(e) => return report(Err(e.into()), "", "Generation failed"),
        };

        self.generate_with(prompt, generator.as_ref()).await
    }

    /// Replace the current diagram with the starter process
    pub fn reset(&mut self) -> Status {
        let result = self.render_starter();
        report(result, "Diagram reset to starter Flowable process.", "Reset failed")
    }

    fn try_export(&self, path: &Path) -> Result<(), ModelerError> {
        let diagram = self.current.as_ref().ok_or(ModelerError::NoDiagram)?;
        let xml = format_xml(&diagram.xml)?;
        fs::write(path, xml).map_err(|source| ModelerError::Write {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("Exported diagram to {}", path.display());
        Ok(())
    }

    /// Write the current diagram to `path` as an indented `.bpmn` file
    pub fn export(&self, path: &Path) -> Status {
        let result = self.try_export(path);
        report(result, "BPMN exported successfully.", "Export failed")
    }
}
