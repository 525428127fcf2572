//! BPMN 2.0 XML handling
//!
//! Step extraction from free text, skeleton diagram generation, Flowable
//! compliance patching, and import/export of BPMN documents.

pub mod compliance;
pub mod document;
pub mod segment;
pub mod skeleton;

use thiserror::Error;

pub use compliance::ensure_flowable_compliance;
pub use document::{format_xml, import_xml, BpmnDocument, ImportWarning, ImportedDiagram};
pub use segment::{parse_steps_from_prompt, slugify};
pub use skeleton::{create_skeleton_xml, STARTER_PROCESS_NAME};

/// Flowable extension namespace
pub const FLOWABLE_NS: &str = "http://flowable.org/bpmn";
/// Default target namespace for Flowable process definitions
pub const FLOWABLE_TARGET_NS: &str = "http://flowable.org/processdef";

pub const BPMN_MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
pub const BPMN_DI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML processing errors
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Generated BPMN XML is malformed.")]
    Malformed(String),
    #[error("Failed to write BPMN XML: {0}")]
    Write(String),
}

impl XmlError {
    /// Underlying parser detail, useful for logs
    pub fn detail(&self) -> &str {
        match self {
            XmlError::Malformed(detail) | XmlError::Write(detail) => detail,
        }
    }
}
