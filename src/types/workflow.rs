//! Workflow outline
//!
//! A process name plus the ordered step labels extracted from a prompt.

use crate::bpmn::{create_skeleton_xml, parse_steps_from_prompt, XmlError};

/// Number of prompt characters used as the process name
const PROCESS_NAME_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<String>,
}

impl Workflow {
    /// Outline a workflow from free text
    ///
    /// The name is the start of the prompt, the steps come from
    /// [`parse_steps_from_prompt`].
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            name: prompt.chars().take(PROCESS_NAME_CHARS).collect(),
            steps: parse_steps_from_prompt(prompt),
        }
    }

    /// Lay the workflow out as skeleton BPMN XML
    pub fn to_skeleton_xml(&self) -> Result<String, XmlError> {
        create_skeleton_xml(&self.name, &self.steps)
    }
}
