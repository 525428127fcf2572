//! BPMN generation from prompts
//!
//! A prompt becomes BPMN XML either through a remote chat-completion endpoint
//! or, when no endpoint is configured, through the local skeleton builder.

pub mod prompts;
pub mod remote;

#[cfg(test)]
pub(crate) mod test_server;

use async_trait::async_trait;
use thiserror::Error;

use crate::bpmn::XmlError;
use crate::storage::diagram::DiagramOrigin;
use crate::storage::settings::ModelerSettings;
use crate::types::Workflow;

pub use remote::{strip_code_fence, RemoteGenerator};

/// Generation errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("AI request failed: {0}")]
    Http(String),
    #[error("AI request failed ({0})")]
    Status(u16),
    #[error("AI endpoint error: {0}")]
    Api(String),
    #[error("Failed to parse AI response: {0}")]
    InvalidResponse(String),
    #[error("AI response did not include workflow XML.")]
    EmptyContent,
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Turns a prompt into BPMN XML
#[async_trait]
pub trait WorkflowGenerator: Send + Sync {
    /// Where diagrams from this generator come from
    fn origin(&self) -> DiagramOrigin;
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Offline generator: splits the prompt into steps and lays them out
pub struct SkeletonGenerator;

#[async_trait]
impl WorkflowGenerator for SkeletonGenerator {
    fn origin(&self) -> DiagramOrigin {
        DiagramOrigin::Skeleton
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let workflow = Workflow::from_prompt(prompt);
        tracing::info!(
            "Building skeleton workflow '{}' with {} steps",
            workflow.name,
            workflow.steps.len()
        );
        Ok(workflow.to_skeleton_xml()?)
    }
}

/// Pick the remote generator when endpoint, model and key are all set
pub fn generator_for(
    settings: &ModelerSettings,
) -> Result<Box<dyn WorkflowGenerator>, GenerationError> {
    if settings.is_configured() {
        Ok(Box::new(RemoteGenerator::new(settings)?))
    } else {
        tracing::info!("Remote generation not configured, using skeleton builder");
        Ok(Box::new(SkeletonGenerator))
    }
}
