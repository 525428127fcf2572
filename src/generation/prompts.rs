//! Prompts sent to the chat endpoint

use crate::types::ChatMessage;

/// Sampling temperature for BPMN generation
pub const GENERATION_TEMPERATURE: f32 = 0.2;

/// Instructions constraining the model to Flowable-ready BPMN
pub const BPMN_SYSTEM_PROMPT: &str = "Return only BPMN 2.0 XML. Ensure XML is Flowable-compatible, uses xmlns:flowable=\"http://flowable.org/bpmn\", has executable process, valid sequence flows, and includes BPMN DI coordinates.";

pub fn build_user_prompt(prompt: &str) -> String {
    format!("Design a BPMN workflow for: {}", prompt)
}

/// Conversation for one generation request
pub fn build_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(BPMN_SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(prompt)),
    ]
}
