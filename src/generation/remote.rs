//! Remote BPMN generation
//!
//! Asks an OpenAI-compatible chat-completion endpoint to write the BPMN XML
//! for a prompt.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::prompts::{build_messages, GENERATION_TEMPERATURE};
use super::{GenerationError, WorkflowGenerator};
use crate::storage::diagram::DiagramOrigin;
use crate::storage::settings::ModelerSettings;
use crate::types::ChatMessage;

/// Request timeout for the chat endpoint
const REQUEST_TIMEOUT_SECS: u64 = 120;

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:xml)?\s*").expect("valid fence regex"));

static CLOSING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("valid fence regex"));

// ============================================================================
// Chat API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Remove a surrounding Markdown code fence from model output
pub fn strip_code_fence(content: &str) -> String {
    let content = content.trim();
    let content = OPENING_FENCE.replace(content, "");
    let content = CLOSING_FENCE.replace(&content, "");
    content.trim().to_string()
}

// ============================================================================
// RemoteGenerator
// ============================================================================

pub struct RemoteGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl RemoteGenerator {
    pub fn new(settings: &ModelerSettings) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(settings, client))
    }

    pub fn with_client(settings: &ModelerSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: settings.endpoint.trim().to_string(),
            model: settings.model.trim().to_string(),
            api_key: settings.api_key.trim().to_string(),
        }
    }

    fn request_body(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            temperature: GENERATION_TEMPERATURE,
            messages: build_messages(prompt),
        }
    }

    /// Send the prompt and return the raw message content
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::info!("Requesting BPMN from {} (model {})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::warn!("Chat endpoint returned {}: {}", status, response_text);
            return Err(GenerationError::Status(status.as_u16()));
        }

        let api_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        if let Some(error) = api_response.error {
            return Err(GenerationError::Api(error.message));
        }

        api_response
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::EmptyContent)
    }
}

#[async_trait]
impl WorkflowGenerator for RemoteGenerator {
    fn origin(&self) -> DiagramOrigin {
        DiagramOrigin::Remote
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let content = self.complete(prompt).await?;
        let xml = strip_code_fence(&content);
        tracing::debug!("Received {} bytes of BPMN XML", xml.len());
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_server::{completion_body, direct_client, serve_once};

    fn generator(endpoint: &str) -> RemoteGenerator {
        let settings = ModelerSettings::new(endpoint, "flow-model", "test-key");
        RemoteGenerator::with_client(&settings, direct_client())
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```xml\n<a/>\n```"), "<a/>");
        assert_eq!(strip_code_fence("  ```XML <a/>```  "), "<a/>");
        assert_eq!(strip_code_fence("```\n<a/>\n```"), "<a/>");
        assert_eq!(strip_code_fence("<a/>"), "<a/>");
        assert_eq!(strip_code_fence("\n<a>\n</a>\n"), "<a>\n</a>");
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(generator("http://localhost").request_body("payroll")).unwrap();
        assert_eq!(body["model"], "flow-model");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Design a BPMN workflow for: payroll");
    }

    #[tokio::test]
    async fn test_generate_sends_request_and_strips_fence() {
        let (url, server) = serve_once(
            "200 OK",
            completion_body("```xml\n<definitions><process id=\"p\"/></definitions>\n```"),
        )
        .await;

        let xml = generator(&url).generate("leave request").await.unwrap();
        assert_eq!(xml, "<definitions><process id=\"p\"/></definitions>");

        let request = server.await.unwrap();
        assert!(request.head.starts_with("post /v1/chat/completions"));
        assert!(request.head.contains("authorization: bearer test-key"));
        assert!(request.head.contains("content-type: application/json"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["model"], "flow-model");
        assert_eq!(body["messages"][1]["content"], "Design a BPMN workflow for: leave request");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"error":"bad key"}"#.to_string()).await;

        let err = generator(&url).generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::Status(401)));
        assert_eq!(err.to_string(), "AI request failed (401)");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_content() {
        let (url, server) = serve_once("200 OK", completion_body("   \n")).await;

        let err = generator(&url).generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyContent));
        assert_eq!(err.to_string(), "AI response did not include workflow XML.");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_choices() {
        let (url, server) = serve_once("200 OK", r#"{"choices":[]}"#.to_string()).await;

        let err = generator(&url).generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyContent));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_payload() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"error":{"message":"model overloaded"}}"#.to_string(),
        )
        .await;

        let err = generator(&url).generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::Api(ref m) if m == "model overloaded"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = generator(&format!("http://{}/v1", addr))
            .generate("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Http(_)));
    }
}
