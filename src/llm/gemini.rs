//! Gemini API client
//!
//! Implements `TextGenerator` over the `generateContent` REST endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::OrchestrationError;
use crate::llm::{GeneratedMessage, TextGenerator};
use crate::Result;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            url: format!("{}/{}:generateContent", GEMINI_BASE_URL, model),
        })
    }

    /// Point the client at another endpoint (proxies, local fakes)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, system_role: &str, user_content: &str) -> Result<GeneratedMessage> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::GenerationFailed(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let request = build_request(system_role, user_content);

        debug!("Calling Gemini API");

        let url = format!("{}?key={}", self.url, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // the URL carries the API key
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                OrchestrationError::GenerationFailed(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(OrchestrationError::GenerationFailed(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::GenerationFailed(format!("Gemini parse error: {}", e))
        })?;

        extract_message(gemini_response)
    }
}

fn build_request(system_role: &str, user_content: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: user_content.to_string(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.2,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
        },
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: system_role.to_string(),
            }],
        },
    }
}

fn extract_message(response: GeminiResponse) -> Result<GeneratedMessage> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        OrchestrationError::GenerationFailed("No response from Gemini API".to_string())
    })?;

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(OrchestrationError::GenerationFailed(
            "Empty response from Gemini".to_string(),
        ));
    }

    Ok(GeneratedMessage {
        content,
        finish_reason: candidate.finish_reason,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: Content,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = build_request("You are a compliance expert", "What is KYC?");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is KYC?");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a compliance expert"
        );
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_extract_message_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();

        let message = extract_message(response).unwrap();
        assert_eq!(message.content, "Hello, world");
        assert_eq!(message.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_extract_message_rejects_empty_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_message(response),
            Err(OrchestrationError::GenerationFailed(_))
        ));

        let blocked: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(extract_message(blocked).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client =
            GeminiClient::new(String::new(), "gemini-2.0-flash", Duration::from_secs(10)).unwrap();
        let err = client.generate("role", "query").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_api_key() {
        // nothing listens on the discard port
        let client = GeminiClient::new("secret-key-123".into(), "gemini-2.0-flash", Duration::from_secs(10))
            .unwrap()
            .with_url("http://127.0.0.1:9/v1beta/models/gemini-2.0-flash:generateContent");

        let err = client.generate("role", "query").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::GenerationFailed(_)));
        assert!(!err.to_string().contains("secret-key-123"));
    }
}
