//! Text-generation collaborator
//!
//! Responders and the router only see the `TextGenerator` trait.
//! Calls may fail; callers decide what the fallback is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::error::OrchestrationError;
use crate::Result;

pub mod gemini;
pub use gemini::GeminiClient;

/// Message produced by the text-generation collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl GeneratedMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: None,
        }
    }
}

/// Trait for prompt → free text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_role: &str, user_content: &str) -> Result<GeneratedMessage>;
}

/// Recorded call, for assertions
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCall {
    pub system_role: String,
    pub user_content: String,
}

/// Scripted generator for development & testing.
/// Replies are chosen by the first rule whose needle occurs in the system role.
#[derive(Default)]
pub struct MockGenerator {
    rules: Vec<(String, std::result::Result<String, String>)>,
    calls: Mutex<Vec<GenerationCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_when(mut self, role_contains: &str, reply: &str) -> Self {
        self.rules
            .push((role_contains.to_string(), Ok(reply.to_string())));
        self
    }

    pub fn fail_when(mut self, role_contains: &str, error: &str) -> Self {
        self.rules
            .push((role_contains.to_string(), Err(error.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn calls_with_role(&self, role_contains: &str) -> Vec<GenerationCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.system_role.contains(role_contains))
            .collect()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, system_role: &str, user_content: &str) -> Result<GeneratedMessage> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(GenerationCall {
                system_role: system_role.to_string(),
                user_content: user_content.to_string(),
            });

        let rule = self
            .rules
            .iter()
            .find(|(needle, _)| system_role.contains(needle.as_str()));

        match rule {
            Some((_, Ok(reply))) => Ok(GeneratedMessage::new(reply.clone())),
            Some((_, Err(error))) => Err(OrchestrationError::GenerationFailed(error.clone())),
            None => Err(OrchestrationError::GenerationFailed(
                "no scripted reply".to_string(),
            )),
        }
    }
}
