// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pregnancy support chatbot backed by an OpenAI-compatible
//! chat-completions endpoint.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const SYSTEM_PROMPT: &str = "You are a friendly pregnancy support chatbot. Keep your responses concise, conversational, and easy to read. Follow these guidelines:

1. Keep responses short and to the point (2-3 sentences when possible)
2. Use a friendly, supportive tone
3. Focus on the most important information
4. Use simple language
5. Include a brief follow-up question when relevant
6. For complex topics, break information into 2-3 key points
7. Always remind users to consult their healthcare provider for medical advice
8. For emergencies, immediately direct users to seek medical attention

Remember: Be helpful but concise, like a friendly conversation rather than a medical textbook.";

/// Reply sent whenever the completion call fails.
pub const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble connecting right now. Please try again later or contact your healthcare provider for immediate assistance.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

/// Longest message a user may send.
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat service.
#[derive(Clone)]
pub struct ChatService {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatService {
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Reply to a user message. Never fails: any error is logged and
    /// answered with [`FALLBACK_REPLY`].
    pub async fn reply(&self, message: &str) -> String {
        match self.complete(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Chat completion failed, sending fallback reply");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn complete(&self, message: &str) -> Result<String, AppError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ChatApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ChatApi(format!("HTTP {}: {}", status, body)));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::ChatApi(format!("JSON parse error: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::ChatApi("Empty completion".to_string()))
    }
}

/// Check a user message is non-empty and not too long.
pub fn validate_message(message: &str) -> Result<(), AppError> {
    let len = message.trim().chars().count();
    if len == 0 {
        return Err(AppError::BadRequest("Message must not be empty".to_string()));
    }
    if len > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}
