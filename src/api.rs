use crate::config::AppConfig;
use crate::models::{ChatMessage, Sender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

// Alias for the stream of text fragments a reply arrives in
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Every first reply starts with this exact text; the chat view renders it as
/// a separate panel.
pub const DISCLAIMER: &str = "Disclaimer: I am an AI assistant, not a veterinarian. My advice is for general information only. For any health concern, please consult a licensed veterinarian.";

pub const SYSTEM_INSTRUCTION: &str = concat!(
    "You are PawPal, the friendly assistant of the PawHaven animal-welfare organization. ",
    "You help with pet care, adoption questions, volunteering and reporting animals in need. ",
    "Begin your first response in every conversation with this exact text, followed by a blank line: ",
    "\"Disclaimer: I am an AI assistant, not a veterinarian. My advice is for general information only. ",
    "For any health concern, please consult a licensed veterinarian.\" ",
    "When asked for a new pet checklist, answer with exactly three markdown sections titled ",
    "\"### Essential Supplies\", \"### First Vet Visit\" and \"### Preparing Your Home\", each a bulleted list. ",
    "Keep answers concise and kind."
);

/// Splits a reply into the disclaimer panel and the remaining text.
pub fn split_disclaimer(text: &str) -> (Option<&str>, &str) {
    match text.strip_prefix(DISCLAIMER) {
        Some(rest) => (Some(DISCLAIMER), rest.trim_start()),
        None => (None, text),
    }
}

// Interface to the hosted assistant model
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    /// Returns a stream of text fragments in delivery order.
    async fn stream_reply(&self, history: &[ChatMessage]) -> Result<DeltaStream>;

    /// Non-streaming variant returning the whole reply at once.
    async fn reply(&self, history: &[ChatMessage]) -> Result<String>;
}

// --- Google Generative Language implementation ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Maps chat history to request contents. Error notices and empty
/// placeholders are never sent back to the model.
fn to_contents(history: &[ChatMessage]) -> Vec<Content> {
    history
        .iter()
        .filter(|m| !m.is_error && !(m.sender == Sender::Assistant && m.text.is_empty()))
        .map(|m| Content {
            role: Some(
                match m.sender {
                    Sender::User => "user",
                    Sender::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![Part { text: m.text.clone() }],
        })
        .collect()
}

enum ApiKey {
    Literal(String),
    // Resolved on every request so a key added later is picked up
    Reference(Option<String>),
}

pub struct GeminiProvider {
    client: Client,
    api_url: String,
    model: String,
    api_key: ApiKey,
}

impl GeminiProvider {
    pub fn new(api_url: &str, model: &str, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: ApiKey::Literal(api_key),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_key: ApiKey::Reference(config.api_key_ref.clone()),
            ..Self::new(&config.gemini_api_url, &config.gemini_model, String::new())
        }
    }

    fn api_key(&self) -> Result<String> {
        match &self.api_key {
            ApiKey::Literal(key) => Ok(key.clone()),
            ApiKey::Reference(key_ref) => crate::config::get_api_key(key_ref.as_deref()),
        }
    }

    fn request_body(&self, history: &[ChatMessage]) -> GenerateRequest {
        GenerateRequest {
            contents: to_contents(history),
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
        }
    }

    async fn post(&self, method: &str, history: &[ChatMessage]) -> Result<reqwest::Response> {
        let api_key = self.api_key()?;
        let request_url = format!("{}/models/{}:{}", self.api_url, self.model, method);
        let response = self
            .client
            .post(&request_url)
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(history))
            .send()
            .await
            .context("Failed to send request to assistant API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "<Failed to read error body>".to_string());
            log::error!("Assistant API request failed with status {}: {}", status, error_body);
            return Err(anyhow::anyhow!("API request failed with status {}: {}", status, error_body));
        }
        Ok(response)
    }
}

#[async_trait]
impl AssistantProvider for GeminiProvider {
    async fn stream_reply(&self, history: &[ChatMessage]) -> Result<DeltaStream> {
        log::info!("Sending STREAM request to assistant API using model: {}", self.model);
        let response = self.post("streamGenerateContent?alt=sse", history).await?;

        let delta_stream = response
            .bytes_stream()
            .eventsource()
            .map(|event_result| -> Result<Option<String>> {
                let event = event_result.context("Error reading stream event")?;
                let event_data = event.data.trim();
                if event_data.is_empty() {
                    return Ok(None);
                }
                let chunk: GenerateResponse = serde_json::from_str(event_data)
                    .with_context(|| format!("Failed to parse stream chunk: {}", event_data))?;
                let text = chunk.text();
                Ok(if text.is_empty() { None } else { Some(text) })
            })
            .filter_map(|result| async move {
                match result {
                    Ok(Some(content)) => Some(Ok(content)),
                    Ok(None) => None,
                    Err(e) => {
                        log::error!("Error processing stream chunk: {:?}", e);
                        Some(Err(e))
                    }
                }
            });

        Ok(Box::pin(delta_stream))
    }

    async fn reply(&self, history: &[ChatMessage]) -> Result<String> {
        log::info!("Sending request to assistant API using model: {}", self.model);
        let response = self.post("generateContent", history).await?;
        let body: GenerateResponse = response.json().await.context("Failed to decode assistant response")?;
        Ok(body.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_skip_errors_and_placeholders() {
        let history = vec![
            ChatMessage::user("Hi"),
            ChatMessage::error("Something went wrong"),
            ChatMessage::user("Hi again"),
            ChatMessage::assistant("Hello!"),
            ChatMessage::assistant(""),
        ];
        let contents = to_contents(&history);
        let roles: Vec<_> = contents.iter().filter_map(|c| c.role.as_deref()).collect();
        assert_eq!(roles, ["user", "user", "model"]);
        assert_eq!(contents[2].parts[0].text, "Hello!");
    }

    #[test]
    fn request_uses_camel_case_system_instruction() {
        let provider = GeminiProvider::new("https://example.test/v1beta/", "gemini-test", "key".into());
        let body = serde_json::to_value(provider.request_body(&[ChatMessage::user("Hi")])).unwrap();
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Essential Supplies"));
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(provider.api_url, "https://example.test/v1beta");
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text(), "Hello");
        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn disclaimer_is_split_only_on_exact_prefix() {
        let text = format!("{}\n\nFeed twice a day.", DISCLAIMER);
        assert_eq!(split_disclaimer(&text), (Some(DISCLAIMER), "Feed twice a day."));
        assert_eq!(split_disclaimer("Feed twice a day."), (None, "Feed twice a day."));
    }

    #[test]
    fn system_instruction_carries_disclaimer_literal() {
        assert!(SYSTEM_INSTRUCTION.contains(DISCLAIMER));
    }
}
