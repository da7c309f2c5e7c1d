use crate::llm::client::LLMClient;
use crate::types::{AppError, ChatMessage as AppChatMessage, MessageRole, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Split an Ollama base URL into the `(scheme://host, port)` pair `Ollama::new` expects.
///
/// An explicit port wins, then the scheme's default. A scheme without a
/// known default falls back to Ollama's port.
pub(crate) fn split_base_url(base_url: &str) -> (String, u16) {
    match reqwest::Url::parse(base_url) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("localhost");
            let port = url.port_or_known_default().unwrap_or(DEFAULT_OLLAMA_PORT);
            (format!("{}://{}", url.scheme(), host), port)
        }
        Err(_) => ("http://localhost".to_string(), DEFAULT_OLLAMA_PORT),
    }
}

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let (host, port) = split_base_url(base_url);
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn chat(&self, messages: &[AppChatMessage]) -> Result<String> {
        let chat_messages: Vec<ChatMessage> = messages
            .iter()
            .map(|m| match m.role {
                MessageRole::System => ChatMessage::system(m.content.clone()),
                MessageRole::User => ChatMessage::user(m.content.clone()),
                MessageRole::Assistant => ChatMessage::assistant(m.content.clone()),
            })
            .collect();

        let request = ChatMessageRequest::new(self.model.clone(), chat_messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::GenerationFailed(format!("Ollama error: {}", e)))?;

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(AppError::GenerationFailed(
                "Ollama returned an empty message".to_string(),
            ));
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing_full() {
        let (host, port) = split_base_url("http://localhost:11434");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_url_parsing_scheme_default_port() {
        let (host, port) = split_base_url("http://localhost");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 80);

        let (host, port) = split_base_url("https://ollama.example.com");
        assert_eq!(host, "https://ollama.example.com");
        assert_eq!(port, 443);
    }

    #[test]
    fn test_url_parsing_custom_port() {
        let (host, port) = split_base_url("https://192.168.1.100:8080/");
        assert_eq!(host, "https://192.168.1.100");
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_url_parsing_garbage_falls_back() {
        let (host, port) = split_base_url("not a url");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }
}
