//! Blocking client for OpenAI-compatible chat-completion endpoints.

use super::usage::CallUsage;
use super::{ChatBackend, Completion};
use crate::error::BackendError;
use clap::ValueEnum;
use log::trace;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported chat-completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "deepseek")]
    DeepSeek,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::DeepSeek => "deepseek-chat",
        }
    }

    /// Environment variable read when no API key is given explicitly.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// OpenAI takes message content as a list of typed parts, DeepSeek as a plain string.
    fn content_as_parts(self) -> bool {
        matches!(self, Provider::OpenAi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ClientSettings {
    /// Provider defaults, with the API key taken from the provider's environment variable.
    pub fn for_provider(provider: Provider) -> ClientSettings {
        ClientSettings {
            provider,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            api_key: std::env::var(provider.api_key_var()).ok(),
            timeout: Duration::from_secs(60),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts([ContentPart<'a>; 1]),
}

#[derive(Debug, Serialize)]
struct ContentPart<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<CallUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    agent: ureq::Agent,
    settings: ClientSettings,
}

impl OpenAiClient {
    pub fn new(settings: ClientSettings) -> OpenAiClient {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .build()
            .into();
        OpenAiClient { agent, settings }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn request<'a>(&'a self, system_prompt: &'a str, prompt: &'a str) -> ChatRequest<'a> {
        let content = |text: &'a str| {
            if self.settings.provider.content_as_parts() {
                MessageContent::Parts([ContentPart { kind: "text", text }])
            } else {
                MessageContent::Text(text)
            }
        };
        ChatRequest {
            model: &self.settings.model,
            temperature: 0.0,
            messages: [
                ChatMessage {
                    role: "system",
                    content: content(system_prompt),
                },
                ChatMessage {
                    role: "user",
                    content: content(prompt),
                },
            ],
        }
    }
}

impl ChatBackend for OpenAiClient {
    fn chat(&self, system_prompt: &str, prompt: &str) -> Result<Completion, BackendError> {
        let body = self.request(system_prompt, prompt);
        let endpoint = self.settings.endpoint();
        trace!("POST {} model {}", endpoint, body.model);

        let mut request = self.agent.post(endpoint.as_str());
        if let Some(key) = &self.settings.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        let mut response = request.send_json(&body)?;
        let parsed: ChatResponse = response.body_mut().read_json()?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(BackendError::EmptyResponse)?;
        Ok(Completion {
            text,
            usage: parsed.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(provider: Provider) -> ClientSettings {
        ClientSettings {
            api_key: None,
            ..ClientSettings::for_provider(provider)
        }
    }

    #[test]
    fn test_provider_defaults() {
        let openai = settings(Provider::OpenAi);
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.endpoint(), "https://api.openai.com/v1/chat/completions");

        let deepseek = settings(Provider::DeepSeek);
        assert_eq!(deepseek.model, "deepseek-chat");
        assert_eq!(deepseek.endpoint(), "https://api.deepseek.com/v1/chat/completions");
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let custom = ClientSettings {
            base_url: "https://www.dmxapi.com/v1/".to_string(),
            ..settings(Provider::OpenAi)
        };
        assert_eq!(custom.endpoint(), "https://www.dmxapi.com/v1/chat/completions");
    }

    #[test]
    fn test_openai_request_uses_content_parts() {
        let client = OpenAiClient::new(settings(Provider::OpenAi));
        let body = serde_json::to_value(client.request("sys", "question")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": [{"type": "text", "text": "sys"}]},
                    {"role": "user", "content": [{"type": "text", "text": "question"}]},
                ]
            })
        );
    }

    #[test]
    fn test_deepseek_request_uses_plain_content() {
        let client = OpenAiClient::new(settings(Provider::DeepSeek));
        let body = serde_json::to_value(client.request("sys", "question")).unwrap();
        assert_eq!(body["messages"][0]["content"], json!("sys"));
        assert_eq!(body["messages"][1]["content"], json!("question"));
        assert_eq!(body["model"], json!("deepseek-chat"));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Final answer: 4"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }))
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Final answer: 4"));
        assert_eq!(
            parsed.usage,
            Some(CallUsage {
                prompt_tokens: 12,
                completion_tokens: 3
            })
        );
    }
}
