use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::error::LlmError;

/// At most this many fragments go into a prompt.
pub const MAX_CONTEXT_FRAGMENTS: usize = 6;

const SYSTEM_PROMPT: &str = "Return only valid JSON. No prose.";
const TEMPERATURE: f32 = 0.2;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap());

/// Anything that can turn notes into raw MCQ JSON. The quiz pipeline
/// validates whatever comes back.
pub trait McqBackend {
    fn available(&self) -> bool;
    fn mcqs_from_notes(&self, topic: &str, fragments: &[String], n: usize) -> Result<Value, LlmError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Blocking chat-completions client. One request per call, no retries.
pub struct LlmClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("empty API key".into()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    /// `None` when `OPENAI_API_KEY` is unset or the client cannot be built.
    pub fn from_env(settings: &LlmSettings) -> Option<Self> {
        let key = std::env::var("OPENAI_API_KEY").ok()?;
        match Self::new(key, settings) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "LLM backend disabled");
                None
            }
        }
    }

    fn chat_json(&self, prompt: &str) -> Result<Value, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api(format!("{status}: {body}")));
        }

        let reply: ChatResponse = response
            .json()
            .map_err(|e| LlmError::Parse(format!("bad completion body: {e}")))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("empty completion".into()))?;
        debug!(chars = content.len(), "LLM reply");
        parse_json_reply(&content)
    }
}

impl McqBackend for LlmClient {
    fn available(&self) -> bool {
        true
    }

    fn mcqs_from_notes(&self, topic: &str, fragments: &[String], n: usize) -> Result<Value, LlmError> {
        self.chat_json(&mcq_prompt(topic, fragments, n))
    }
}

pub fn mcq_prompt(topic: &str, fragments: &[String], n: usize) -> String {
    let notes = fragments
        .iter()
        .take(MAX_CONTEXT_FRAGMENTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Topic: {topic}\nNotes:\n{notes}\n\n\
         Make {n} high-quality MCQs. Options A-D. One correct answer.\n\
         Output JSON: [{{\"question\": \"...\", \"options\": [\"A\",\"B\",\"C\",\"D\"], \"answer\": \"...\"}}]"
    )
}

/// Parse a model reply as JSON, unwrapping a Markdown code fence if present.
pub fn parse_json_reply(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }
    let inner = FENCE_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| LlmError::Parse("reply is not JSON".into()))?;
    serde_json::from_str(inner).map_err(|e| LlmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json() {
        let v = parse_json_reply(r#" [{"question":"Q","options":["a"],"answer":"a"}] "#).unwrap();
        assert_eq!(v[0]["answer"], "a");
    }

    #[test]
    fn fenced_json() {
        let reply = "```json\n{\"mcqs\": []}\n```";
        assert_eq!(parse_json_reply(reply).unwrap(), json!({"mcqs": []}));
        let bare = "```\n[1, 2]\n```";
        assert_eq!(parse_json_reply(bare).unwrap(), json!([1, 2]));
    }

    #[test]
    fn prose_is_parse_error() {
        assert!(matches!(parse_json_reply("Sure! Here you go."), Err(LlmError::Parse(_))));
    }

    #[test]
    fn prompt_caps_context() {
        let frags: Vec<String> = (0..10).map(|i| format!("fragment-{i}")).collect();
        let p = mcq_prompt("Demand", &frags, 4);
        assert!(p.contains("Topic: Demand"));
        assert!(p.contains("fragment-5"));
        assert!(!p.contains("fragment-6"));
        assert!(p.contains("Make 4 high-quality MCQs"));
    }

    #[test]
    fn empty_key_rejected() {
        let err = LlmClient::new("  ", &LlmSettings::default()).err();
        assert!(matches!(err, Some(LlmError::Config(_))));
    }
}
