use eyre::{Result, bail};
use log::{debug, info};
use serde::Serialize;

use crate::config::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::error::Error;
use crate::innertube::VideoInfo;
use crate::resolver;
use crate::transcript::{self, Transcript, TranscriptOptions};

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful summarization assistant.";

/// Anthropic requires an explicit output limit
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;

/// Settings for one summarizer or chat session
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Summary of a video together with the metadata it was made from
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub summary: String,
    pub title: String,
    pub author: String,
    pub description: String,
}

/// One question and its answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Summarize the video behind `url`
pub async fn summarize(
    client: &reqwest::Client,
    config: &AiConfig,
    url: &str,
    opts: &TranscriptOptions,
) -> Result<Summary> {
    resolver::require_video_id(url)?;
    let transcript = transcript::fetch(client, url, opts).await?;
    summarize_transcript(client, config, &transcript).await
}

/// Summarize an already fetched transcript
pub async fn summarize_transcript(
    client: &reqwest::Client,
    config: &AiConfig,
    transcript: &Transcript,
) -> Result<Summary> {
    info!("Summarizing {} with {}", transcript.info.video_id, config.model);
    let messages = [Message::user(summary_prompt(&transcript.text()))];

    let summary = complete(client, config, SUMMARY_SYSTEM_PROMPT, &messages)
        .await
        .map_err(|e| Error::Ai(format!("Summarization failed: {e:#}")))?;

    Ok(Summary {
        summary: summary.trim().to_string(),
        title: transcript.info.title.clone(),
        author: transcript.info.author.clone(),
        description: transcript.info.description.clone(),
    })
}

fn summary_prompt(transcript_text: &str) -> String {
    format!(
        "You are a helpful assistant. Please provide a clear, concise summary \
         of the following video, focusing on the main points and avoiding unnecessary details. \
         Base your summary only on the transcript below, but refer to it as the video, not as text.\n\n\
         Transcript:\n{transcript_text}\n\nSummary:"
    )
}

/// A conversation about one video.
///
/// The transcript and metadata are fetched once when the session opens; every
/// question is sent with the full history so far.
pub struct ChatSession {
    client: reqwest::Client,
    config: AiConfig,
    transcript: Transcript,
    history: Vec<Exchange>,
}

impl ChatSession {
    /// Fetch the transcript for `url` and start an empty conversation
    pub async fn open(
        client: &reqwest::Client,
        config: AiConfig,
        url: &str,
        opts: &TranscriptOptions,
    ) -> Result<Self> {
        resolver::require_video_id(url)?;
        let transcript = transcript::fetch(client, url, opts).await?;
        Ok(Self::new(client.clone(), config, transcript))
    }

    pub fn new(client: reqwest::Client, config: AiConfig, transcript: Transcript) -> Self {
        Self {
            client,
            config,
            transcript,
            history: Vec::new(),
        }
    }

    pub fn info(&self) -> &VideoInfo {
        &self.transcript.info
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Ask a question; the exchange is kept for follow-ups
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        debug!("Chat question #{}: {question}", self.history.len() + 1);
        let messages = self.messages_for(question);

        let answer = complete(&self.client, &self.config, &self.system_prompt(), &messages)
            .await
            .map_err(|e| Error::Ai(format!("Chat failed: {e:#}")))?;
        let answer = answer.trim().to_string();

        self.history.push(Exchange {
            question: question.to_string(),
            answer: answer.clone(),
        });
        Ok(answer)
    }

    /// Summarize the session's video without touching the history
    pub async fn summarize(&self) -> Result<Summary> {
        summarize_transcript(&self.client, &self.config, &self.transcript).await
    }

    fn system_prompt(&self) -> String {
        let info = &self.transcript.info;
        format!(
            "You are a helpful assistant that answers questions about a YouTube video. \
             The video is titled '{}' by {}. \
             Base your answers only on the transcript provided below.\n\n\
             Video transcript:\n{}",
            info.title,
            info.author,
            self.transcript.text()
        )
    }

    fn messages_for(&self, question: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() * 2 + 1);
        for exchange in &self.history {
            messages.push(Message::user(exchange.question.as_str()));
            messages.push(Message::assistant(exchange.answer.as_str()));
        }
        messages.push(Message::user(question));
        messages
    }
}

fn is_anthropic_model(model: &str) -> bool {
    model.starts_with("claude")
}

/// Send one conversation to whichever provider serves `config.model`
async fn complete(client: &reqwest::Client, config: &AiConfig, system: &str, messages: &[Message]) -> Result<String> {
    if is_anthropic_model(&config.model) {
        complete_anthropic(client, config, system, messages).await
    } else {
        complete_openai(client, config, system, messages).await
    }
}

fn anthropic_body(config: &AiConfig, system: &str, messages: &[Message]) -> serde_json::Value {
    serde_json::json!({
        "model": config.model,
        "max_tokens": config.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
        "temperature": config.temperature,
        "system": system,
        "messages": messages,
    })
}

async fn complete_anthropic(
    client: &reqwest::Client,
    config: &AiConfig,
    system: &str,
    messages: &[Message],
) -> Result<String> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .map_err(|_| eyre::eyre!("ANTHROPIC_API_KEY environment variable not set (required for Claude models)"))?;

    debug!("Calling Anthropic API with model {}", config.model);

    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", &api_key)
        .header("anthropic-version", "2023-06-01")
        .header("Content-Type", "application/json")
        .json(&anthropic_body(config, system, messages))
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Anthropic API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_anthropic_text(&json)
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Anthropic API response format");
}

fn openai_body(config: &AiConfig, system: &str, messages: &[Message]) -> serde_json::Value {
    let mut all = vec![serde_json::json!({"role": "system", "content": system})];
    all.extend(messages.iter().map(|m| serde_json::json!(m)));

    let mut body = serde_json::json!({
        "model": config.model,
        "messages": all,
        "temperature": config.temperature,
        "top_p": 1,
        "n": 1,
    });
    if let Some(max_tokens) = config.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    body
}

async fn complete_openai(
    client: &reqwest::Client,
    config: &AiConfig,
    system: &str,
    messages: &[Message],
) -> Result<String> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| eyre::eyre!("OPENAI_API_KEY environment variable not set (required for OpenAI models)"))?;

    debug!("Calling OpenAI API with model {}", config.model);

    let resp = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(&api_key)
        .header("Content-Type", "application/json")
        .json(&openai_body(config, system, messages))
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("OpenAI API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_openai_text(&json)
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected OpenAI API response format");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;

    fn sample_session() -> ChatSession {
        let transcript = Transcript {
            info: VideoInfo {
                video_id: "dQw4w9WgXcQ".to_string(),
                title: "Never Gonna Give You Up".to_string(),
                author: "Rick Astley".to_string(),
                ..Default::default()
            },
            language: "en".to_string(),
            is_generated: false,
            segments: vec![
                Segment {
                    text: "We're no strangers to love".to_string(),
                    start: 0.0,
                    duration: 3.0,
                },
                Segment {
                    text: "You know the rules and so do I".to_string(),
                    start: 3.0,
                    duration: 3.0,
                },
            ],
        };
        ChatSession::new(reqwest::Client::new(), AiConfig::default(), transcript)
    }

    #[test]
    fn test_is_anthropic_model() {
        assert!(is_anthropic_model("claude-sonnet-4-5"));
        assert!(is_anthropic_model("claude-3-opus-20240229"));
        assert!(!is_anthropic_model("gpt-4o"));
        assert!(!is_anthropic_model("gpt-4o-mini"));
    }

    #[test]
    fn test_default_config() {
        let config = AiConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, None);
        assert!((config.temperature - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_prompt_contains_transcript() {
        let prompt = summary_prompt("line one\nline two");
        assert!(prompt.contains("Transcript:\nline one\nline two\n\nSummary:"));
        assert!(prompt.contains("refer to it as the video"));
    }

    #[test]
    fn test_system_prompt_has_metadata_and_transcript() {
        let session = sample_session();
        let prompt = session.system_prompt();
        assert!(prompt.contains("titled 'Never Gonna Give You Up' by Rick Astley"));
        assert!(prompt.ends_with("We're no strangers to love\nYou know the rules and so do I"));
    }

    #[test]
    fn test_messages_include_history() {
        let mut session = sample_session();
        assert_eq!(session.messages_for("Who sings?"), vec![Message::user("Who sings?")]);

        session.history.push(Exchange {
            question: "Who sings?".to_string(),
            answer: "Rick Astley.".to_string(),
        });
        let messages = session.messages_for("What year?");
        assert_eq!(
            messages,
            vec![
                Message::user("Who sings?"),
                Message::assistant("Rick Astley."),
                Message::user("What year?"),
            ]
        );

        session.clear_history();
        assert!(session.history().is_empty());
        assert_eq!(session.messages_for("Again?").len(), 1);
    }

    #[test]
    fn test_openai_body() {
        let config = AiConfig {
            model: "gpt-4o".to_string(),
            max_tokens: Some(256),
            temperature: 0.5,
        };
        let body = openai_body(&config, "be brief", &[Message::user("hi")]);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0], serde_json::json!({"role": "system", "content": "be brief"}));
        assert_eq!(body["messages"][1], serde_json::json!({"role": "user", "content": "hi"}));
        assert_eq!(body["temperature"], 0.5);
    }

    #[test]
    fn test_openai_body_omits_unset_max_tokens() {
        let body = openai_body(&AiConfig::default(), "sys", &[]);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_anthropic_body() {
        let config = AiConfig {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: None,
            temperature: 0.3,
        };
        let body = anthropic_body(&config, "sys", &[Message::user("hi"), Message::assistant("hello")]);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_extract_anthropic_text() {
        let json = serde_json::json!({
            "content": [
                {
                    "type": "text",
                    "text": "Here is the summary."
                }
            ]
        });
        assert_eq!(extract_anthropic_text(&json).unwrap(), "Here is the summary.");
    }

    #[test]
    fn test_extract_anthropic_text_empty() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_text(&json).is_err());
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": "Summary of the video."
                    }
                }
            ]
        });
        assert_eq!(extract_openai_text(&json).unwrap(), "Summary of the video.");
    }

    #[test]
    fn test_extract_openai_text_empty() {
        let json = serde_json::json!({"choices": []});
        assert!(extract_openai_text(&json).is_err());
    }

    #[tokio::test]
    async fn test_summarize_rejects_invalid_url() {
        let client = reqwest::Client::new();
        let err = summarize(&client, &AiConfig::default(), "not a url", &TranscriptOptions::default())
            .await
            .unwrap_err();
        assert_eq!(crate::error::classify(&err).unwrap().kind(), "invalid_url");
    }
}
