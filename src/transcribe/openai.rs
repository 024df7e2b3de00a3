//! OpenAI chat-completions client for audio transcription
//!
//! Sends the base64-encoded MP3 as an `input_audio` user message with a
//! fixed transcription instruction, and extracts the transcript from
//! `choices[0].message.content`.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

use super::TranscribeError;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const MODEL: &str = "gpt-4o-mini-audio-preview";

/// Fixed system instruction. Wording tracks the share app's prompt:
/// target language, punctuation/capitalisation fidelity, inline
/// markers for unclear audio.
const TRANSCRIPTION_INSTRUCTIONS: &str = "\
Transcribe the following audio into Russian text.
# Notes
- Preserve the speaker's wording.
- Use correct punctuation and capitalisation.
- For unclear segments write [unintelligible] plus a timestamp where feasible.";

/// Global HTTP client for reuse across requests (avoids TLS handshake overhead)
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Token usage reported by the API, fed into the cost estimate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub audio_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Successful transcription: the text plus optional usage numbers.
#[derive(Debug, Clone)]
pub struct TranscriptionOutcome {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Build the chat-completions request body around the base64 payload.
pub fn build_request_body(base64_audio: &str) -> serde_json::Value {
    json!({
        "model": MODEL,
        "messages": [
            {
                "role": "system",
                "content": [{ "type": "text", "text": TRANSCRIPTION_INSTRUCTIONS }],
            },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": "" },
                    {
                        "type": "input_audio",
                        "input_audio": { "data": base64_audio, "format": "mp3" },
                    },
                ],
            },
        ],
        "modalities": ["text"],
        "temperature": 1,
        "max_completion_tokens": 16384,
    })
}

/// Best available message for a non-2xx response body: the structured
/// error message when the body parses, else the raw body, else the
/// status's canonical reason.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if !body.is_empty() => body.to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown API error")
            .to_string(),
    }
}

/// POST the transcription request. Non-2xx becomes an API error with
/// the server's message; a 2xx without the transcript field is a shape
/// error, never an empty success.
pub async fn request_transcription(
    credential: &str,
    base64_audio: &str,
) -> Result<TranscriptionOutcome, TranscribeError> {
    let body = build_request_body(base64_audio);

    log::info!(
        "Transcription request: {} base64 chars to {}",
        base64_audio.len(),
        MODEL
    );

    let response = get_http_client()
        .post(CHAT_COMPLETIONS_URL)
        .header("Authorization", format!("Bearer {}", credential))
        .json(&body)
        .send()
        .await
        .map_err(|e| TranscribeError::Network(e.to_string()))?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        let message = error_message(status, &error_text);
        log::error!("API error ({}): {}", status.as_u16(), message);
        return Err(TranscribeError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| TranscribeError::UnexpectedShape(e.to_string()))?;

    let text = parsed
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            TranscribeError::UnexpectedShape(
                "response carries no choices[0].message.content".to_string(),
            )
        })?;

    log::info!("Transcription successful: {} chars", text.len());

    Ok(TranscriptionOutcome {
        text,
        usage: parsed.usage,
    })
}
