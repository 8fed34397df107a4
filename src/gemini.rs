//! Gemini copy generator.
//!
//! One call per image: the fixed prompt plus the raw image bytes go to the
//! `generateContent` endpoint, authenticated with the next key from the
//! rotator. No retry and no fallback key within a single call.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::KeyRotator;
use crate::error::{CopyStudioError, Result};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Facebook ad-copy instructions sent with every image.
const COPY_PROMPT: &str = "\
Write an advertising copy in English for a Facebook post based on the provided image.

Required output format:
- First line: ONLY the title, without writing the word \"Title\".
- Second line: blank.
- Then the body of the copy (without writing the word \"Description\").
- Then a blank line.
- Finally the 5 hashtags on a single line, without writing the word \"Hashtags\".

Do not include headers, labels, dashes, separators or explanations.
Deliver only the final text, ready to copy and paste.

Content requirements:
- Short, catchy, creative title with relevant emojis.
- Brief, emotional, relatable description.
- Natural use of emojis.
- Persuasive and authentic language.

Do not add introductory text or phrases like \"Here is your copy\".
Do not use Markdown formatting.";

/// Anything that can turn an image on disk into a block of ad copy.
///
/// The batch loop only talks to this trait, so tests can swap in a fake.
#[async_trait]
pub trait CopySource {
    async fn generate_copy(&mut self, image_path: &Path) -> Result<String>;
}

/// Gemini-backed copy generator.
pub struct CopyWriter {
    client: reqwest::Client,
    keys: KeyRotator,
}

impl CopyWriter {
    pub fn new(keys: KeyRotator) -> Self {
        CopyWriter {
            client: reqwest::Client::new(),
            keys,
        }
    }

    /// Builds a writer with keys from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(KeyRotator::from_env()?))
    }

    /// Number of API keys in rotation.
    pub fn key_count(&self) -> usize {
        self.keys.key_count()
    }

    async fn request_copy(&mut self, image_path: &Path) -> Result<String> {
        let api_key = self.keys.next_key().to_string();

        let bytes = tokio::fs::read(image_path).await?;
        let mime_type = mime_guess::from_path(image_path)
            .first_raw()
            .unwrap_or("image/jpeg")
            .to_string();

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiRequestPart::Text {
                        text: COPY_PROMPT.to_string(),
                    },
                    GeminiRequestPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type,
                            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
        };

        let url = format!("{GEMINI_ENDPOINT}/{GEMINI_MODEL}:generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CopyStudioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let copy = clean_text(&extract_text(&gemini_response));
        if copy.is_empty() {
            return Err(CopyStudioError::EmptyResponse);
        }

        Ok(copy)
    }
}

#[async_trait]
impl CopySource for CopyWriter {
    async fn generate_copy(&mut self, image_path: &Path) -> Result<String> {
        self.request_copy(image_path).await
    }
}

/// Concatenates the text parts of the first candidate, if any.
fn extract_text(response: &GeminiResponse) -> String {
    let mut full_text = String::new();
    if let Some(candidate) = response.candidates.first() {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(text) = &part.text {
                    full_text.push_str(text);
                }
            }
        }
    }
    full_text
}

/// Trims surrounding whitespace and normalizes Windows line endings.
fn clean_text(raw: &str) -> String {
    raw.trim().replace("\r\n", "\n")
}

// Request/Response types
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - either the prompt text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let raw = "  Title\r\nBody\r\n\r\n#a #b #c #d #e  ";
        assert_eq!(clean_text(raw), "Title\nBody\n\n#a #b #c #d #e");
    }

    #[test]
    fn test_clean_text_plain_input_is_untouched() {
        assert_eq!(clean_text("Already clean"), "Already clean");
    }

    #[test]
    fn test_whitespace_only_payload_cleans_to_empty() {
        // A whitespace-only service payload is treated like no text at
        // all: it cleans to "" and the generator reports EmptyResponse.
        let json = r#"{"candidates": [{"content": {"parts": [{"text": " \r\n  "}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(clean_text(&extract_text(&response)), "");
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiRequestPart::Text {
                        text: "prompt".into(),
                    },
                    GeminiRequestPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: "image/jpeg".into(),
                            data: "aGVsbG8=".into(),
                        },
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&body).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "prompt");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Catchy title 🎉\n\n"},
                        {"text": "Body text"}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(&response), "Catchy title 🎉\n\nBody text");
    }

    #[test]
    fn test_response_without_candidates_yields_empty_text() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(&response), "");
    }

    #[test]
    fn test_response_with_textless_parts_yields_empty_text() {
        let json = r#"{"candidates": [{"content": {"parts": [{}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(&response), "");
    }

    #[test]
    fn test_prompt_shape() {
        // Five hashtags on one line, no markdown, no filler.
        assert!(COPY_PROMPT.contains("5 hashtags on a single line"));
        assert!(COPY_PROMPT.contains("Do not use Markdown"));
        assert!(COPY_PROMPT.contains("ONLY the title"));
    }
}
