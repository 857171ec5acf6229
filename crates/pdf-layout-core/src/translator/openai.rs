use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::retry::RetryPolicy;
use super::traits::{LengthConstraint, OcrEngine, OcrRegion, Translator, TranslatorInfo};
use crate::config::{Lang, ProviderConfig};
use crate::error::{Error, Result};
use crate::layout::BoundingBox;

const TRANSLATE_SYSTEM_PROMPT: &str = "You are a high-precision translator.";

const OCR_SYSTEM_PROMPT: &str = "You extract text with coordinates from document images.";

const OCR_INSTRUCTIONS: &str = "Extract every line of text visible in this page image. \
Return strict JSON only: an array of objects with keys text, x0, y0, x1, y1, confidence. \
Coordinates are in image pixel space with the origin at the top-left corner. \
Do not wrap the JSON in markdown or add commentary.";

/// Client for OpenAI-compatible chat-completions APIs.
///
/// Serves both translation and OCR. OCR needs a model with image input;
/// OpenRouter, OpenAI and most vision-capable local servers qualify.
pub struct OpenAiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "https://openrouter.ai/api/v1")
    pub api_base: String,
    pub api_key: Option<String>,
    pub translate_model: String,
    pub ocr_model: String,
    translate_timeout: Duration,
    ocr_timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Content,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One OCR item as the model reports it
#[derive(Debug, Deserialize)]
struct RawRegion {
    #[serde(default)]
    text: String,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    #[serde(default = "full_confidence")]
    confidence: f32,
}

const fn full_confidence() -> f32 {
    1.0
}

impl OpenAiTranslator {
    /// Build a client from provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| Error::ProviderFatal {
            operation: "client",
            reason: format!("failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            translate_model: config.translate_model.clone(),
            ocr_model: config.ocr_model.clone(),
            translate_timeout: Duration::from_secs(config.translate_timeout_secs),
            ocr_timeout: Duration::from_secs(config.ocr_timeout_secs),
            retry: RetryPolicy::new(
                config.retry_count,
                Duration::from_millis(config.retry_delay_ms),
            ),
        })
    }

    fn create_prompt(
        text: &str,
        source: &Lang,
        target: &Lang,
        constraint: Option<&LengthConstraint>,
    ) -> String {
        let mut prompt = format!(
            "Translate the text from {} to {}. Preserve meaning, numbers, special symbols, \
             and inline structure. Return only translated text without commentary.",
            language_name(source),
            language_name(target),
        );

        if let Some(c) = constraint {
            if let Some(chars) = c.max_chars {
                prompt.push_str(&format!(
                    " Keep the translation within about {chars} characters."
                ));
            }
            if let Some(lines) = c.max_lines {
                prompt.push_str(&format!(" Use at most {lines} lines."));
            }
        }

        prompt.push_str("\n\nTEXT:\n");
        prompt.push_str(text);
        prompt
    }

    fn ocr_prompt(source_hint: &Lang) -> String {
        format!(
            "{OCR_INSTRUCTIONS} The text is most likely in {}.",
            language_name(source_hint)
        )
    }

    /// Send one chat request and return the first choice's content.
    async fn chat(
        &self,
        operation: &'static str,
        model: &str,
        messages: Vec<Message>,
        timeout: Duration,
    ) -> Result<String> {
        let key = self.api_key.as_deref().ok_or(Error::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model,
            messages,
            temperature: 0.0,
        };

        self.retry
            .run(operation, |attempt| {
                debug!("{} request attempt {} to {}", operation, attempt, url);
                let req = self
                    .client
                    .post(&url)
                    .timeout(timeout)
                    .bearer_auth(key)
                    .json(&request);
                async move { read_response(operation, req.send().await).await }
            })
            .await
    }
}

/// Map transport results and HTTP statuses onto the provider error taxonomy.
async fn read_response(
    operation: &'static str,
    sent: std::result::Result<reqwest::Response, reqwest::Error>,
) -> Result<String> {
    let response = sent.map_err(|e| transport_error(operation, &e))?;
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    match classify_status(operation, response.status(), retry_after) {
        None => {}
        Some(Error::ProviderFatal { operation, reason }) => {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderFatal {
                operation,
                reason: format!("{reason}: {}", body.trim()),
            });
        }
        Some(e) => return Err(e),
    }

    let chat: ChatResponse = response
        .json()
        .await
        .map_err(|e| transport_error(operation, &e))?;

    chat.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::ProviderFatal {
            operation,
            reason: "response has no message content".to_string(),
        })
}

/// Error for a non-success status: 429 and 5xx are transient, the rest fatal.
fn classify_status(
    operation: &'static str,
    status: StatusCode,
    retry_after: Option<u64>,
) -> Option<Error> {
    if status.is_success() {
        return None;
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Some(Error::ProviderTransient {
            operation,
            reason: format!("HTTP {status}"),
            retry_after,
        });
    }

    Some(Error::ProviderFatal {
        operation,
        reason: format!("HTTP {status}"),
    })
}

fn transport_error(operation: &'static str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::ProviderTimeout { operation }
    } else if err.is_connect() || err.is_request() || err.is_body() {
        Error::ProviderTransient {
            operation,
            reason: err.to_string(),
            retry_after: None,
        }
    } else {
        Error::ProviderFatal {
            operation,
            reason: err.to_string(),
        }
    }
}

/// Strip an optional markdown code fence around a JSON payload.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse the OCR model's reply into regions in the reply's own coordinates.
pub(crate) fn parse_ocr_response(raw: &str) -> Result<Vec<OcrRegion>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| Error::OcrParse(format!("invalid JSON: {e}")))?;

    let serde_json::Value::Array(items) = value else {
        return Err(Error::OcrParse("expected a JSON array of regions".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let raw: RawRegion = serde_json::from_value(item)
                .map_err(|e| Error::OcrParse(format!("region {i}: {e}")))?;
            Ok(OcrRegion {
                text: raw.text,
                bbox: BoundingBox::new(raw.x0, raw.y0, raw.x1, raw.y1),
                confidence: raw.confidence,
            })
        })
        .collect()
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: true,
            supports_auto_detect: true,
        }
    }

    async fn translate(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
        constraint: Option<&LengthConstraint>,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        if source == target && source.as_str() != "auto" {
            return Ok(text.to_string());
        }

        let messages = vec![
            Message {
                role: "system",
                content: Content::Text(TRANSLATE_SYSTEM_PROMPT.to_string()),
            },
            Message {
                role: "user",
                content: Content::Text(Self::create_prompt(text, source, target, constraint)),
            },
        ];

        let translated = self
            .chat("translate", &self.translate_model, messages, self.translate_timeout)
            .await?;
        Ok(translated.trim().to_string())
    }
}

#[async_trait]
impl OcrEngine for OpenAiTranslator {
    async fn ocr(&self, png: &[u8], source_hint: &Lang) -> Result<Vec<OcrRegion>> {
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(png));
        let messages = vec![
            Message {
                role: "system",
                content: Content::Text(OCR_SYSTEM_PROMPT.to_string()),
            },
            Message {
                role: "user",
                content: Content::Parts(vec![
                    ContentPart::Text {
                        text: Self::ocr_prompt(source_hint),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            },
        ];

        let reply = self
            .chat("ocr", &self.ocr_model, messages, self.ocr_timeout)
            .await?;
        let regions = parse_ocr_response(&reply)?;
        debug!("OCR returned {} regions", regions.len());
        Ok(regions)
    }
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> &str {
    match lang.as_str() {
        "en" => "English",
        "tr" => "Turkish",
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        "nl" => "Dutch",
        "pl" => "Polish",
        "uk" => "Ukrainian",
        "auto" => "the detected language",
        // Models understand most ISO codes as-is
        other => other,
    }
}
