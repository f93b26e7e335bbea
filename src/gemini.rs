use std::future::Future;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_VAR: &str = "GEMINI_API_KEY";
const API_KEY_PLACEHOLDER: &str = "your_api_key_here";

/// Cap on how much of an error body ends up in a message.
const ERROR_BODY_LIMIT: usize = 300;

/// A validated image ready to send: raw file bytes plus the MIME type
/// detected while decoding.
pub struct EncodedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// The remote vision model seam. The batch pipeline only ever sees
/// (prompt, image) -> free-form text, so tests can substitute a mock.
pub trait VisionModel {
    fn describe_image(
        &self,
        prompt: &str,
        image: &EncodedImage,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Read the Gemini API key from the environment, rejecting the template
/// placeholder so a half-configured setup fails before any request.
pub fn load_api_key() -> Result<String> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.is_empty() && key != API_KEY_PLACEHOLDER => Ok(key),
        _ => bail!(
            "{API_KEY_VAR} not found or not set properly.\n\
             Export your Gemini API key before running, e.g.:\n\
             \x20 export {API_KEY_VAR}=<your key>"
        ),
    }
}

/// Client for the Gemini `generateContent` REST endpoint. One authenticated
/// client is constructed per run and reused for every request.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the API base URL. Intended for tests only.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        self.base_url = url;
        self
    }
}

impl VisionModel for GeminiClient {
    async fn describe_image(&self, prompt: &str, image: &EncodedImage) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: prompt },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: STANDARD.encode(&image.data),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;
        if !status.is_success() {
            bail!("Gemini API returned HTTP {status}: {}", truncate_body(&text));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).context("Unexpected Gemini response shape")?;
        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if reply.is_empty() {
            bail!("Empty response from Gemini (no candidates)");
        }
        Ok(reply)
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_LIMIT {
        body.to_string()
    } else {
        let cut: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{cut}...")
    }
}

// ── Wire types ──

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

// ── Test-only mock ──


// ── Tests ──
