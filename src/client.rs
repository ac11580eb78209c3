//! Remote generation client.
//!
//! [`GenerativeClient`] is the seam between the gateway and the outside world:
//! production code uses [`GeminiClient`], tests substitute a scripted fake.
//!
//! Wire format of the Gemini `generateContent` endpoint:
//! - Auth via the `key` query parameter
//! - System instruction is the top-level `systemInstruction` field
//! - Binary documents travel inline as base64 `inlineData` parts
//! - Search grounding is requested with a `googleSearch` tool and answered
//!   through `groundingMetadata.groundingChunks`

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MAX_ERROR_BODY_CHARS: usize = 500;

/// A citation returned by the remote service next to generated text.
///
/// Taken verbatim from the response; never validated locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroundingSource {
    /// Page title, when the service provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Link to the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Inline binary content sent alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// Media type of the payload, e.g. `application/pdf`
    pub mime_type: String,
    /// Base64-encoded payload
    pub data: String,
}

impl InlineData {
    /// Encodes raw bytes for transport.
    #[must_use]
    pub fn encode(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }
}

/// One part of the user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text
    Text(String),
    /// Inline binary content
    InlineData(InlineData),
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Model identifier
    pub model: String,
    /// System instruction
    pub system_instruction: String,
    /// Parts of the user turn, in order
    pub parts: Vec<Part>,
    /// Whether to enable the search-grounding tool
    pub grounded: bool,
}

impl GenerateRequest {
    /// Concatenated text parts, mostly useful for logging and tests.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The minimal response shape the assistant needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerateResponse {
    /// Generated text; empty when the service produced nothing
    pub text: String,
    /// Grounding citations, in the order returned
    pub sources: Vec<GroundingSource>,
}

impl GenerateResponse {
    /// Creates a text-only response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Trait for generative-language-model backends.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Performs one generation call.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// unparseable response body.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;
}

// ============================================================================
// Gemini wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    system_instruction: WireSystemInstruction<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: &'a [Part],
}

#[derive(Serialize)]
struct WireSystemInstruction<'a> {
    parts: [WireText<'a>; 1],
}

#[derive(Serialize)]
struct WireText<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    google_search: EmptyObject,
}

#[derive(Serialize)]
struct EmptyObject {}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireCandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
struct WireResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Deserialize)]
struct WireGroundingChunk {
    #[serde(default)]
    web: Option<GroundingSource>,
}

// ============================================================================
// Gemini client
// ============================================================================

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Creates a client from configuration.
    ///
    /// No request timeout is set: a call runs until the service answers or
    /// the connection fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aurora-research/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_body(request: &GenerateRequest) -> WireRequest<'_> {
        WireRequest {
            contents: vec![WireContent {
                role: "user",
                parts: &request.parts,
            }],
            system_instruction: WireSystemInstruction {
                parts: [WireText {
                    text: &request.system_instruction,
                }],
            },
            tools: request.grounded.then(|| {
                vec![WireTool {
                    google_search: EmptyObject {},
                }]
            }),
        }
    }

    /// Parses a `generateContent` response body.
    ///
    /// Missing candidates or parts yield an empty text rather than an error;
    /// grounding chunks without a `uri` are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON.
    pub fn parse_response(body: &str) -> Result<GenerateResponse> {
        let wire: WireResponse = serde_json::from_str(body)?;

        let Some(candidate) = wire.candidates.into_iter().next() else {
            warn!("Generation response carried no candidates");
            return Ok(GenerateResponse::default());
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let sources = candidate
            .grounding_metadata
            .map(|g| {
                g.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter(|web| web.uri.is_some())
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerateResponse { text, sources })
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> Error {
        let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let url = self.endpoint_url(&request.model);
        let body = Self::build_body(&request);

        debug!(
            model = request.model.as_str(),
            url = url.as_str(),
            grounded = request.grounded,
            parts = request.parts.len(),
            "Sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        Self::parse_response(&body_text)
    }
}

/// Scripted stand-in for the remote service.
#[cfg(test)]
pub(crate) mod fake {
    use super::{GenerateRequest, GenerateResponse, GenerativeClient, GroundingSource};
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Returns queued outcomes in order and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedClient {
        outcomes: Mutex<VecDeque<Result<GenerateResponse>>>,
        requests: Mutex<Vec<GenerateRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedClient {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(self, text: &str) -> Self {
            self.push(Ok(GenerateResponse::text(text)))
        }

        pub(crate) fn reply_with_sources(self, text: &str, sources: Vec<GroundingSource>) -> Self {
            self.push(Ok(GenerateResponse {
                text: text.to_string(),
                sources,
            }))
        }

        pub(crate) fn fail(self) -> Self {
            self.push(Err(Error::Api {
                status: 503,
                message: "service unavailable".to_string(),
            }))
        }

        /// Every call waits for one `notify_one` on the gate before answering.
        pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn push(self, outcome: Result<GenerateResponse>) -> Self {
            self.outcomes.lock().unwrap().push_back(outcome);
            self
        }

        pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeClient for ScriptedClient {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
            self.requests.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(Error::Http {
                        message: "no scripted response left".to_string(),
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(grounded: bool) -> GenerateRequest {
        GenerateRequest {
            model: "gemini-test".to_string(),
            system_instruction: "SYSTEM".to_string(),
            parts: vec![
                Part::InlineData(InlineData {
                    mime_type: "application/pdf".to_string(),
                    data: "JVBERi0=".to_string(),
                }),
                Part::Text("analise".to_string()),
            ],
            grounded,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let req = request(true);
        let body = serde_json::to_value(GeminiClient::build_body(&req)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "application/pdf", "data": "JVBERi0=" } },
                        { "text": "analise" }
                    ]
                }],
                "systemInstruction": { "parts": [{ "text": "SYSTEM" }] },
                "tools": [{ "googleSearch": {} }]
            })
        );
    }

    #[test]
    fn test_request_without_grounding_has_no_tools() {
        let req = request(false);
        let body = serde_json::to_value(GeminiClient::build_body(&req)).unwrap();

        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_response_with_grounding() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "PRIMEIRA PARTE " }, { "text": "SEGUNDA" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "SciELO", "uri": "https://scielo.br/a" } },
                        { "web": { "title": "No link" } },
                        { "retrievedContext": {} },
                        { "web": { "uri": "https://doi.org/10.1000/x" } }
                    ]
                }
            }]
        })
        .to_string();

        let parsed = GeminiClient::parse_response(&body).unwrap();

        assert_eq!(parsed.text, "PRIMEIRA PARTE SEGUNDA");
        assert_eq!(
            parsed.sources,
            vec![
                GroundingSource {
                    title: Some("SciELO".to_string()),
                    uri: Some("https://scielo.br/a".to_string()),
                },
                GroundingSource {
                    title: None,
                    uri: Some("https://doi.org/10.1000/x".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_parse_response_skips_thought_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "pensando", "thought": true }, { "text": "RESPOSTA" }] }
            }]
        })
        .to_string();

        assert_eq!(GeminiClient::parse_response(&body).unwrap().text, "RESPOSTA");
    }

    #[test]
    fn test_parse_response_without_candidates_is_empty() {
        let parsed = GeminiClient::parse_response(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .unwrap();

        assert!(parsed.text.is_empty());
        assert!(parsed.sources.is_empty());
    }

    #[test]
    fn test_parse_response_rejects_invalid_json() {
        let err = GeminiClient::parse_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_map_http_error_truncates_body() {
        let body = "x".repeat(2_000);
        let err = GeminiClient::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, &body);

        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_inline_data_encode() {
        let inline = InlineData::encode("application/pdf", b"%PDF-");
        assert_eq!(inline.data, "JVBERi0=");
        assert_eq!(inline.mime_type, "application/pdf");
    }

    #[test]
    fn test_prompt_text_ignores_inline_data() {
        assert_eq!(request(false).prompt_text(), "analise");
    }

    #[test]
    fn test_endpoint_url() {
        let config = Config::builder()
            .api_key("k")
            .base_url("http://localhost:9000/v1beta")
            .library_dir("lib")
            .build()
            .unwrap();
        let client = GeminiClient::new(&config).unwrap();

        assert_eq!(
            client.endpoint_url("gemini-3-pro-preview"),
            "http://localhost:9000/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }
}
