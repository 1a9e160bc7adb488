//! Gemini REST implementation of [`GenerationClient`].
//!
//! ## Wire format
//!
//! ```text
//! POST {endpoint}/{model}:generateContent
//! x-goog-api-key: <key>
//!
//! { "contents": [{ "role": "user",
//!                  "parts": [ { "inlineData": { "mimeType", "data" } },
//!                             { "text": "<prompt>" } ] }],
//!   "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] } }
//! ```
//!
//! The first candidate part carrying `inlineData` is the generated image.
//! A response with only text (the model refusing, or describing instead of
//! drawing) is an unusable payload; the text is passed through as the cause.

use super::client::{GenerationClient, GenerationError};
use crate::capture::ImagePayload;
use crate::config::GenerationConfig;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl GeminiClient {
    /// Build a client from config and an explicit API key.
    pub fn new(api_key: impl Into<String>, config: &GenerationConfig) -> Result<Self, GenerationError> {
        let timeout = config.timeout();
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Build a client reading the API key from the configured environment
    /// variable.
    pub fn from_env(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(key, config)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    async fn send_request(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<ImagePayload, GenerationError> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            tracing::warn!(status = status.as_u16(), "generation request rejected");
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        extract_image(parsed)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GenerationError {
        match self.timeout {
            Some(t) if err.is_timeout() => GenerationError::Timeout(t),
            _ if err.is_decode() => {
                GenerationError::UnusablePayload(format!("Failed to parse Gemini response: {err}"))
            }
            _ => GenerationError::Transport(format!("Gemini API request failed: {err}")),
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        source: &ImagePayload,
        prompt: &str,
    ) -> Result<ImagePayload, GenerationError> {
        tracing::info!(
            model = %self.model,
            source_bytes = source.len(),
            prompt_chars = prompt.chars().count(),
            "sending generation request"
        );
        let request = build_request(source, prompt);
        let image = self.send_request(&request).await?;
        tracing::info!(
            mime = image.mime_type(),
            bytes = image.len(),
            "generation request succeeded"
        );
        Ok(image)
    }
}

fn build_request(source: &ImagePayload, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: source.mime_type().to_string(),
                        data: BASE64_STANDARD.encode(source.bytes()),
                    },
                },
                Part::Text {
                    text: prompt.to_string(),
                },
            ],
        }],
        generation_config: GenerationSettings {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationSettings,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_modalities: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_image(response: GenerateContentResponse) -> Result<ImagePayload, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::UnusablePayload(format!(
            "Prompt was blocked ({reason})"
        )));
    }

    let candidates = response.candidates.unwrap_or_default();
    let mut texts = Vec::new();
    let mut finish_reason = None;

    for candidate in candidates {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            if let Some(inline) = part.inline_data {
                let bytes = BASE64_STANDARD.decode(inline.data.trim()).map_err(|e| {
                    GenerationError::UnusablePayload(format!("Image data is not valid base64: {e}"))
                })?;
                if bytes.is_empty() {
                    continue;
                }
                return Ok(ImagePayload::new(inline.mime_type, bytes));
            }
            if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
                texts.push(text);
            }
        }
    }

    let detail = if !texts.is_empty() {
        texts.join(" ")
    } else if let Some(reason) = finish_reason {
        format!("finish reason {reason}")
    } else {
        "empty response".to_string()
    };
    Err(GenerationError::UnusablePayload(format!(
        "No image returned: {detail}"
    )))
}

fn map_http_error(status: StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    GenerationError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn request_carries_image_then_prompt() {
        let source = ImagePayload::new("image/jpeg", vec![1u8, 2, 3]);
        let request = build_request(&source, "Viking");
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "Viking");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let config = GenerationConfig {
            endpoint: "https://example.test/v1beta/models/".into(),
            model: "m-1".into(),
            ..Default::default()
        };
        let client = GeminiClient::new("k", &config).unwrap();
        assert_eq!(client.url(), "https://example.test/v1beta/models/m-1:generateContent");
        assert_eq!(client.model(), "m-1");
    }

    #[test]
    fn from_env_without_key_fails() {
        let config = GenerationConfig {
            api_key_env: "CHRONOSNAP_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let err = GeminiClient::from_env(&config).err().unwrap();
        assert!(matches!(err, GenerationError::MissingApiKey(_)));
        assert!(err.to_string().contains("CHRONOSNAP_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn extract_first_inline_image() {
        let response = parse(
            r#"{
                "candidates": [{
                    "content": { "parts": [
                        { "text": "Here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                    ]},
                    "finishReason": "STOP"
                }]
            }"#,
        );
        let image = extract_image(response).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes(), &[1u8, 2, 3]);
    }

    #[test]
    fn text_only_response_is_unusable_with_text_as_cause() {
        let response = parse(
            r#"{ "candidates": [{ "content": { "parts": [
                { "text": "I cannot edit this photo." }
            ]}}]}"#,
        );
        let err = extract_image(response).unwrap_err();
        assert!(matches!(err, GenerationError::UnusablePayload(_)));
        assert!(err.to_string().contains("I cannot edit this photo."));
    }

    #[test]
    fn empty_response_is_unusable() {
        let err = extract_image(parse("{}")).unwrap_err();
        assert_eq!(err.to_string(), "No image returned: empty response");
    }

    #[test]
    fn finish_reason_reported_when_no_parts() {
        let response = parse(r#"{ "candidates": [{ "finishReason": "SAFETY" }] }"#);
        let err = extract_image(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn blocked_prompt_is_unusable() {
        let response = parse(r#"{ "promptFeedback": { "blockReason": "OTHER" } }"#);
        let err = extract_image(response).unwrap_err();
        assert!(err.to_string().contains("blocked (OTHER)"));
    }

    #[test]
    fn invalid_base64_is_unusable() {
        let response = parse(
            r#"{ "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "!!!" } }
            ]}}]}"#,
        );
        assert!(matches!(
            extract_image(response),
            Err(GenerationError::UnusablePayload(_))
        ));
    }

    #[test]
    fn http_error_uses_json_message() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        let err = map_http_error(StatusCode::FORBIDDEN, body);
        assert_eq!(
            err.to_string(),
            "API error 403: PERMISSION_DENIED: API key not valid"
        );
    }

    #[test]
    fn http_error_falls_back_to_raw_body() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream exploded");
        assert!(matches!(
            err,
            GenerationError::Api { status: 502, ref message } if message == "upstream exploded"
        ));
    }

    // =========================================================================
    // Over the wire, against a loopback server
    // =========================================================================

    /// Read one HTTP request: headers plus a `Content-Length` body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve one canned response. The handle yields the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/v1beta/models"), handle)
    }

    fn client_for(endpoint: String, timeout_secs: u64) -> GeminiClient {
        let config = GenerationConfig {
            endpoint,
            timeout_secs,
            ..Default::default()
        };
        GeminiClient::new("test-key", &config).unwrap()
    }

    fn portrait() -> ImagePayload {
        ImagePayload::new("image/jpeg", vec![1u8, 2, 3])
    }

    #[tokio::test]
    async fn generate_posts_to_model_with_key_header() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"BAUG"}}]}}]}"#,
        )
        .await;
        let client = client_for(endpoint, 5);

        let image = client.generate(&portrait(), "Viking").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes(), &[4u8, 5, 6]);
        assert!(request.starts_with(
            "POST /v1beta/models/gemini-2.5-flash-image:generateContent HTTP/1.1\r\n"
        ));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key\r\n"));
        assert!(request.contains(r#"{"text":"Viking"}"#));
        assert!(request.contains(r#""data":"AQID""#));
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let (endpoint, server) = serve_once(
            "403 Forbidden",
            r#"{"error":{"code":403,"message":"bad key","status":"PERMISSION_DENIED"}}"#,
        )
        .await;
        let client = client_for(endpoint, 5);

        let err = client.generate(&portrait(), "Viking").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(
            err,
            GenerationError::Api { status: 403, ref message } if message == "PERMISSION_DENIED: bad key"
        ));
        assert_eq!(err.to_string(), "API error 403: PERMISSION_DENIED: bad key");
    }

    #[tokio::test]
    async fn malformed_success_body_is_unusable() {
        let (endpoint, server) = serve_once("200 OK", "not json at all").await;
        let client = client_for(endpoint, 5);

        let err = client.generate(&portrait(), "Viking").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, GenerationError::UnusablePayload(_)));
    }

    #[tokio::test]
    async fn hung_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            // Never answer
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });
        let client = client_for(format!("http://{addr}/v1beta/models"), 1);

        let err = client.generate(&portrait(), "Viking").await.unwrap_err();
        server.abort();

        assert!(matches!(err, GenerationError::Timeout(t) if t == Duration::from_secs(1)));
    }
}
