//! Gemini Provider Implementation
//!
//! Talks to Google's Generative Language API:
//!
//! - Files API: resumable upload of a local document, deletion by name
//! - `generateContent`: one request with the instruction, optional context,
//!   a `fileData` reference and a JSON response schema
//!
//! Every call is a single request. There is no retry and no client-side
//! timeout; the caller treats any failure as final for the document.
//!
//! # Examples
//!
//! ```no_run
//! use litcoder_llm::GeminiProvider;
//!
//! let provider = GeminiProvider::new("my-api-key", "gemini-2.5-pro");
//! assert_eq!(provider.model(), "gemini-2.5-pro");
//! ```

use crate::LlmError;
use litcoder_domain::{DocumentModel, GenerationRequest, RemoteDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default Generative Language API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// MIME type declared for a local document
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Gemini API provider
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

/// Body of the resumable-upload start request
#[derive(Serialize)]
struct UploadStartRequest<'a> {
    file: UploadFileMetadata<'a>,
}

#[derive(Serialize)]
struct UploadFileMetadata<'a> {
    display_name: &'a str,
}

/// Response of the finalize step
#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Request body for `generateContent`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

/// Response from `generateContent`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider against the public endpoint
    ///
    /// # Parameters
    ///
    /// - `api_key`: Generative Language API key
    /// - `model`: Model to use (e.g., "gemini-2.5-pro" or "models/gemini-2.5-pro")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the provider at a different endpoint (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Model name as configured
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    /// Upload a local file with the resumable upload protocol
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file cannot be read
    /// - The start request is rejected or carries no upload URL
    /// - The finalize request fails or returns an unexpected body
    pub async fn upload_file(&self, path: &Path) -> Result<RemoteDocument, LlmError> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_type_for(path);

        let start_url = format!("{}/upload/v1beta/files", self.endpoint);
        let start = self
            .client
            .post(&start_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadFileMetadata {
                    display_name: &display_name,
                },
            })
            .send()
            .await
            .map_err(|e| LlmError::Upload(format!("Start request failed: {}", e)))?;

        let start = check_status(start, &self.model).await?;
        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| LlmError::Upload("Upload session URL missing from response".to_string()))?;

        debug!("Upload session opened for {} ({} bytes)", display_name, bytes.len());

        let finalize = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| LlmError::Upload(format!("Upload request failed: {}", e)))?;

        let finalize = check_status(finalize, &self.model).await?;
        let uploaded = finalize
            .json::<UploadResponse>()
            .await
            .map_err(|e| LlmError::Upload(format!("Failed to parse upload response: {}", e)))?;

        Ok(RemoteDocument {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
            display_name,
        })
    }

    /// Generate structured output for one document
    ///
    /// # Returns
    ///
    /// The concatenated text parts of the first candidate
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The schema is not valid JSON
    /// - The API rejects the request
    /// - The response carries no candidate text
    pub async fn generate_content(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
        let schema: serde_json::Value = serde_json::from_str(request.schema)
            .map_err(|e| LlmError::InvalidRequest(format!("Response schema is not valid JSON: {}", e)))?;

        let mut parts = vec![Part::Text {
            text: request.instruction,
        }];
        if let Some(context) = request.context {
            parts.push(Part::Text { text: context });
        }
        parts.push(Part::File {
            file_data: FileData {
                mime_type: &request.document.mime_type,
                file_uri: &request.document.uri,
            },
        });

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let url = format!("{}/v1beta/{}:generateContent", self.endpoint, self.model_path());
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let response = check_status(response, &self.model).await?;
        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        extract_text(parsed)
    }

    /// Delete an uploaded file
    pub async fn delete_file(&self, document: &RemoteDocument) -> Result<(), LlmError> {
        let url = format!("{}/v1beta/{}", self.endpoint, document.name);
        let response = self
            .client
            .delete(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Delete request failed: {}", e)))?;

        check_status(response, &self.model).await?;
        Ok(())
    }
}

/// Map non-success statuses to provider errors
async fn check_status(response: reqwest::Response, model: &str) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimitExceeded);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(LlmError::ModelNotAvailable(model.to_string()));
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)))
}

fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::InvalidResponse(format!("Empty response: {}", reason)));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(LlmError::InvalidResponse(format!(
            "Candidate has no text (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

impl DocumentModel for GeminiProvider {
    type Error = LlmError;

    async fn upload(&self, path: &Path) -> Result<RemoteDocument, Self::Error> {
        self.upload_file(path).await
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, Self::Error> {
        self.generate_content(request).await
    }

    async fn delete(&self, document: &RemoteDocument) -> Result<(), Self::Error> {
        self.delete_file(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::io::Write;

    fn sample_document(uri: &str) -> RemoteDocument {
        RemoteDocument {
            name: "files/abc123".to_string(),
            uri: uri.to_string(),
            mime_type: "application/pdf".to_string(),
            display_name: "roe2016.pdf".to_string(),
        }
    }

    #[test]
    fn test_gemini_provider_creation() {
        let provider = GeminiProvider::new("key", "gemini-2.5-pro");
        assert_eq!(provider.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(provider.model(), "gemini-2.5-pro");
        assert_eq!(provider.model_path(), "models/gemini-2.5-pro");
    }

    #[test]
    fn test_model_path_keeps_prefix() {
        let provider = GeminiProvider::new("key", "models/gemini-2.5-flash")
            .with_endpoint("http://localhost:9999/");
        assert_eq!(provider.model_path(), "models/gemini-2.5-flash");
        assert_eq!(provider.endpoint(), "http://localhost:9999");
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.pdf")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("A.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_request_serialization() {
        let document = sample_document("https://files/abc123");
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: "instruction" },
                    Part::Text { text: "context" },
                    Part::File {
                        file_data: FileData {
                            mime_type: &document.mime_type,
                            file_uri: &document.uri,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
                response_schema: json!({"type": "object"}),
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "instruction");
        assert_eq!(value["contents"][0]["parts"][1]["text"], "context");
        assert_eq!(
            value["contents"][0]["parts"][2]["fileData"]["fileUri"],
            "https://files/abc123"
        );
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_upload_file_resumable_protocol() {
        let mut server = Server::new_async().await;
        let session_url = format!("{}/upload/session-1", server.url());

        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-api-key", "test-key")
            .match_header("x-goog-upload-command", "start")
            .match_header("x-goog-upload-header-content-type", "application/pdf")
            .match_body(Matcher::PartialJson(json!({"file": {"display_name": "roe2016.pdf"}})))
            .with_status(200)
            .with_header("x-goog-upload-url", &session_url)
            .create_async()
            .await;

        let finalize = server
            .mock("POST", "/upload/session-1")
            .match_header("x-goog-upload-command", "upload, finalize")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"file": {
                    "name": "files/abc123",
                    "uri": "https://example.test/files/abc123",
                    "mimeType": "application/pdf"
                }})
                .to_string(),
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roe2016.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let provider = GeminiProvider::new("test-key", "gemini-2.5-pro").with_endpoint(server.url());
        let document = provider.upload_file(&path).await.unwrap();

        assert_eq!(document.name, "files/abc123");
        assert_eq!(document.uri, "https://example.test/files/abc123");
        assert_eq!(document.display_name, "roe2016.pdf");
        start.assert_async().await;
        finalize.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_without_session_url_fails() {
        let mut server = Server::new_async().await;
        let _start = server
            .mock("POST", "/upload/v1beta/files")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let provider = GeminiProvider::new("k", "gemini-2.5-pro").with_endpoint(server.url());
        let result = provider.upload_file(&path).await;
        assert!(matches!(result, Err(LlmError::Upload(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let provider = GeminiProvider::new("k", "gemini-2.5-pro").with_endpoint("http://127.0.0.1:1");
        let result = provider.upload_file(Path::new("/definitely/not/here.pdf")).await;
        assert!(matches!(result, Err(LlmError::Io(_))));
    }

    #[tokio::test]
    async fn test_generate_content_sends_schema_and_temperature() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {
                    "temperature": 0.0,
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "object"}
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"candidates": [{
                    "content": {"parts": [{"text": "{\"Year\": "}, {"text": "2016}"}]},
                    "finishReason": "STOP"
                }]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-2.5-pro").with_endpoint(server.url());
        let document = sample_document("https://example.test/files/abc123");
        let request = GenerationRequest {
            instruction: "Code the article",
            context: None,
            document: &document,
            schema: r#"{"type": "object"}"#,
            temperature: 0.0,
        };

        let text = provider.generate_content(&request).await.unwrap();
        assert_eq!(text, r#"{"Year": 2016}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_content_blocked_prompt() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(200)
            .with_body(json!({"promptFeedback": {"blockReason": "SAFETY"}}).to_string())
            .create_async()
            .await;

        let provider = GeminiProvider::new("k", "gemini-2.5-pro").with_endpoint(server.url());
        let document = sample_document("u");
        let request = GenerationRequest {
            instruction: "i",
            context: None,
            document: &document,
            schema: "{}",
            temperature: 0.0,
        };

        match provider.generate_content(&request).await {
            Err(LlmError::InvalidResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("Expected InvalidResponse, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_generate_content_rate_limited() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
            .with_status(429)
            .create_async()
            .await;

        let provider = GeminiProvider::new("k", "gemini-2.5-pro").with_endpoint(server.url());
        let document = sample_document("u");
        let request = GenerationRequest {
            instruction: "i",
            context: None,
            document: &document,
            schema: "{}",
            temperature: 0.0,
        };

        let result = provider.generate_content(&request).await;
        assert!(matches!(result, Err(LlmError::RateLimitExceeded)));
    }

    #[tokio::test]
    async fn test_generate_content_invalid_schema() {
        let provider = GeminiProvider::new("k", "gemini-2.5-pro").with_endpoint("http://127.0.0.1:1");
        let document = sample_document("u");
        let request = GenerationRequest {
            instruction: "i",
            context: None,
            document: &document,
            schema: "not json",
            temperature: 0.0,
        };

        let result = provider.generate_content(&request).await;
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_file() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1beta/files/abc123")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-2.5-pro").with_endpoint(server.url());
        provider.delete_file(&sample_document("u")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_communication_error() {
        // Nothing listens on port 1
        let provider = GeminiProvider::new("k", "gemini-2.5-pro").with_endpoint("http://127.0.0.1:1");
        let result = provider.delete_file(&sample_document("u")).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
