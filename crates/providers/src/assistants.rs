//! Assistants API client (Azure OpenAI and OpenAI).
//!
//! Speaks the v2 Assistants REST surface: assistants, threads, messages,
//! runs, and files. Azure serves it under `{endpoint}/openai/...` with an
//! `api-version` query parameter and an `api-key` header; OpenAI serves it
//! under `/v1/...` with bearer auth.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use threadline_core::assistant::*;
use threadline_core::error::ProviderError;
use tracing::{debug, warn};

/// How requests authenticate.
#[derive(Clone)]
enum Auth {
    /// Azure: `api-key: <key>`
    ApiKeyHeader(String),
    /// OpenAI: `Authorization: Bearer <key>`
    Bearer(String),
}

/// An Assistants API client.
pub struct AssistantsClient {
    name: String,
    base_url: String,
    auth: Auth,
    api_version: Option<String>,
    client: reqwest::Client,
}

impl AssistantsClient {
    fn new(name: &str, base_url: String, auth: Auth, api_version: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            api_version,
            client,
        }
    }

    /// Create an Azure OpenAI client for a resource endpoint.
    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        let base_url = format!("{}/openai", endpoint.trim_end_matches('/'));
        Self::new(
            "azure",
            base_url,
            Auth::ApiKeyHeader(api_key.into()),
            Some(api_version.into()),
        )
    }

    /// Create an OpenAI client (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::openai_compatible("https://api.openai.com/v1", api_key)
    }

    /// Create a client for any endpoint speaking the OpenAI layout.
    pub fn openai_compatible(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new("openai", base_url.into(), Auth::Bearer(api_key.into()), None)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request with auth, version, and beta headers applied.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self
            .client
            .request(method, &url)
            .header("OpenAI-Beta", "assistants=v2");

        builder = match &self.auth {
            Auth::ApiKeyHeader(key) => builder.header("api-key", key),
            Auth::Bearer(key) => builder.header("Authorization", format!("Bearer {key}")),
        };

        if let Some(version) = &self.api_version {
            builder = builder.query(&[("api-version", version.as_str())]);
        }

        builder
    }

    /// Send a request and map transport and status failures.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if response.status().is_success() {
            return Ok(response);
        }

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        let error_body = response.text().await.unwrap_or_default();
        warn!(provider = %self.name, status, body = %error_body, "Assistant service returned error");

        if status == 404 {
            return Err(ProviderError::NotFound(error_body));
        }

        Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl AssistantService for AssistantsClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant, ProviderError> {
        debug!(provider = %self.name, model = %spec.model, tools = spec.tools.len(), "Creating assistant");
        self.send_json(self.request(Method::POST, "assistants").json(spec))
            .await
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        debug!(provider = %self.name, "Creating thread");
        self.send_json(
            self.request(Method::POST, "threads")
                .json(&serde_json::json!({})),
        )
        .await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> Result<ThreadMessage, ProviderError> {
        debug!(
            thread_id,
            attachments = message.attachments.len(),
            "Posting message"
        );
        self.send_json(
            self.request(Method::POST, &format!("threads/{thread_id}/messages"))
                .json(message),
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError> {
        debug!(thread_id, assistant_id, "Starting run");
        self.send_json(
            self.request(Method::POST, &format!("threads/{thread_id}/runs"))
                .json(&serde_json::json!({ "assistant_id": assistant_id })),
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        self.send_json(self.request(Method::GET, &format!("threads/{thread_id}/runs/{run_id}")))
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ProviderError> {
        debug!(thread_id, run_id, count = outputs.len(), "Submitting tool outputs");
        self.send_json(
            self.request(
                Method::POST,
                &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            )
            .json(&serde_json::json!({ "tool_outputs": outputs })),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        debug!(thread_id, run_id, "Cancelling run");
        self.send_json(self.request(
            Method::POST,
            &format!("threads/{thread_id}/runs/{run_id}/cancel"),
        ))
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError> {
        let list: ListResponse<ThreadMessage> = self
            .send_json(
                self.request(Method::GET, &format!("threads/{thread_id}/messages"))
                    .query(&[("order", "desc")]),
            )
            .await?;
        Ok(list.data)
    }

    async fn upload_file(
        &self,
        file_name: &str,
        data: Vec<u8>,
        purpose: FilePurpose,
    ) -> Result<FileObject, ProviderError> {
        debug!(file_name, bytes = data.len(), "Uploading file");
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);

        self.send_json(self.request(Method::POST, "files").multipart(form))
            .await
    }

    async fn read_file(&self, file_id: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .send(self.request(Method::GET, &format!("files/{file_id}/content")))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// --- API types (internal) ---

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}
