use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{Application, DataEnvelope, InstallRequest, InstallResponse, Template};

/// Client for the Service Hub REST API that renders templates and runs the
/// Helm installs server-side.
#[derive(Clone)]
pub struct HubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

impl HubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("deckhand/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn templates(&self) -> Result<Vec<Template>> {
        self.get_list("templates").await
    }

    pub async fn applications(&self) -> Result<Vec<Application>> {
        self.get_list("applications").await
    }

    /// Never fails: transport and HTTP errors come back as an error-status
    /// response carrying a readable message.
    pub async fn install(&self, request: &InstallRequest) -> InstallResponse {
        let url = self.url("applications/install");
        debug!(%url, template = %request.template_id, "posting install request");
        let response = match self.authorized(self.http.post(&url)).json(request).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!("install request failed: {error}");
                return InstallResponse::error(format!("Install request failed: {error}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return InstallResponse::error(error_message(response).await);
        }

        match response.json::<InstallResponse>().await {
            Ok(parsed) => parsed,
            Err(error) => InstallResponse::error(format!("Unreadable install response: {error}")),
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        let url = self.url(resource);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("GET {url}: {}", error_message(response).await);
        }
        let envelope = response
            .json::<DataEnvelope<T>>()
            .await
            .with_context(|| format!("failed to decode {resource} from {url}"))?;
        Ok(envelope.data)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorBody>(&body).unwrap_or_default();
    let message = parsed
        .message
        .or_else(|| parsed.detail.map(detail_text))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()));
    match message {
        Some(message) => message,
        None => format!("Server responded with {status}"),
    }
}

fn detail_text(detail: Value) -> String {
    match detail {
        Value::String(text) => text,
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}
