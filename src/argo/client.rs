//! Argo Workflows REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{TemplateCatalog, WorkflowExecutor};
use crate::emit::WorkflowManifest;
use crate::error::{Error, Result};
use crate::template::TemplateDocument;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`ArgoClient`].
#[derive(Debug, Clone)]
pub struct ArgoClientConfig {
    /// Server base URL, e.g. `https://argo.example.org`
    pub base_url: String,
    pub namespace: String,
    /// Bearer token, sent as-is when present
    pub token: Option<String>,
    pub verify_tls: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Client for the Argo server's workflow-template and workflow endpoints.
#[derive(Clone)]
pub struct ArgoClient {
    client: Client,
    config: ArgoClientConfig,
}

impl ArgoClient {
    pub fn new(config: ArgoClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        if !config.verify_tls {
            warn!(base_url = %config.base_url, "TLS verification disabled for Argo server");
        }

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path,
            self.config.namespace
        )
    }

    /// URL of one workflow template, with the name escaped as a single path segment.
    fn template_url(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url("workflow-templates"))
            .map_err(|e| Error::Config(format!("Invalid Argo base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid Argo base URL: {}", self.config.base_url)))?
            .push(name);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token.trim_start_matches("Bearer ").trim()),
            None => request,
        }
    }
}

/// Names from a workflow-template list response (`items[].metadata.name`).
fn template_names(list: &Value) -> Vec<String> {
    list.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/metadata/name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl TemplateCatalog for ArgoClient {
    async fn fetch_template(&self, name: &str) -> Result<TemplateDocument> {
        if name.trim().is_empty() {
            return Err(Error::TemplateNotFound(name.to_string()));
        }
        let url = self.template_url(name)?;
        debug!(url = %url, "fetching workflow template");

        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::TemplateNotFound(name.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;

        response
            .json::<TemplateDocument>()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("invalid template '{}': {}", name, e)))
    }

    async fn list_template_names(&self) -> Result<Vec<String>> {
        let response = self
            .authorize(self.client.get(self.url("workflow-templates")))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;

        let list: Value = response
            .json()
            .await
            .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
        Ok(template_names(&list))
    }
}

#[async_trait]
impl WorkflowExecutor for ArgoClient {
    async fn submit(&self, manifest: &WorkflowManifest) -> Result<String> {
        let response = self
            .authorize(self.client.post(self.url("workflows")))
            .json(&json!({ "workflow": manifest }))
            .send()
            .await
            .map_err(|e| Error::ExecutorSubmissionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExecutorSubmissionFailed(format!(
                "Argo server returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let created: Value = response
            .json()
            .await
            .map_err(|e| Error::ExecutorSubmissionFailed(e.to_string()))?;
        let name = created
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::ExecutorSubmissionFailed("response has no metadata.name".to_string())
            })?;

        info!(workflow = %name, namespace = %self.config.namespace, "workflow submitted");
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ArgoClient {
        ArgoClient::new(ArgoClientConfig {
            base_url: base_url.to_string(),
            namespace: "virtual-measurement".to_string(),
            token: Some("Bearer abc".to_string()),
            verify_tls: true,
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let c = client("https://argo.example.org/");
        assert_eq!(
            c.url("workflow-templates"),
            "https://argo.example.org/api/v1/workflow-templates/virtual-measurement"
        );
        assert_eq!(
            c.url("workflows"),
            "https://argo.example.org/api/v1/workflows/virtual-measurement"
        );
    }

    #[test]
    fn test_template_url_escapes_name() {
        let c = client("https://argo.example.org");
        assert_eq!(
            c.template_url("tp-scaling").unwrap().as_str(),
            "https://argo.example.org/api/v1/workflow-templates/virtual-measurement/tp-scaling"
        );
        assert_eq!(
            c.template_url("a/b?c").unwrap().as_str(),
            "https://argo.example.org/api/v1/workflow-templates/virtual-measurement/a%2Fb%3Fc"
        );
    }

    #[tokio::test]
    async fn test_blank_template_name_is_not_found() {
        let c = client("http://127.0.0.1:9");
        let err = c.fetch_template("  ").await.unwrap_err();
        assert_eq!(err.code(), "TEMPLATE_NOT_FOUND");
    }

    #[test]
    fn test_template_names_from_list() {
        let list = json!({
            "items": [
                {"metadata": {"name": "tp-scaling"}},
                {"metadata": {}},
                {"metadata": {"name": "tp-filter"}}
            ]
        });
        assert_eq!(template_names(&list), vec!["tp-scaling", "tp-filter"]);
        assert!(template_names(&json!({"items": null})).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_unavailable() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let c = client("http://127.0.0.1:9");
        let err = c.fetch_template("tp-scaling").await.unwrap_err();
        assert_eq!(err.code(), "CATALOG_UNAVAILABLE");
    }
}
