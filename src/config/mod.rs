//! Configuration management.
//!
//! vmflow configuration can come from:
//! - Config file (~/.config/vmflow/config.toml, or `--config <file>`)
//! - Environment variables (VMFLOW_*), which override the file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::argo::ArgoClientConfig;
use crate::emit::ManifestSettings;
use crate::error::{Error, Result};
use crate::graph::ArtifactPolicy;
use crate::pipeline::PipelineSettings;

/// vmflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Argo server connection
    #[serde(default)]
    pub argo: ArgoConfig,

    /// Settings applied to every emitted workflow
    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgoConfig {
    #[serde(default = "default_argo_url")]
    pub base_url: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Bearer token for the Argo server
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default = "default_true")]
    pub verify_tls: bool,

    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_seconds: u64,

    #[serde(default = "default_executor_timeout")]
    pub executor_timeout_seconds: u64,
}

impl Default for ArgoConfig {
    fn default() -> Self {
        Self {
            base_url: default_argo_url(),
            namespace: default_namespace(),
            token: None,
            verify_tls: true,
            catalog_timeout_seconds: default_catalog_timeout(),
            executor_timeout_seconds: default_executor_timeout(),
        }
    }
}

fn default_argo_url() -> String {
    "https://argowf.hpc.wzl-iqs.rwth-aachen.de".to_string()
}

fn default_namespace() -> String {
    "virtual-measurement".to_string()
}

fn default_true() -> bool {
    true
}

fn default_catalog_timeout() -> u64 {
    30
}

fn default_executor_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_generate_name")]
    pub generate_name: String,

    /// Name of the generated DAG template
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,

    #[serde(default = "default_image_pull_secrets")]
    pub image_pull_secrets: Vec<String>,

    /// Storage endpoint used when a request's credentials carry none
    #[serde(default = "default_storage_endpoint")]
    pub default_storage_endpoint: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            generate_name: default_generate_name(),
            entrypoint: default_entrypoint(),
            image_pull_secrets: default_image_pull_secrets(),
            default_storage_endpoint: default_storage_endpoint(),
        }
    }
}

fn default_generate_name() -> String {
    "vm-gui-job-".to_string()
}

fn default_entrypoint() -> String {
    "main-dag".to_string()
}

fn default_image_pull_secrets() -> Vec<String> {
    vec!["vm-pipeline-image-pull-secret".to_string()]
}

fn default_storage_endpoint() -> String {
    "https://s3.rwth-aachen.de".to_string()
}

/// Template catalog source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Serve templates from this directory instead of the Argo server
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub required_artifacts: ArtifactPolicy,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing or unreadable default file is not an error.
    pub fn load() -> Self {
        let path = Self::config_dir().join("config.toml");
        let mut config = Self::from_path(&path).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("vmflow"))
            .unwrap_or_else(|| PathBuf::from(".vmflow"))
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("VMFLOW_SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = var("VMFLOW_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(url) = var("VMFLOW_ARGO_URL") {
            self.argo.base_url = url;
        }
        if let Some(namespace) = var("VMFLOW_ARGO_NAMESPACE") {
            self.argo.namespace = namespace;
        }
        if let Some(token) = var("VMFLOW_ARGO_TOKEN") {
            self.argo.token = Some(token);
        }
        if let Some(verify) = var("VMFLOW_ARGO_VERIFY_TLS") {
            self.argo.verify_tls = verify.to_lowercase() != "false";
        }
        if let Some(dir) = var("VMFLOW_TEMPLATES_DIR") {
            self.catalog.templates_dir = Some(PathBuf::from(dir));
        }
        if let Some(policy) = var("VMFLOW_REQUIRED_ARTIFACTS") {
            match policy.parse() {
                Ok(policy) => self.validation.required_artifacts = policy,
                Err(e) => tracing::warn!("Ignoring VMFLOW_REQUIRED_ARTIFACTS: {}", e),
            }
        }
    }

    /// Settings for the compilation pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            manifest: ManifestSettings {
                generate_name: self.workflow.generate_name.clone(),
                namespace: self.argo.namespace.clone(),
                entrypoint: self.workflow.entrypoint.clone(),
                image_pull_secrets: self.workflow.image_pull_secrets.clone(),
                default_storage_endpoint: self.workflow.default_storage_endpoint.clone(),
            },
            artifact_policy: self.validation.required_artifacts,
            catalog_timeout: Duration::from_secs(self.argo.catalog_timeout_seconds),
            executor_timeout: Duration::from_secs(self.argo.executor_timeout_seconds),
        }
    }

    /// Connection settings for the Argo client.
    pub fn argo_client_config(&self) -> ArgoClientConfig {
        ArgoClientConfig {
            base_url: self.argo.base_url.clone(),
            namespace: self.argo.namespace.clone(),
            token: self.argo.token.clone(),
            verify_tls: self.argo.verify_tls,
            timeout: Duration::from_secs(
                self.argo
                    .catalog_timeout_seconds
                    .max(self.argo.executor_timeout_seconds),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.argo.namespace, "virtual-measurement");
        assert_eq!(config.workflow.entrypoint, "main-dag");
        assert_eq!(config.validation.required_artifacts, ArtifactPolicy::Ignore);
        assert!(config.catalog.templates_dir.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9000

[argo]
base_url = "https://argo.example.org"
namespace = "ml"
catalog_timeout_seconds = 5

[workflow]
generate_name = "pipeline-"
image_pull_secrets = []

[validation]
required_artifacts = "enforce"
"#,
        )
        .unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.argo.namespace, "ml");
        assert!(config.argo.verify_tls);
        assert_eq!(config.validation.required_artifacts, ArtifactPolicy::Enforce);

        let settings = config.pipeline_settings();
        assert_eq!(settings.manifest.namespace, "ml");
        assert_eq!(settings.manifest.generate_name, "pipeline-");
        assert!(settings.manifest.image_pull_secrets.is_empty());
        assert_eq!(settings.catalog_timeout, Duration::from_secs(5));
        assert_eq!(config.argo_client_config().timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("VMFLOW_SERVER_PORT", "9100"),
            ("VMFLOW_ARGO_NAMESPACE", "staging"),
            ("VMFLOW_ARGO_TOKEN", "Bearer xyz"),
            ("VMFLOW_ARGO_VERIFY_TLS", "false"),
            ("VMFLOW_TEMPLATES_DIR", "/srv/templates"),
            ("VMFLOW_REQUIRED_ARTIFACTS", "enforce"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.argo.namespace, "staging");
        assert_eq!(config.argo.token.as_deref(), Some("Bearer xyz"));
        assert!(!config.argo.verify_tls);
        assert_eq!(
            config.catalog.templates_dir,
            Some(PathBuf::from("/srv/templates"))
        );
        assert_eq!(config.validation.required_artifacts, ArtifactPolicy::Enforce);
    }

    #[test]
    fn test_bad_override_values_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "VMFLOW_SERVER_PORT" => Some("not-a-port".to_string()),
            "VMFLOW_REQUIRED_ARTIFACTS" => Some("strict".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.validation.required_artifacts, ArtifactPolicy::Ignore);
    }
}
