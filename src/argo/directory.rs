//! Catalog backed by a directory of template YAML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::TemplateCatalog;
use crate::error::{Error, Result};
use crate::template::{parse_template_file, TemplateDocument};

/// Templates loaded once from `*.yaml` / `*.yml` files.
///
/// A document is registered under its `metadata.name`, or under the file stem
/// when the document has no name.
pub struct DirectoryCatalog {
    templates: BTreeMap<String, TemplateDocument>,
}

impl DirectoryCatalog {
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "Templates directory not found: {}",
                root.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        paths.sort();

        let mut templates = BTreeMap::new();
        for path in paths {
            let document = match parse_template_file(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable template");
                    continue;
                }
            };
            let name = document
                .name()
                .map(str::to_string)
                .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string));
            if let Some(name) = name {
                if templates.insert(name.clone(), document).is_some() {
                    warn!(template = %name, path = %path.display(), "duplicate template name, later file wins");
                }
            }
        }

        info!(root = %root.display(), count = templates.len(), "loaded template directory");
        Ok(Self { templates })
    }
}

#[async_trait]
impl TemplateCatalog for DirectoryCatalog {
    async fn fetch_template(&self, name: &str) -> Result<TemplateDocument> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }

    async fn list_template_names(&self) -> Result<Vec<String>> {
        Ok(self.templates.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("scaling.yaml"),
            "metadata:\n  name: tp-scaling\nspec:\n  templates:\n    - name: fit\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("filter.yml"),
            "spec:\n  templates:\n    - name: apply\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "spec: [").unwrap();

        let catalog = DirectoryCatalog::load(dir.path()).unwrap();
        assert_eq!(
            catalog.list_template_names().await.unwrap(),
            vec!["filter", "tp-scaling"]
        );

        let doc = catalog.fetch_template("tp-scaling").await.unwrap();
        assert!(doc.sub_template("fit").is_some());

        let err = catalog.fetch_template("missing").await.unwrap_err();
        assert_eq!(err.code(), "TEMPLATE_NOT_FOUND");
    }

    #[test]
    fn test_missing_directory() {
        let err = DirectoryCatalog::load("/definitely/not/here").err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
