//! # Catalog
//!
//! File-backed storage for template groups, templates, and model-provider
//! configurations. The generator only sees the [`TemplateStore`] and
//! [`ProviderStore`] traits; [`Catalog`] is the implementation the CLI uses.
//!
//! ## File format
//!
//! YAML (or JSON when the file ends in `.json`):
//!
//! ```yaml
//! groups:
//!   - id: 1
//!     name: spring-boot
//!     templates:
//!       - id: 10
//!         name: entity.java.jinja2
//!         display_name: Entity
//!         root_path: out/src/main/java
//!         relative_path: "entity/{{ TableName }}.java"
//!         content_file: templates/entity.java.jinja2
//!         prompt: "Write a JPA entity for:\n{{ schema_text }}"
//! providers:
//!   - id: 1
//!     name: Local Ollama
//!     provider: ollama
//!     base_url: http://localhost:11434/v1
//!     model_name: llama3
//!     active: true
//! ```
//!
//! `content_file` and `prompt_file` are resolved relative to the catalog
//! file when it is loaded with [`Catalog::load`].

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A user-authored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub id: i64,
    /// Owning group; filled in from the enclosing group on load
    #[serde(default, skip_serializing)]
    pub group_id: i64,
    /// Template file name, e.g. `entity.java.jinja2`
    pub name: String,
    /// Template body
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_file: Option<PathBuf>,
    /// LLM prompt template; non-empty enables the LLM path
    #[serde(rename = "prompt", default, skip_serializing_if = "String::is_empty")]
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,
    /// Output root directory
    #[serde(default)]
    pub root_path: String,
    /// Output path below `root_path`; itself a template
    #[serde(rename = "relative_path", default)]
    pub relative_path_pattern: String,
    #[serde(default)]
    pub display_name: String,
}

impl TemplateSpec {
    /// Name shown in results: the display name, or the file name if unset.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Any non-empty prompt counts, whitespace included.
    pub fn has_prompt(&self) -> bool {
        !self.prompt_text.is_empty()
    }
}

/// An ordered set of templates generated together for every table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGroup {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub templates: Vec<TemplateSpec>,
}

/// A chat-completion provider record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    pub name: String,
    /// `ollama` or `openai_compatible` (any OpenAI-style API)
    #[serde(default = "default_provider")]
    pub provider: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub active: bool,
}

fn default_provider() -> String {
    "ollama".to_string()
}

/// Lookup of templates by group or id.
pub trait TemplateStore: Send + Sync {
    /// Templates of a group in stable order, or `None` if the group is unknown.
    fn group_templates(&self, group_id: i64) -> Option<Vec<TemplateSpec>>;

    fn template(&self, template_id: i64) -> Option<TemplateSpec>;
}

/// Lookup of the single active provider configuration.
pub trait ProviderStore: Send + Sync {
    fn active(&self) -> Option<ProviderConfig>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }
}

/// Template groups and provider configurations read from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub groups: Vec<TemplateGroup>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Catalog {
    /// Parse a catalog file without resolving `content_file`/`prompt_file`.
    ///
    /// Use this when the catalog is going to be written back.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let mut catalog: Catalog = match FileFormat::for_path(path) {
            FileFormat::Json => serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse catalog JSON: {}", path.display()))?,
            FileFormat::Yaml => serde_yaml::from_str(&text)
                .with_context(|| format!("Failed to parse catalog YAML: {}", path.display()))?,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog file and inline every referenced template file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut catalog = Self::read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        catalog.resolve_files(base_dir)?;
        info!(
            path = %path.display(),
            groups = catalog.groups.len(),
            providers = catalog.providers.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Write the catalog back in the format its extension implies.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = match FileFormat::for_path(path) {
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Yaml => serde_yaml::to_string(self)?,
        };
        fs::write(path, text)
            .with_context(|| format!("Failed to write catalog: {}", path.display()))?;
        debug!(path = %path.display(), "saved catalog");
        Ok(())
    }

    fn validate(&mut self) -> anyhow::Result<()> {
        let mut group_ids = HashSet::new();
        let mut template_ids = HashSet::new();
        for group in &mut self.groups {
            if !group_ids.insert(group.id) {
                bail!("Duplicate template group id {}", group.id);
            }
            for template in &mut group.templates {
                if !template_ids.insert(template.id) {
                    bail!("Duplicate template id {}", template.id);
                }
                template.group_id = group.id;
            }
        }

        let mut provider_ids = HashSet::new();
        for provider in &self.providers {
            if !provider_ids.insert(provider.id) {
                bail!("Duplicate provider id {}", provider.id);
            }
        }
        let active = self.providers.iter().filter(|p| p.active).count();
        if active > 1 {
            warn!(active, "more than one provider marked active, using the first");
        }
        Ok(())
    }

    fn resolve_files(&mut self, base_dir: &Path) -> anyhow::Result<()> {
        for template in self.groups.iter_mut().flat_map(|g| g.templates.iter_mut()) {
            if let Some(file) = &template.content_file {
                let path = base_dir.join(file);
                template.content = fs::read_to_string(&path).with_context(|| {
                    format!(
                        "Failed to read content of template {}: {}",
                        template.name,
                        path.display()
                    )
                })?;
            }
            if let Some(file) = &template.prompt_file {
                let path = base_dir.join(file);
                template.prompt_text = fs::read_to_string(&path).with_context(|| {
                    format!(
                        "Failed to read prompt of template {}: {}",
                        template.name,
                        path.display()
                    )
                })?;
            }
        }
        Ok(())
    }

    /// Mark one provider active and every other provider inactive.
    pub fn activate(&mut self, provider_id: i64) -> anyhow::Result<()> {
        if !self.providers.iter().any(|p| p.id == provider_id) {
            bail!("LLM provider {provider_id} not found");
        }
        for provider in &mut self.providers {
            provider.active = provider.id == provider_id;
        }
        info!(provider_id, "activated LLM provider");
        Ok(())
    }
}

impl TemplateStore for Catalog {
    fn group_templates(&self, group_id: i64) -> Option<Vec<TemplateSpec>> {
        self.groups
            .iter()
            .find(|g| g.id == group_id)
            .map(|g| g.templates.clone())
    }

    fn template(&self, template_id: i64) -> Option<TemplateSpec> {
        self.groups
            .iter()
            .flat_map(|g| g.templates.iter())
            .find(|t| t.id == template_id)
            .cloned()
    }
}

impl ProviderStore for Catalog {
    fn active(&self) -> Option<ProviderConfig> {
        self.providers.iter().find(|p| p.active).cloned()
    }
}
