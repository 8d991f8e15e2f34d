use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vault_context_core::context::{DATE_PLACEHOLDER, DEFAULT_DAILY_NOTE_TEMPLATES};
use vault_context_core::models::ResponseFormat;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub vault: VaultConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default)]
    pub default_format: ResponseFormat,
    #[serde(default = "default_max_related")]
    pub default_max_related: usize,
    #[serde(default = "default_max_related_limit")]
    pub max_related_limit: usize,
    #[serde(default = "default_daily_note_templates")]
    pub daily_note_templates: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_format: ResponseFormat::default(),
            default_max_related: default_max_related(),
            max_related_limit: default_max_related_limit(),
            daily_note_templates: default_daily_note_templates(),
        }
    }
}

fn default_max_related() -> usize {
    3
}
fn default_max_related_limit() -> usize {
    10
}
fn default_daily_note_templates() -> Vec<String> {
    DEFAULT_DAILY_NOTE_TEMPLATES
        .iter()
        .map(|t| t.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_query_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_query_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_query_limit(),
            max_limit: default_max_query_limit(),
        }
    }
}

fn default_query_limit() -> usize {
    10
}
fn default_max_query_limit() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7332".to_string()
}

impl Config {
    /// Defaults for every section, serving the vault at `root`.
    pub fn for_vault(root: impl Into<PathBuf>) -> Self {
        Self {
            vault: VaultConfig {
                root: root.into(),
                include_globs: default_include_globs(),
                exclude_globs: Vec::new(),
                follow_symlinks: false,
            },
            context: ContextConfig::default(),
            query: QueryConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vault.include_globs.is_empty() {
            anyhow::bail!("vault.include_globs must not be empty");
        }

        if self.context.max_related_limit == 0 {
            anyhow::bail!("context.max_related_limit must be >= 1");
        }
        if self.context.default_max_related == 0
            || self.context.default_max_related > self.context.max_related_limit
        {
            anyhow::bail!(
                "context.default_max_related must be in [1, {}]",
                self.context.max_related_limit
            );
        }
        if self.context.daily_note_templates.is_empty() {
            anyhow::bail!("context.daily_note_templates must not be empty");
        }
        for template in &self.context.daily_note_templates {
            if !template.contains(DATE_PLACEHOLDER) {
                anyhow::bail!(
                    "context.daily_note_templates entry '{}' must contain {}",
                    template,
                    DATE_PLACEHOLDER
                );
            }
        }

        if self.query.max_limit == 0 {
            anyhow::bail!("query.max_limit must be >= 1");
        }
        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            anyhow::bail!("query.default_limit must be in [1, {}]", self.query.max_limit);
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // A relative vault root is resolved against the config file's directory.
    if config.vault.root.is_relative() {
        if let Some(dir) = path.parent() {
            config.vault.root = dir.join(&config.vault.root);
        }
    }

    config.validate()?;
    Ok(config)
}
