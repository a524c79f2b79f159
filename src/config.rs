use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_MODEL: &str = "default";

/// Optional `docweave.toml` in the working directory. Every field is a
/// default; CLI flags and environment variables win over it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub environment: Option<String>,
    pub model: Option<String>,
    pub context_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("docweave.toml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Fully resolved run configuration: flag > env var > config file > default.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub server_url: String,
    pub token: Option<String>,
    pub environment: String,
    pub model: String,
    pub context_dir: PathBuf,
}

impl RunConfig {
    pub fn resolve(
        file: &FileConfig,
        server_url: Option<String>,
        token: Option<String>,
        environment: Option<String>,
        model: Option<String>,
        context_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let server_url = server_url
            .or_else(|| std::env::var("DOCWEAVE_SERVER_URL").ok())
            .or_else(|| file.server_url.clone())
            .filter(|s| !s.is_empty());

        let server_url = match server_url {
            Some(url) => url,
            None => anyhow::bail!(
                "No generation server configured. Pass --server-url, set \
                 DOCWEAVE_SERVER_URL, or add server_url to docweave.toml."
            ),
        };

        Ok(Self {
            server_url,
            token: token
                .or_else(|| std::env::var("DOCWEAVE_TOKEN").ok())
                .or_else(|| file.token.clone()),
            environment: environment
                .or_else(|| file.environment.clone())
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            model: model
                .or_else(|| file.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            context_dir: context_dir
                .or_else(|| file.context_dir.clone())
                .unwrap_or_else(default_context_dir),
        })
    }
}

/// Contexts live under the platform data directory so independent runs in
/// different working directories can share them by name.
pub fn default_context_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("docweave").join("contexts"))
        .unwrap_or_else(|| PathBuf::from(".docweave/contexts"))
}
