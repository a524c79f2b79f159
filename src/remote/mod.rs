mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpEngine;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Server-side failure signature in remote error messages ("500", "502", ...).
static TRANSIENT_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b50\d\b").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{message}")]
    Call {
        message: String,
        /// Structured error detail attached by the service, when present.
        detail: Option<Value>,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl EngineError {
    /// Whether this failure is a server-side 5xx worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Call { message, .. } => TRANSIENT_STATUS.is_match(message),
            EngineError::Transport(e) => e.status().map(|s| s.is_server_error()).unwrap_or(false),
        }
    }

    pub fn detail(&self) -> Option<&Value> {
        match self {
            EngineError::Call { detail, .. } => detail.as_ref(),
            EngineError::Transport(_) => None,
        }
    }
}

/// Environment and model the service should execute against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSelectors {
    pub environment: String,
    pub model: String,
}

/// One remote generation request: named prompt fields plus selectors.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest {
    pub data: HashMap<String, Value>,
    pub config: EngineSelectors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub result: Value,
    #[serde(rename = "modelId", default)]
    pub model_id: String,
}

impl ExecuteResponse {
    /// The result as prose. Structured results are serialized, which keeps
    /// assembly uniform when a model returns an object for a text field.
    pub fn result_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// The remote execution service behind every generation step.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Free-form generation returning text (or whatever the service yields).
    async fn execute(
        &self,
        interaction: &str,
        request: ExecuteRequest,
    ) -> Result<ExecuteResponse, EngineError>;

    /// Generation constrained by a declared JSON-schema result contract.
    async fn execute_structured(
        &self,
        interaction: &str,
        request: ExecuteRequest,
        schema: Value,
    ) -> Result<ExecuteResponse, EngineError>;

    async fn health_check(&self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_url: String,
    pub token: Option<String>,
}

pub fn create_engine(config: &EngineConfig) -> Box<dyn Engine> {
    Box::new(HttpEngine::new(&config.server_url, config.token.as_deref()))
}
