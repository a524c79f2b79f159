use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::{Engine, EngineError, EngineSelectors, ExecuteRequest, ExecuteResponse};

pub struct HttpEngine {
    server_url: String,
    token: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct ExecuteBody<'a> {
    data: &'a HashMap<String, Value>,
    config: &'a EngineSelectors,
    #[serde(rename = "resultSchema", skip_serializing_if = "Option::is_none")]
    result_schema: Option<&'a Value>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    payload: Option<ErrorPayload>,
}

#[derive(serde::Deserialize)]
struct ErrorPayload {
    error: Option<Value>,
}

impl HttpEngine {
    pub fn new(server_url: &str, token: Option<&str>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            token: token.map(|t| t.to_string()),
            client,
        }
    }

    async fn post_execute(
        &self,
        interaction: &str,
        request: &ExecuteRequest,
        schema: Option<&Value>,
    ) -> Result<ExecuteResponse, EngineError> {
        let url = format!(
            "{}/api/interactions/{}/execute",
            self.server_url, interaction
        );

        let body = ExecuteBody {
            data: &request.data,
            config: &request.config,
            result_schema: schema,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                EngineError::Call {
                    message: format!(
                        "Cannot connect to generation server at {}. Is it running?",
                        self.server_url
                    ),
                    detail: None,
                }
            } else {
                EngineError::Transport(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let raw = response.text().await.unwrap_or_default();

            // The service reports failures as {message, payload: {error}}.
            let parsed: Option<ErrorBody> = serde_json::from_str(&raw).ok();
            let (message, detail) = match parsed {
                Some(body) => (
                    body.message
                        .unwrap_or_else(|| format!("execution failed with status {}", status)),
                    body.payload.and_then(|p| p.error),
                ),
                None => (
                    format!("execution failed with status {}: {}", status, raw),
                    None,
                ),
            };

            return Err(EngineError::Call {
                message: format!("{} (status {})", message, status.as_u16()),
                detail,
            });
        }

        response
            .json::<ExecuteResponse>()
            .await
            .map_err(EngineError::Transport)
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn execute(
        &self,
        interaction: &str,
        request: ExecuteRequest,
    ) -> Result<ExecuteResponse, EngineError> {
        self.post_execute(interaction, &request, None).await
    }

    async fn execute_structured(
        &self,
        interaction: &str,
        request: ExecuteRequest,
        schema: Value,
    ) -> Result<ExecuteResponse, EngineError> {
        self.post_execute(interaction, &request, Some(&schema)).await
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        let url = format!("{}/api/health", self.server_url);

        let mut builder = self.client.get(&url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|_| EngineError::Call {
            message: format!(
                "Cannot connect to generation server at {}. Is it running?",
                self.server_url
            ),
            detail: None,
        })?;

        if !response.status().is_success() {
            return Err(EngineError::Call {
                message: format!("generation server health check failed: {}", response.status()),
                detail: None,
            });
        }

        Ok(())
    }
}
