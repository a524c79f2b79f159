//! Scripted engine stub for pipeline tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{Engine, EngineError, ExecuteRequest, ExecuteResponse};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub interaction: String,
    pub data: HashMap<String, Value>,
    pub schema: Option<Value>,
}

/// Pops scripted outcomes in order; once the script is exhausted it echoes
/// `"<content for {part_name}>"` so walk tests can assert on content origin.
#[derive(Default)]
pub struct MockEngine {
    script: Mutex<VecDeque<Result<Value, EngineError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, value: Value) {
        self.script.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_transient(&self) {
        self.script.lock().unwrap().push_back(Err(EngineError::Call {
            message: "execution failed with status 500".to_string(),
            detail: None,
        }));
    }

    pub fn push_fatal(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(EngineError::Call {
            message: message.to_string(),
            detail: Some(json!({"reason": message})),
        }));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(
        &self,
        interaction: &str,
        request: &ExecuteRequest,
        schema: Option<Value>,
    ) -> Result<ExecuteResponse, EngineError> {
        self.calls.lock().unwrap().push(RecordedCall {
            interaction: interaction.to_string(),
            data: request.data.clone(),
            schema,
        });

        let scripted = self.script.lock().unwrap().pop_front();
        let result = match scripted {
            Some(Ok(value)) => value,
            Some(Err(e)) => return Err(e),
            None => {
                let part_name = request
                    .data
                    .get("part_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("document");
                json!(format!("<content for {}>", part_name))
            }
        };

        Ok(ExecuteResponse {
            result,
            model_id: "mock-model".to_string(),
        })
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn execute(
        &self,
        interaction: &str,
        request: ExecuteRequest,
    ) -> Result<ExecuteResponse, EngineError> {
        self.respond(interaction, &request, None)
    }

    async fn execute_structured(
        &self,
        interaction: &str,
        request: ExecuteRequest,
        schema: Value,
    ) -> Result<ExecuteResponse, EngineError> {
        self.respond(interaction, &request, Some(schema))
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
