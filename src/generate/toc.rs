use anyhow::{anyhow, Context, Result};
use console::style;
use schemars::schema_for;

use crate::remote::{Engine, EngineSelectors, ExecuteRequest};
use crate::types::TableOfContents;

use super::PromptContext;

const OUTLINE_DIRECTIVE: &str = "Create a table of contents for the document \
described by the inputs. Order sections the way a reader should encounter \
them, and split any section too large to generate in one pass into parts.";

/// One schema-constrained remote call producing the outline.
///
/// Never retried here; callers guard it with the cache (`toc` key) so a
/// resumed run does not regenerate the outline.
pub async fn generate_toc(
    engine: &dyn Engine,
    selectors: &EngineSelectors,
    mut context: PromptContext,
    extra_instructions: Option<&str>,
) -> Result<TableOfContents> {
    let mut instructions = OUTLINE_DIRECTIVE.to_string();
    if let Some(extra) = extra_instructions {
        instructions.push_str("\n\n");
        instructions.push_str(extra);
    }
    context.set_text("instructions", &instructions);

    let schema = serde_json::to_value(schema_for!(TableOfContents))
        .context("failed to build table of contents schema")?;

    let request = ExecuteRequest {
        data: context.into_fields(),
        config: selectors.clone(),
    };

    let response = engine
        .execute_structured("toc", request, schema)
        .await
        .map_err(|e| {
            println!(
                "{}",
                style(format!("Table of contents generation failed: {}", e)).red()
            );
            if let Some(detail) = e.detail() {
                println!("{}", style(detail.to_string()).dim());
            }
            anyhow!("Failed to generate table of contents: {}", e)
        })?;

    let toc: TableOfContents = serde_json::from_value(response.result)
        .context("table of contents result did not match the declared schema")?;

    Ok(toc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockEngine;
    use serde_json::json;

    fn selectors() -> EngineSelectors {
        EngineSelectors {
            environment: "test".to_string(),
            model: "mock".to_string(),
        }
    }

    #[tokio::test]
    async fn test_structured_call_carries_schema_and_instructions() {
        let engine = MockEngine::new();
        engine.push_ok(json!({"sections": []}));

        let mut context = PromptContext::default();
        context.set_text("serverApi", "api source");

        generate_toc(&engine, &selectors(), context, Some("group by resource"))
            .await
            .unwrap();

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].interaction, "toc");

        let schema = calls[0].schema.as_ref().unwrap().to_string();
        assert!(schema.contains("sections"));

        let instructions = calls[0].data["instructions"].as_str().unwrap();
        assert!(instructions.contains("table of contents"));
        assert!(instructions.contains("group by resource"));
        assert_eq!(calls[0].data["serverApi"], json!("api source"));
    }

    #[tokio::test]
    async fn test_result_coerced_to_outline() {
        let engine = MockEngine::new();
        engine.push_ok(json!({
            "sections": [
                {"id": "intro", "name": "Intro", "description": "Overview"},
                {
                    "id": "auth",
                    "name": "Auth",
                    "description": "Authentication",
                    "parts": [
                        {"id": "login", "name": "Login", "description": "Login flow"}
                    ]
                }
            ]
        }));

        let toc = generate_toc(&engine, &selectors(), PromptContext::default(), None)
            .await
            .unwrap();

        assert_eq!(toc.sections.len(), 2);
        assert_eq!(toc.sections[1].parts[0].id, "login");
    }

    #[tokio::test]
    async fn test_failure_is_fatal_with_wrapped_message() {
        let engine = MockEngine::new();
        engine.push_fatal("interaction not found");

        let err = generate_toc(&engine, &selectors(), PromptContext::default(), None)
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("Failed to generate table of contents"));
        assert_eq!(engine.call_count(), 1);
    }
}
