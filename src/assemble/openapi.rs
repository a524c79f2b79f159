use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;

use crate::types::{GeneratedSection, TableOfContents};

/// Collects structured fragments into a single OpenAPI 3 document.
///
/// Outline sections carrying an `operation` ("GET /users") contribute path
/// items; the rest contribute component schemas keyed by section id.
/// Metadata (title, version, server, bearer auth) is injected at assembly
/// time.
pub struct OpenApiAssembler {
    pub content_dir: PathBuf,
    pub title: String,
    pub version: String,
    pub server_url: String,
}

impl OpenApiAssembler {
    pub fn build(&self, toc: &TableOfContents, sections: &[GeneratedSection]) -> Result<Value> {
        let mut paths: Map<String, Value> = Map::new();
        let mut schemas: Map<String, Value> = Map::new();

        for section in sections {
            let fragment: Value = serde_json::from_str(&section.content)
                .with_context(|| format!("section '{}' is not a JSON fragment", section.id))?;

            let operation = toc
                .sections
                .iter()
                .find(|s| s.id == section.id)
                .and_then(|s| s.operation.clone());

            match operation {
                Some(op) => {
                    let (method, path) = split_operation(&op).with_context(|| {
                        format!("section '{}' has a malformed operation '{}'", section.id, op)
                    })?;
                    let item = paths.entry(path).or_insert_with(|| json!({}));
                    item.as_object_mut()
                        .expect("path item is always an object")
                        .insert(method, fragment);
                }
                None => {
                    schemas.insert(section.id.clone(), fragment);
                }
            }
        }

        Ok(json!({
            "openapi": "3.0.3",
            "info": {
                "title": self.title,
                "version": self.version,
            },
            "servers": [{"url": self.server_url}],
            "paths": paths,
            "components": {
                "schemas": schemas,
                "securitySchemes": {
                    "bearerAuth": {
                        "type": "http",
                        "scheme": "bearer",
                        "bearerFormat": "JWT",
                    }
                }
            },
            "security": [{"bearerAuth": []}],
        }))
    }

    pub fn write(
        &self,
        toc: &TableOfContents,
        sections: &[GeneratedSection],
    ) -> Result<Vec<PathBuf>> {
        let document = self.build(toc, sections)?;
        let yaml = serde_yaml::to_string(&document)?;

        fs::create_dir_all(&self.content_dir)?;
        let path = self.content_dir.join("openapi-spec.yaml");
        fs::write(&path, yaml)?;

        Ok(vec![path])
    }
}

/// "GET /users" -> ("get", "/users")
fn split_operation(operation: &str) -> Option<(String, String)> {
    let mut parts = operation.split_whitespace();
    let method = parts.next()?.to_lowercase();
    let path = parts.next()?.to_string();
    Some((method, path))
}
