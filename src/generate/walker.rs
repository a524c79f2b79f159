use anyhow::{anyhow, Context, Result};
use console::{style, Emoji};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::ContextCache;
use crate::remote::{Engine, EngineSelectors, ExecuteRequest, ExecuteResponse};
use crate::types::{GeneratedPart, GeneratedSection, Section, TableOfContents};

use super::{render_previously_generated, PromptContext, RetryPolicy};

static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "");
static WRITE: Emoji<'_, '_> = Emoji("✍️  ", "");

const SECTION_DIRECTIVE: &str = "Write the full content for the named section \
of the document. Use the table of contents for placement and the previously \
generated sections for continuity of style and structure.";

const PART_DIRECTIVE: &str = "Write only the named subsection. Start it with \
a level-three heading matching the part name and do not restate content from \
the parent section.";

/// Depth-first, strictly ordered walk over the outline.
///
/// Each unit is generated through one remote call and persisted before the
/// next unit starts, so a killed run resumes at section granularity: a
/// section with a `section-{id}` marker in the cache is never regenerated.
pub struct SectionWalker {
    engine: Arc<dyn Engine>,
    cache: Arc<ContextCache>,
    selectors: EngineSelectors,
    policy: RetryPolicy,
    interaction: String,
}

/// Per-run totals, in the style of an indexing report.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub sections_generated: usize,
    pub sections_skipped: usize,
    pub parts_generated: usize,
}

impl SectionWalker {
    pub fn new(
        engine: Arc<dyn Engine>,
        cache: Arc<ContextCache>,
        selectors: EngineSelectors,
        policy: RetryPolicy,
        interaction: &str,
    ) -> Self {
        Self {
            engine,
            cache,
            selectors,
            policy,
            interaction: interaction.to_string(),
        }
    }

    /// Generate every pending section (and its parts) in outline order.
    ///
    /// Aborts on the first fatal or retry-exhausted unit without marking it
    /// done; the next invocation re-attempts exactly that unit.
    pub async fn generate_all(
        &self,
        toc: &TableOfContents,
    ) -> Result<(Vec<GeneratedSection>, WalkReport)> {
        let mut generated: Vec<GeneratedSection> = Vec::new();
        let mut report = WalkReport::default();

        for section in &toc.sections {
            if self.cache.get(&section.done_key()).await?.is_some() {
                println!(
                    "{}Skipping section {} (already generated)",
                    SKIP,
                    style(&section.name).dim()
                );
                generated.push(self.restore_section(section).await?);
                report.sections_skipped += 1;
                continue;
            }

            let done = self
                .generate_section(toc, section, &generated)
                .await
                .with_context(|| format!("section '{}'", section.id))?;

            // One merged save: the done marker is the section's outline
            // entry, the content lives under the g- keys alongside it.
            let mut partial = HashMap::new();
            partial.insert(section.done_key(), serde_json::to_value(section)?);
            partial.insert(section.content_key(), json!(done.content));
            for part in &done.parts {
                partial.insert(section.part_content_key(&part.id), json!(part.content));
            }
            self.cache.save(partial).await?;

            report.sections_generated += 1;
            report.parts_generated += done.parts.len();
            generated.push(done);
        }

        Ok((generated, report))
    }

    async fn generate_section(
        &self,
        toc: &TableOfContents,
        section: &Section,
        earlier: &[GeneratedSection],
    ) -> Result<GeneratedSection> {
        println!("{}Generating section {}", WRITE, style(&section.name).cyan());

        let fields = self
            .prompt_fields(
                toc,
                earlier,
                &section.name,
                SECTION_DIRECTIVE,
                section.instructions.as_deref(),
            )
            .await?;
        let response = self.call_with_retry(&fields).await?;

        let mut done = GeneratedSection {
            id: section.id.clone(),
            name: section.name.clone(),
            content: response.result_text(),
            parts: Vec::new(),
        };

        for part in &section.parts {
            let part_path = format!("{} / {}", section.name, part.name);
            println!("{}Generating part {}", WRITE, style(&part_path).cyan());

            let fields = self
                .prompt_fields(
                    toc,
                    earlier,
                    &part_path,
                    PART_DIRECTIVE,
                    part.instructions.as_deref(),
                )
                .await?;
            // Parts run under the same retry policy as their section.
            let response = self
                .call_with_retry(&fields)
                .await
                .with_context(|| format!("part '{}'", part.id))?;

            done.parts.push(GeneratedPart {
                id: part.id.clone(),
                name: part.name.clone(),
                content: response.result_text(),
            });
        }

        Ok(done)
    }

    /// Rebuild a completed section from its cached `g-` content keys so
    /// resumed runs still feed it to later sections and to assembly.
    async fn restore_section(&self, section: &Section) -> Result<GeneratedSection> {
        let content = self
            .cache
            .get(&section.content_key())
            .await?
            .map(value_text)
            .unwrap_or_default();

        let mut parts = Vec::new();
        for part in &section.parts {
            let part_content = self
                .cache
                .get(&section.part_content_key(&part.id))
                .await?
                .map(value_text)
                .unwrap_or_default();
            parts.push(GeneratedPart {
                id: part.id.clone(),
                name: part.name.clone(),
                content: part_content,
            });
        }

        Ok(GeneratedSection {
            id: section.id.clone(),
            name: section.name.clone(),
            content,
            parts,
        })
    }

    async fn prompt_fields(
        &self,
        toc: &TableOfContents,
        earlier: &[GeneratedSection],
        part_name: &str,
        directive: &str,
        unit_instructions: Option<&str>,
    ) -> Result<HashMap<String, Value>> {
        let data = self.cache.load().await?;
        let mut context = PromptContext::from_cache(&data);

        context.set("toc", serde_json::to_value(toc)?);
        context.set_text(
            "previously_generated",
            &render_previously_generated(earlier),
        );
        context.set_text("part_name", part_name);

        let mut instructions = directive.to_string();
        if let Some(extra) = unit_instructions {
            instructions.push_str("\n\n");
            instructions.push_str(extra);
        }
        context.set_text("instructions", &instructions);

        Ok(context.into_fields())
    }

    async fn call_with_retry(&self, fields: &HashMap<String, Value>) -> Result<ExecuteResponse> {
        let outcome = self
            .policy
            .run(|| {
                let request = ExecuteRequest {
                    data: fields.clone(),
                    config: self.selectors.clone(),
                };
                self.engine.execute(&self.interaction, request)
            })
            .await;

        outcome.map_err(|e| {
            println!("{}", style(format!("Generation failed: {}", e)).red());
            if let Some(detail) = e.detail() {
                println!("{}", style(detail.to_string()).dim());
            }
            anyhow!("Failed to generate part: {}", e)
        })
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
