use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hierarchical outline driving generation and assembly order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableOfContents {
    pub sections: Vec<Section>,
}

/// One top-level unit of the outline. `id` is unique within the document and
/// doubles as the cache key suffix and the output directory name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Extra generation guidance for this section only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// For OpenAPI runs: the operation this section documents (e.g. "GET /users").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Part>,
}

/// A sub-unit of a section. `id` is unique within its section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<GeneratedPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPart {
    pub id: String,
    pub name: String,
    pub content: String,
}

impl TableOfContents {
    /// Total generation units (sections plus their parts).
    pub fn unit_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| 1 + s.parts.len())
            .sum()
    }
}

impl Section {
    /// Cache key marking this section as fully generated.
    pub fn done_key(&self) -> String {
        format!("section-{}", self.id)
    }

    /// Cache key holding this section's generated content.
    pub fn content_key(&self) -> String {
        format!("g-{}", self.id)
    }

    pub fn part_content_key(&self, part_id: &str) -> String {
        format!("g-{}-{}", self.id, part_id)
    }
}

impl GeneratedSection {
    /// Section content followed by part content, blank-line separated.
    pub fn rendered(&self) -> String {
        let mut out = self.content.clone();
        for part in &self.parts {
            out.push_str("\n\n");
            out.push_str(&part.content);
        }
        out
    }
}
