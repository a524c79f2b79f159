use serde_json::Value;
use std::collections::HashMap;

use crate::types::GeneratedSection;

/// Named prompt fields for one remote call.
///
/// Rebuilt fresh for every call from the cache's current contents, with the
/// bookkeeping keys (`section-*` done markers, `g-*` generated content)
/// stripped out so the model only sees real inputs. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    fields: HashMap<String, Value>,
}

impl PromptContext {
    pub fn from_cache(data: &HashMap<String, Value>) -> Self {
        let fields = data
            .iter()
            .filter(|(key, _)| !is_marker_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { fields }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn set_text(&mut self, key: &str, text: &str) {
        self.set(key, Value::String(text.to_string()));
    }

    pub fn into_fields(self) -> HashMap<String, Value> {
        self.fields
    }
}

fn is_marker_key(key: &str) -> bool {
    key.starts_with("section-") || key.starts_with("g-")
}

/// Memo of everything generated so far, in outline order. Later sections see
/// this so they can match the style and structure established by earlier ones.
pub fn render_previously_generated(sections: &[GeneratedSection]) -> String {
    sections
        .iter()
        .map(|s| s.rendered())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeneratedPart;
    use serde_json::json;

    #[test]
    fn test_from_cache_strips_bookkeeping_keys() {
        let mut data = HashMap::new();
        data.insert("serverApi".to_string(), json!("api source"));
        data.insert("toc".to_string(), json!({"sections": []}));
        data.insert("section-intro".to_string(), json!({"id": "intro"}));
        data.insert("g-intro".to_string(), json!("generated"));
        data.insert("g-auth-login".to_string(), json!("generated"));

        let fields = PromptContext::from_cache(&data).into_fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("serverApi"));
        assert!(fields.contains_key("toc"));
    }

    #[test]
    fn test_previously_generated_preserves_order() {
        let sections = vec![
            GeneratedSection {
                id: "a".to_string(),
                name: "A".to_string(),
                content: "first".to_string(),
                parts: vec![],
            },
            GeneratedSection {
                id: "b".to_string(),
                name: "B".to_string(),
                content: "second".to_string(),
                parts: vec![GeneratedPart {
                    id: "b1".to_string(),
                    name: "B1".to_string(),
                    content: "second-part".to_string(),
                }],
            },
        ];

        assert_eq!(
            render_previously_generated(&sections),
            "first\n\nsecond\n\nsecond-part"
        );
    }

    #[test]
    fn test_previously_generated_empty() {
        assert_eq!(render_previously_generated(&[]), "");
    }
}
