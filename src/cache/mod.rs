use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// File-backed key-value cache for one named generation context.
///
/// All intermediate and final artifacts of a run live here: source inputs,
/// the table of contents, per-section done markers, and generated content.
/// The durable form is a single gzip-compressed JSON object at
/// `<context_dir>/<name>.json.gz`, rewritten in full on every save so a
/// killed run can always be resumed from the last completed unit.
pub struct ContextCache {
    path: PathBuf,
    mirror: RwLock<Option<HashMap<String, Value>>>,
}

impl ContextCache {
    pub fn new(context_dir: &Path, name: &str) -> Self {
        Self {
            path: context_dir.join(format!("{}.json.gz", name)),
            mirror: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full cache contents: the in-process mirror when populated, otherwise
    /// the durable state. A missing cache file is an empty mapping.
    pub async fn load(&self) -> Result<HashMap<String, Value>> {
        {
            let mirror = self.mirror.read().map_err(|e| anyhow::anyhow!("{}", e))?;
            if let Some(data) = mirror.as_ref() {
                return Ok(data.clone());
            }
        }

        let data = self.read_durable()?;

        let mut mirror = self.mirror.write().map_err(|e| anyhow::anyhow!("{}", e))?;
        *mirror = Some(data.clone());

        Ok(data)
    }

    /// Explicit presence lookup. Falsy values (empty string, 0, false) are
    /// cache hits; only a missing key is `None`.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let data = self.load().await?;
        Ok(data.get(key).cloned())
    }

    /// Merge `partial` into the cache and persist the merged whole.
    ///
    /// Merging always re-reads the durable state first rather than trusting
    /// the mirror, so interleaved read-modify-write call sites resolve to
    /// key-level last-write-wins. Every save rewrites the full compressed
    /// file; there is no append path.
    pub async fn save(&self, partial: HashMap<String, Value>) -> Result<()> {
        let mut merged = self.read_durable()?;
        merged.extend(partial);

        self.write_durable(&merged)?;

        let mut mirror = self.mirror.write().map_err(|e| anyhow::anyhow!("{}", e))?;
        *mirror = Some(merged);

        Ok(())
    }

    fn read_durable(&self) -> Result<HashMap<String, Value>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let compressed = fs::read(&self.path)
            .with_context(|| format!("failed to read context cache {}", self.path.display()))?;

        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .with_context(|| format!("corrupt context cache {}", self.path.display()))?;

        serde_json::from_slice(&raw)
            .with_context(|| format!("corrupt context cache {}", self.path.display()))
    }

    fn write_durable(&self, data: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_vec(data)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        let compressed = encoder.finish()?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, compressed)?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to write context cache {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContextCache::new(dir.path(), "fresh");

        let data = cache.load().await.unwrap();
        assert!(data.is_empty());
        assert!(cache.get("toc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_merges_at_key_level() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContextCache::new(dir.path(), "docs");

        cache.save(map(&[("a", json!(1))])).await.unwrap();
        cache.save(map(&[("b", json!(2))])).await.unwrap();

        let data = cache.load().await.unwrap();
        assert_eq!(data.get("a"), Some(&json!(1)));
        assert_eq!(data.get("b"), Some(&json!(2)));

        cache.save(map(&[("a", json!(3))])).await.unwrap();
        let data = cache.load().await.unwrap();
        assert_eq!(data.get("a"), Some(&json!(3)));
        assert_eq!(data.get("b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_round_trip_across_handles() {
        let dir = tempfile::tempdir().unwrap();

        let writer = ContextCache::new(dir.path(), "docs");
        writer
            .save(map(&[
                ("toc", json!({"sections": [{"id": "intro"}]})),
                ("section-intro", json!({"id": "intro", "name": "Intro"})),
                ("g-intro", json!("intro body")),
            ]))
            .await
            .unwrap();

        // Fresh handle simulates a restarted process.
        let reader = ContextCache::new(dir.path(), "docs");
        let data = reader.load().await.unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.get("g-intro"), Some(&json!("intro body")));
        assert_eq!(
            data.get("toc"),
            Some(&json!({"sections": [{"id": "intro"}]}))
        );
    }

    #[tokio::test]
    async fn test_falsy_values_are_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContextCache::new(dir.path(), "docs");

        cache
            .save(map(&[("empty", json!("")), ("zero", json!(0))]))
            .await
            .unwrap();

        assert_eq!(cache.get("empty").await.unwrap(), Some(json!("")));
        assert_eq!(cache.get("zero").await.unwrap(), Some(json!(0)));
        assert_eq!(cache.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merge_sees_durable_state_not_just_mirror() {
        let dir = tempfile::tempdir().unwrap();

        let a = ContextCache::new(dir.path(), "docs");
        let b = ContextCache::new(dir.path(), "docs");

        a.save(map(&[("from-a", json!(1))])).await.unwrap();
        // Handle b never loaded; its save must still merge against disk.
        b.save(map(&[("from-b", json!(2))])).await.unwrap();

        let fresh = ContextCache::new(dir.path(), "docs");
        let data = fresh.load().await.unwrap();
        assert_eq!(data.get("from-a"), Some(&json!(1)));
        assert_eq!(data.get("from-b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json.gz");
        fs::write(&path, b"not gzip at all").unwrap();

        let cache = ContextCache::new(dir.path(), "docs");
        let err = cache.load().await.unwrap_err();
        assert!(err.to_string().contains("corrupt context cache"));
    }
}
