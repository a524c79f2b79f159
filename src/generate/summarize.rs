use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::cache::ContextCache;
use crate::remote::{Engine, EngineSelectors, ExecuteRequest};

/// Independent per-file calls fan out this many at a time. Every call in a
/// batch is awaited before the next batch starts.
pub const SUMMARY_BATCH_SIZE: usize = 50;

const SUMMARY_DIRECTIVE: &str = "Summarize this source file for use as \
documentation input: purpose, public surface, and notable behavior. Be terse.";

/// Summarizes source files through the remote service, one summary per file,
/// cached under the file's relative path. Files are independent of each
/// other, so unlike the section walk this path runs batched in parallel.
pub struct FileSummarizer {
    engine: Arc<dyn Engine>,
    cache: Arc<ContextCache>,
    selectors: EngineSelectors,
}

#[derive(Debug, Default)]
pub struct SummaryReport {
    pub summarized: usize,
    pub skipped: usize,
}

impl FileSummarizer {
    pub fn new(
        engine: Arc<dyn Engine>,
        cache: Arc<ContextCache>,
        selectors: EngineSelectors,
    ) -> Self {
        Self {
            engine,
            cache,
            selectors,
        }
    }

    /// Summarize every file not already cached. `files` pairs a relative
    /// path (the cache key) with the file's content.
    pub async fn summarize_all(&self, files: &[(String, String)]) -> Result<SummaryReport> {
        let existing = self.cache.load().await?;
        let pending: Vec<&(String, String)> = files
            .iter()
            .filter(|(path, _)| !existing.contains_key(path))
            .collect();

        let mut report = SummaryReport {
            summarized: 0,
            skipped: files.len() - pending.len(),
        };

        for batch in pending.chunks(SUMMARY_BATCH_SIZE) {
            let mut tasks: JoinSet<Result<(String, Value)>> = JoinSet::new();

            for (path, content) in batch {
                let engine = Arc::clone(&self.engine);
                let selectors = self.selectors.clone();
                let path = path.clone();
                let content = content.clone();

                tasks.spawn(async move {
                    let mut data = HashMap::new();
                    data.insert("file_path".to_string(), json!(path));
                    data.insert("file_content".to_string(), json!(content));
                    data.insert("instructions".to_string(), json!(SUMMARY_DIRECTIVE));

                    let response = engine
                        .execute(
                            "file-summary",
                            ExecuteRequest {
                                data,
                                config: selectors,
                            },
                        )
                        .await
                        .map_err(|e| anyhow!("Failed to summarize {}: {}", path, e))?;

                    Ok((path, response.result))
                });
            }

            // Keys are path-unique, so one merged save per batch carries no
            // overlap risk.
            let mut partial = HashMap::new();
            while let Some(joined) = tasks.join_next().await {
                let (path, summary) = joined??;
                partial.insert(path, summary);
            }

            report.summarized += partial.len();
            self.cache.save(partial).await?;
        }

        Ok(report)
    }
}
