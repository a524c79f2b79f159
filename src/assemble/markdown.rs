use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{GeneratedSection, TableOfContents};

/// Writes the narrative output tree:
///
/// ```text
/// <content_dir>/<prefix>/toc.json
/// <content_dir>/<prefix>/backup/<timestamp>-<id>.json
/// <content_dir>/<prefix>/<sectionId>/page.<ext>
/// ```
pub struct MarkdownAssembler {
    pub content_dir: PathBuf,
    pub prefix: String,
    /// Page file extension, typically "md" or "mdx".
    pub extension: String,
}

impl MarkdownAssembler {
    /// Full-document view: section content then part content, blank-line
    /// separated, in outline order.
    pub fn render(sections: &[GeneratedSection]) -> String {
        sections
            .iter()
            .map(|s| s.rendered())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn write(
        &self,
        toc: &TableOfContents,
        sections: &[GeneratedSection],
    ) -> Result<Vec<PathBuf>> {
        let root = self.content_dir.join(&self.prefix);
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create {}", root.display()))?;

        let mut written = Vec::new();

        let toc_path = root.join("toc.json");
        fs::write(&toc_path, serde_json::to_vec_pretty(toc)?)?;
        written.push(toc_path);

        for section in sections {
            self.backup(&root, section)?;

            let dir = root.join(&section.id);
            fs::create_dir_all(&dir)?;

            let page_path = dir.join(format!("page.{}", self.extension));
            fs::write(&page_path, self.render_page(section))?;
            written.push(page_path);
        }

        Ok(written)
    }

    fn render_page(&self, section: &GeneratedSection) -> String {
        format!(
            "---\ntitle: {}\nid: {}\n---\n\n{}\n",
            section.name,
            section.id,
            section.rendered()
        )
    }

    /// Snapshot the generated unit before the assembled view is overwritten.
    fn backup(&self, root: &Path, section: &GeneratedSection) -> Result<PathBuf> {
        let backup_dir = root.join("backup");
        fs::create_dir_all(&backup_dir)?;

        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let path = backup_dir.join(format!("{}-{}.json", stamp, section.id));
        fs::write(&path, serde_json::to_vec_pretty(section)?)?;

        Ok(path)
    }
}
