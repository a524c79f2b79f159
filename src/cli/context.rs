use anyhow::Result;
use console::{style, Emoji};
use std::fs;
use std::path::PathBuf;

use crate::cache::ContextCache;
use crate::config::default_context_dir;

static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "");
static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "");

pub async fn run_context_status(context_dir: Option<PathBuf>, name: &str) -> Result<()> {
    let dir = context_dir.unwrap_or_else(default_context_dir);
    let cache = ContextCache::new(&dir, name);

    if !cache.path().exists() {
        println!("{}No context '{}' at {}", INFO, name, dir.display());
        println!("A context is created on the first `docweave generate --context {}`.", name);
        return Ok(());
    }

    let data = cache.load().await?;
    let sections_done = data.keys().filter(|k| k.starts_with("section-")).count();
    let units_generated = data.keys().filter(|k| k.starts_with("g-")).count();
    let has_toc = data.contains_key("toc");
    let size = fs::metadata(cache.path())?.len();

    println!("\n{}Context '{}': {}\n", INFO, name, cache.path().display());
    println!("  Keys:               {}", style(data.len()).cyan());
    println!(
        "  Table of contents:  {}",
        if has_toc {
            style("cached").green()
        } else {
            style("pending").yellow()
        }
    );
    println!("  Sections done:      {}", style(sections_done).green());
    println!("  Units generated:    {}", style(units_generated).cyan());
    println!("  Cache size:         {} KB", size / 1024);

    Ok(())
}

pub async fn run_context_clear(context_dir: Option<PathBuf>, name: &str) -> Result<()> {
    let dir = context_dir.unwrap_or_else(default_context_dir);
    let cache = ContextCache::new(&dir, name);

    if !cache.path().exists() {
        println!("{}No context '{}' to clear.", INFO, name);
        return Ok(());
    }

    fs::remove_file(cache.path())?;
    println!("{}Context '{}' cleared.", SUCCESS, name);

    Ok(())
}
