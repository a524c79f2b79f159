use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::assemble::{Assembler, MarkdownAssembler, OpenApiAssembler};
use crate::cache::ContextCache;
use crate::config::{FileConfig, RunConfig};
use crate::generate::{
    generate_toc, FileSummarizer, PromptContext, RetryPolicy, SectionWalker,
};
use crate::remote::{create_engine, Engine, EngineConfig, EngineSelectors};
use crate::types::TableOfContents;

static OUTLINE: Emoji<'_, '_> = Emoji("🗂️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "");
static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Md,
    Mdx,
    Openapi,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Generation server endpoint (or DOCWEAVE_SERVER_URL)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Bearer token for the generation server (or DOCWEAVE_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Environment id the server should execute against
    #[arg(long)]
    pub environment: Option<String>,

    /// Model id to generate with
    #[arg(long)]
    pub model: Option<String>,

    /// Named context; re-running with the same name resumes the run
    #[arg(long, default_value = "default")]
    pub context: String,

    /// Directory holding context cache files
    #[arg(long)]
    pub context_dir: Option<PathBuf>,

    /// Tagged input as KEY=PATH (file or directory), repeatable
    #[arg(long = "input", value_name = "KEY=PATH")]
    pub inputs: Vec<String>,

    /// Free-text instruction added to the outline and every section prompt
    #[arg(long)]
    pub instruction: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Md)]
    pub format: OutputFormat,

    /// Output content directory
    #[arg(long, default_value = "content")]
    pub out: PathBuf,

    /// Subdirectory under the content directory for this document
    #[arg(long, default_value = "docs")]
    pub prefix: String,

    /// Document title (OpenAPI info.title)
    #[arg(long, default_value = "API Documentation")]
    pub title: String,

    /// Document version (OpenAPI info.version)
    #[arg(long = "doc-version", default_value = "1.0.0")]
    pub doc_version: String,

    /// Summarize each input file through the remote service first
    #[arg(long)]
    pub summarize: bool,

    #[arg(long, short)]
    pub verbose: bool,
}

pub async fn run_generate(args: GenerateArgs) -> Result<()> {
    let file_config = FileConfig::load(Path::new("."))?;
    let run = RunConfig::resolve(
        &file_config,
        args.server_url.clone(),
        args.token.clone(),
        args.environment.clone(),
        args.model.clone(),
        args.context_dir.clone(),
    )?;

    let engine: Arc<dyn Engine> = Arc::from(create_engine(&EngineConfig {
        server_url: run.server_url.clone(),
        token: run.token.clone(),
    }));

    if args.verbose {
        println!("{}Checking generation server...", INFO);
    }
    engine.health_check().await?;

    let cache = Arc::new(ContextCache::new(&run.context_dir, &args.context));
    let selectors = EngineSelectors {
        environment: run.environment.clone(),
        model: run.model.clone(),
    };

    load_inputs(&args, &engine, &cache, &selectors).await?;

    if let Some(instruction) = &args.instruction {
        let mut partial = HashMap::new();
        partial.insert("instruction".to_string(), Value::String(instruction.clone()));
        cache.save(partial).await?;
    }

    let toc = resolve_toc(&args, engine.as_ref(), &cache, &selectors).await?;
    println!(
        "{}Outline ready: {} sections, {} units",
        OUTLINE,
        style(toc.sections.len()).cyan(),
        style(toc.unit_count()).cyan()
    );

    let interaction = match args.format {
        OutputFormat::Openapi => "openapi-fragment",
        _ => "doc-section",
    };
    let walker = SectionWalker::new(
        Arc::clone(&engine),
        Arc::clone(&cache),
        selectors,
        RetryPolicy::default(),
        interaction,
    );
    let (sections, report) = walker.generate_all(&toc).await?;

    let assembler = match args.format {
        OutputFormat::Md => Assembler::Markdown(MarkdownAssembler {
            content_dir: args.out.clone(),
            prefix: args.prefix.clone(),
            extension: "md".to_string(),
        }),
        OutputFormat::Mdx => Assembler::Markdown(MarkdownAssembler {
            content_dir: args.out.clone(),
            prefix: args.prefix.clone(),
            extension: "mdx".to_string(),
        }),
        OutputFormat::Openapi => Assembler::OpenApi(OpenApiAssembler {
            content_dir: args.out.clone(),
            title: args.title.clone(),
            version: args.doc_version.clone(),
            server_url: run.server_url.clone(),
        }),
    };
    let written = assembler.write(&toc, &sections)?;

    println!("\n{}Generation complete!\n", SUCCESS);
    println!(
        "  Sections generated: {}",
        style(report.sections_generated).green()
    );
    println!(
        "  Sections resumed:   {} (from cache)",
        style(report.sections_skipped).dim()
    );
    println!(
        "  Parts generated:    {}",
        style(report.parts_generated).cyan()
    );
    println!("  Files written:      {}", style(written.len()).cyan());
    if args.verbose {
        for path in &written {
            println!("    {}", style(path.display()).dim());
        }
    }

    Ok(())
}

/// Load every tagged input into the cache, either raw or as per-file
/// remote summaries aggregated under the input key.
async fn load_inputs(
    args: &GenerateArgs,
    engine: &Arc<dyn Engine>,
    cache: &Arc<ContextCache>,
    selectors: &EngineSelectors,
) -> Result<()> {
    for spec in &args.inputs {
        let (key, path) = parse_input_spec(spec)?;
        let files = read_input_files(&path)
            .with_context(|| format!("failed to load input '{}'", key))?;
        if files.is_empty() {
            bail!("input '{}' matched no files at {}", key, path.display());
        }

        let combined = if args.summarize {
            let summarizer = FileSummarizer::new(
                Arc::clone(engine),
                Arc::clone(cache),
                selectors.clone(),
            );
            let report = summarizer.summarize_all(&files).await?;
            if args.verbose {
                println!(
                    "{}Summarized {} files for '{}' ({} cached)",
                    INFO, report.summarized, key, report.skipped
                );
            }

            let data = cache.load().await?;
            let mut combined = String::new();
            for (rel, _) in &files {
                if let Some(summary) = data.get(rel) {
                    combined.push_str(&format!("# {}\n\n{}\n\n", rel, value_text(summary)));
                }
            }
            combined
        } else {
            let mut combined = String::new();
            for (rel, content) in &files {
                combined.push_str(&format!("# File: {}\n\n{}\n\n", rel, content));
            }
            combined
        };

        let mut partial = HashMap::new();
        partial.insert(key, Value::String(combined));
        cache.save(partial).await?;
    }

    Ok(())
}

/// Outline lookup with the cache guard: a resumed run never regenerates it.
async fn resolve_toc(
    args: &GenerateArgs,
    engine: &dyn Engine,
    cache: &ContextCache,
    selectors: &EngineSelectors,
) -> Result<TableOfContents> {
    if let Some(value) = cache.get("toc").await? {
        if args.verbose {
            println!("{}Reusing cached table of contents", INFO);
        }
        return serde_json::from_value(value).context("cached table of contents is invalid");
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Generating table of contents...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let data = cache.load().await?;
    let toc = generate_toc(
        engine,
        selectors,
        PromptContext::from_cache(&data),
        args.instruction.as_deref(),
    )
    .await;

    pb.finish_and_clear();
    let toc = toc?;

    let mut partial = HashMap::new();
    partial.insert("toc".to_string(), serde_json::to_value(&toc)?);
    cache.save(partial).await?;

    Ok(toc)
}

fn parse_input_spec(spec: &str) -> Result<(String, PathBuf)> {
    match spec.split_once('=') {
        Some((key, path)) if !key.is_empty() && !path.is_empty() => {
            Ok((key.to_string(), PathBuf::from(path)))
        }
        _ => bail!("invalid --input '{}', expected KEY=PATH", spec),
    }
}

/// A file input is read as-is; a directory is walked and every readable
/// file collected, keyed by its path relative to the directory.
fn read_input_files(path: &Path) -> Result<Vec<(String, String)>> {
    if path.is_file() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(vec![(path.display().to_string(), content)]);
    }

    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(path)
            .unwrap_or(entry.path())
            .display()
            .to_string();
        let content = fs::read_to_string(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        files.push((rel, content));
    }

    Ok(files)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_spec() {
        let (key, path) = parse_input_spec("serverApi=./api").unwrap();
        assert_eq!(key, "serverApi");
        assert_eq!(path, PathBuf::from("./api"));

        assert!(parse_input_spec("no-separator").is_err());
        assert!(parse_input_spec("=path").is_err());
        assert!(parse_input_spec("key=").is_err());
    }

    #[test]
    fn test_read_input_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.rs"), "fn b() {}").unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        fs::write(dir.path().join("sub/c.rs"), "fn c() {}").unwrap();

        let files = read_input_files(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a.rs", "b.rs", "sub/c.rs"]);
        assert_eq!(files[0].1, "fn a() {}");
    }

    #[test]
    fn test_read_input_files_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("api.md");
        fs::write(&file, "# API").unwrap();

        let files = read_input_files(&file).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, "# API");
    }

    #[test]
    fn test_missing_input_path_is_error() {
        let err = read_input_files(Path::new("/nonexistent/docweave-input")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
