mod markdown;
mod openapi;

pub use markdown::MarkdownAssembler;
pub use openapi::OpenApiAssembler;

use anyhow::Result;
use std::path::PathBuf;

use crate::types::{GeneratedSection, TableOfContents};

/// Output strategy selected by run mode: narrative pages or a single
/// structured OpenAPI document.
pub enum Assembler {
    Markdown(MarkdownAssembler),
    OpenApi(OpenApiAssembler),
}

impl Assembler {
    /// Write the assembled output, returning the files produced.
    pub fn write(
        &self,
        toc: &TableOfContents,
        sections: &[GeneratedSection],
    ) -> Result<Vec<PathBuf>> {
        match self {
            Assembler::Markdown(a) => a.write(toc, sections),
            Assembler::OpenApi(a) => a.write(toc, sections),
        }
    }
}
