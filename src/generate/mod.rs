mod context;
mod retry;
mod summarize;
mod toc;
mod walker;

pub use context::{render_previously_generated, PromptContext};
pub use retry::RetryPolicy;
pub use summarize::{FileSummarizer, SummaryReport, SUMMARY_BATCH_SIZE};
pub use toc::generate_toc;
pub use walker::{SectionWalker, WalkReport};
