mod context;
mod generate;

pub use context::{run_context_clear, run_context_status};
pub use generate::{run_generate, GenerateArgs, OutputFormat};
