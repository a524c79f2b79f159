pub mod assemble;
pub mod cache;
pub mod cli;
pub mod config;
pub mod generate;
pub mod remote;
pub mod types;
