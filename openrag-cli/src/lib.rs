//! # openrag-cli
//!
//! The `openrag` command: index documents, then query them.
//!
//! ```text
//! openrag --config openrag.toml index docs/ https://example.com/guide
//! openrag query "how do cats sleep?" --strategy rephrase --filter source=docs/cats.md
//! openrag providers
//! ```

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands};
pub use commands::run;
pub use config::load_config;
