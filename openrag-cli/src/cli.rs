use std::path::PathBuf;

use clap::{Parser, Subcommand};
use openrag_telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "openrag")]
#[command(about = "Index documents and query them with configurable retrieval strategies", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load files, directories or URLs and add them to the index
    Index {
        /// Files, directories or http(s) URLs
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Retrieve the passages most relevant to a query
    Query {
        /// Query text
        text: String,

        /// Retrieval strategy: naive, ranked, rephrase or llm
        #[arg(short, long, default_value = "ranked")]
        strategy: String,

        /// Metadata equality filter, repeatable
        #[arg(short, long, value_name = "FIELD=VALUE")]
        filter: Vec<String>,

        /// Number of passages to return, overriding the configuration
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// List the backends this build can resolve
    Providers,

    /// Print the effective configuration as TOML
    Config,
}
