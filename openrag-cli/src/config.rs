use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use openrag_rag::RagConfig;

/// Read from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "openrag.toml";

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "OPENRAG_CONFIG";

/// Resolves the configuration file: the explicit path, then
/// `$OPENRAG_CONFIG`, then `./openrag.toml`. Without any of them the
/// defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<RagConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        });

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            RagConfig::from_file(&path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))
        }
        None => {
            tracing::debug!("no configuration file found, using defaults");
            Ok(RagConfig::default())
        }
    }
}
