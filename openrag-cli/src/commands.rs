use std::io::Write;

use anyhow::{Context, Result, bail};
use openrag_model::LlmProvider;
use openrag_rag::{
    ChunkerKind, EmbeddingProviderKind, Filter, RagConfig, RagSystem,
    RerankerKind, RetrievalStrategy, VectorStoreKind,
};

use crate::cli::{Cli, Commands};
use crate::config::load_config;

/// Executes one command, writing its results to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { targets } => index(config, &targets, out).await,
        Commands::Query { text, strategy, filter, top_k } => {
            query(config, &text, &strategy, &filter, top_k, out).await
        }
        Commands::Providers => providers(out),
        Commands::Config => {
            write!(out, "{}", config.to_toml_string()?)?;
            Ok(())
        }
    }
}

async fn index(config: RagConfig, targets: &[String], out: &mut impl Write) -> Result<()> {
    if config.vector_store.backend == "memory" && config.vector_store.path.is_none() {
        tracing::warn!("vector_store.path is not set; the index will not outlive this process");
    }
    let system = RagSystem::from_config(config).await?;
    let loader = system.loader();

    let mut documents = Vec::new();
    for target in targets {
        let loaded =
            loader.load_any(target).await.with_context(|| format!("failed to load {target}"))?;
        tracing::info!(target = %target, documents = loaded.len(), "loaded");
        documents.extend(loaded);
    }

    let chunks = system.pipeline().ingest(&documents).await?;
    system.persist().await?;
    writeln!(
        out,
        "Indexed {} documents as {} chunks into collection '{}'",
        documents.len(),
        chunks.len(),
        system.pipeline().collection()
    )?;
    Ok(())
}

async fn query(
    mut config: RagConfig,
    text: &str,
    strategy: &str,
    filter: &[String],
    top_k: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let strategy: RetrievalStrategy = strategy.parse()?;
    let Some(filter) = Filter::parse_pairs(filter.iter().map(String::as_str)) else {
        bail!("filters must be written as FIELD=VALUE");
    };
    if let Some(k) = top_k {
        config.retrieval.top_k = k;
        config.retrieval.output_k = k;
        config.retrieval.search_k = config.retrieval.search_k.max(k);
    }

    let system = RagSystem::from_config(config).await?;
    let filter = (!filter.is_empty()).then_some(&filter);
    let passages = system.retriever().retrieve(strategy, text, filter).await?;

    if passages.is_empty() {
        writeln!(out, "No results.")?;
    }
    for (position, passage) in passages.iter().enumerate() {
        writeln!(out, "[{}] {}", position + 1, passage.trim())?;
        writeln!(out)?;
    }
    Ok(())
}

fn providers(out: &mut impl Write) -> Result<()> {
    writeln!(out, "Embedding providers:")?;
    for kind in EmbeddingProviderKind::ALL {
        writeln!(out, "  {:<12} default model: {}", kind.as_str(), kind.default_model())?;
    }
    writeln!(out, "Vector stores:       {}", VectorStoreKind::names().join(", "))?;
    writeln!(out, "Splitters:           {}", ChunkerKind::names().join(", "))?;
    writeln!(out, "Re-rankers:          {}", RerankerKind::names().join(", "))?;
    let llms: Vec<&str> = LlmProvider::ALL.iter().map(|provider| provider.as_str()).collect();
    writeln!(out, "Chat models:         {}", llms.join(", "))?;
    let strategies = RetrievalStrategy::ALL.map(|strategy| strategy.as_str());
    writeln!(out, "Strategies:          {}", strategies.join(", "))?;
    Ok(())
}
