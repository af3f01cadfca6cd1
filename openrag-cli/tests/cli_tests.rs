//! Runs CLI commands against an offline configuration.

use std::path::Path;

use clap::Parser;
use openrag_cli::{Cli, Commands, load_config, run};
use openrag_telemetry::LogFormat;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let store = dir.join("index");
    let config = format!(
        r#"
splitter = "recursive"
chunk_size = 200
chunk_overlap = 20

[embedding]
provider = "hashing"

[vector_store]
backend = "memory"
collection = "notes"
path = '{}'
"#,
        store.display()
    );
    let path = dir.join("openrag.toml");
    std::fs::write(&path, config).unwrap();
    path
}

async fn run_args(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    run(cli, &mut out).await?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn parses_query_options() {
    let cli = Cli::try_parse_from([
        "openrag", "query", "cats", "--strategy", "llm", "-f", "topic=pets", "-f", "lang=en", "-k", "3",
        "--log-format", "json",
    ])
    .unwrap();
    assert_eq!(cli.log_format, LogFormat::Json);
    match cli.command {
        Commands::Query { text, strategy, filter, top_k } => {
            assert_eq!(text, "cats");
            assert_eq!(strategy, "llm");
            assert_eq!(filter, vec!["topic=pets", "lang=en"]);
            assert_eq!(top_k, Some(3));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn index_requires_a_target() {
    assert!(Cli::try_parse_from(["openrag", "index"]).is_err());
}

#[test]
fn explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(Some(&write_config(dir.path()))).unwrap();
    assert_eq!(config.embedding.provider, "hashing");
    assert_eq!(config.vector_store.collection, "notes");
    assert_eq!(config.chunk_size, 200);

    assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
}

#[tokio::test]
async fn providers_lists_every_registry() {
    let output = run_args(&["openrag", "providers"]).await.unwrap();
    for name in [
        "huggingface",
        "hashing",
        "memory",
        "surrealdb",
        "qdrant",
        "markdownheader",
        "htmlheader",
        "term-overlap",
        "ollama",
        "rephrase",
    ] {
        assert!(output.contains(name), "missing {name} in:\n{output}");
    }
}

#[tokio::test]
async fn indexes_then_queries_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let config = config.to_str().unwrap();
    let corpus = dir.path().join("corpus");
    std::fs::create_dir(&corpus).unwrap();
    std::fs::write(corpus.join("cats.md"), "# Cats\n\ncats cats cats purr").unwrap();
    std::fs::write(corpus.join("dogs.txt"), "dogs bark loudly").unwrap();

    let output = run_args(&["openrag", "--config", config, "index", corpus.to_str().unwrap()])
        .await
        .unwrap();
    assert!(output.contains("Indexed 2 documents as 2 chunks into collection 'notes'"), "{output}");

    let output = run_args(&["openrag", "--config", config, "query", "cats purr", "-s", "naive", "-k", "1"])
        .await
        .unwrap();
    assert!(output.starts_with("[1] "), "{output}");
    assert!(output.contains("purr"), "{output}");

    let output = run_args(&["openrag", "--config", config, "query", "cats", "-f", "source=nowhere"])
        .await
        .unwrap();
    assert!(output.contains("No results."), "{output}");
}

#[tokio::test]
async fn bad_query_arguments_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let config = config.to_str().unwrap();

    let err = run_args(&["openrag", "--config", config, "query", "cats", "-s", "hybrid"]).await.unwrap_err();
    assert!(err.to_string().contains("naive, ranked, rephrase, llm"), "{err}");

    let err = run_args(&["openrag", "--config", config, "query", "cats", "-f", "no-equals"]).await.unwrap_err();
    assert!(err.to_string().contains("FIELD=VALUE"), "{err}");
}
