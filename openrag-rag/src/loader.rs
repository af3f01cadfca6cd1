//! Loading documents from files, directories and URLs.
//!
//! | Extension       | Output                                                   |
//! |-----------------|----------------------------------------------------------|
//! | `.txt`, `.md`   | one document                                             |
//! | `.csv`          | one document per row of `column: value` lines            |
//! | `.json`         | one document, pretty-printed                             |
//! | `.html`, `.htm` | one document, converted to markdown                      |
//! | `.pdf`          | one document per page                                    |
//! | `.docx`         | one document per page, split at page breaks              |
//! | `.pptx`         | one document per slide                                   |
//!
//! Every document carries the path (or URL) under the `source` metadata key.
//! Paged formats add the 1-based `page` number; pages without text are skipped.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::pages;

pub const SUPPORTED_EXTENSIONS: [&str; 9] =
    ["txt", "md", "csv", "json", "html", "htm", "pdf", "docx", "pptx"];

/// Metadata key holding a CSV row's zero-based index.
pub const ROW_KEY: &str = "row";

/// Metadata key holding the 1-based page or slide number.
pub const PAGE_KEY: &str = "page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Csv,
    Json,
    Html,
    Pdf,
    Docx,
    Pptx,
}

impl Format {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "md" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

}

fn extension_of(path: &Path) -> String {
    path.extension().map(|ext| ext.to_string_lossy().to_string()).unwrap_or_default()
}

fn loader_err(source_name: impl Into<String>, message: impl Into<String>) -> RagError {
    RagError::LoaderError { source_name: source_name.into(), message: message.into() }
}

/// Parses RFC 4180 CSV: quoted fields may hold commas, newlines and `""`.
fn parse_csv(input: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows.retain(|row| !(row.len() == 1 && row[0].trim().is_empty()));
    Ok(rows)
}

/// Reads documents from local files and web pages.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    client: reqwest::Client,
    keep_html: bool,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, keep_html: false }
    }

    /// Keeps HTML markup instead of converting it to markdown, for
    /// splitters that read heading elements.
    #[must_use]
    pub fn keep_html(mut self, keep: bool) -> Self {
        self.keep_html = keep;
        self
    }

    fn html_text(&self, html: String) -> String {
        if self.keep_html { html } else { html2md::parse_html(&html) }
    }

    pub fn is_supported(path: &Path) -> bool {
        Format::from_extension(&extension_of(path)).is_some()
    }

    /// Loads one file, choosing the parser by extension.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Document>> {
        let path = path.as_ref();
        let source = path.to_string_lossy().to_string();
        let extension = extension_of(path);
        let format = Format::from_extension(&extension).ok_or_else(|| RagError::UnsupportedFormat {
            path: source.clone(),
            extension: extension.clone(),
            supported: SUPPORTED_EXTENSIONS.join(", "),
        })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| loader_err(&source, e.to_string()))?;
        let text = |bytes: Vec<u8>| {
            String::from_utf8(bytes).map_err(|e| loader_err(&source, format!("not UTF-8 text: {e}")))
        };

        let documents = match format {
            Format::Pdf | Format::Docx | Format::Pptx => Self::paged_documents(format, bytes, &source).await?,
            Format::Text => vec![Document::new(text(bytes)?).with_id(&source).with_source(&source)],
            Format::Html => {
                vec![Document::new(self.html_text(text(bytes)?)).with_id(&source).with_source(&source)]
            }
            Format::Json => {
                let value: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| loader_err(&source, format!("invalid JSON: {e}")))?;
                let text = serde_json::to_string_pretty(&value)?;
                vec![Document::new(text).with_id(&source).with_source(&source)]
            }
            Format::Csv => Self::csv_documents(&text(bytes)?, &source)?,
        };

        debug!(source = %source, count = documents.len(), "loaded documents");
        Ok(documents)
    }

    /// Parses on the blocking pool; PDF and zip decoding are CPU-bound.
    async fn paged_documents(format: Format, bytes: Vec<u8>, source: &str) -> Result<Vec<Document>> {
        let pages = tokio::task::spawn_blocking(move || match format {
            Format::Pdf => pages::pdf_pages(&bytes),
            Format::Docx => pages::docx_pages(&bytes),
            Format::Pptx => pages::pptx_slides(&bytes),
            other => Err(format!("{other:?} files have no pages")),
        })
        .await
        .map_err(|e| loader_err(source, e.to_string()))?
        .map_err(|e| loader_err(source, e))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .map(|(index, text)| {
                let page = index + 1;
                Document::new(text)
                    .with_id(format!("{source}#page-{page}"))
                    .with_source(source)
                    .with_metadata(PAGE_KEY, page.to_string())
            })
            .collect())
    }

    fn csv_documents(raw: &str, source: &str) -> Result<Vec<Document>> {
        let mut rows = parse_csv(raw).map_err(|e| loader_err(source, e))?.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        let header: Vec<String> = header.into_iter().map(|column| column.trim().to_string()).collect();

        Ok(rows
            .enumerate()
            .map(|(index, row)| {
                let text = header
                    .iter()
                    .zip(row.iter().map(String::as_str).chain(std::iter::repeat("")))
                    .map(|(column, value)| format!("{column}: {}", value.trim()))
                    .collect::<Vec<_>>()
                    .join("\n");
                Document::new(text)
                    .with_id(format!("{source}#{index}"))
                    .with_source(source)
                    .with_metadata(ROW_KEY, index.to_string())
            })
            .collect())
    }

    /// Fetches a web page. HTML bodies are converted to markdown; anything
    /// else is kept as text.
    pub async fn load_url(&self, url: &str) -> Result<Vec<Document>> {
        let response = self.client.get(url).send().await.map_err(|e| loader_err(url, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(loader_err(url, format!("HTTP {status}")));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("html"));
        let body = response.text().await.map_err(|e| loader_err(url, e.to_string()))?;
        let looks_html = body.trim_start().starts_with('<');
        let text = if is_html || looks_html { self.html_text(body) } else { body };

        debug!(url, "loaded web page");
        Ok(vec![Document::new(text).with_id(url).with_source(url)])
    }

    /// Loads every supported file directly inside `dir`, in path order.
    /// Unsupported files are skipped.
    pub async fn load_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<Document>> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| loader_err(dir.to_string_lossy(), e.to_string()))?;

        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && Self::is_supported(&path) {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "skipping unsupported entry");
            }
        }
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            documents.extend(self.load(&path).await?);
        }
        Ok(documents)
    }

    /// Loads `target` as a URL, directory or file.
    pub async fn load_any(&self, target: &str) -> Result<Vec<Document>> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return self.load_url(target).await;
        }
        let path = Path::new(target);
        if tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
            self.load_dir(path).await
        } else {
            self.load(path).await
        }
    }
}
