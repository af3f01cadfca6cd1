//! Text splitters that turn documents into chunks.
//!
//! Sizes are measured in characters. Every chunk keeps its document's
//! metadata and gets the id `{document_id}_{index}`. The header splitters
//! add the enclosing headers as `Header 1`..`Header 6` metadata.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits a document into chunks with empty embeddings.
pub trait Chunker: Send + Sync {
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn to_chunks(document: &Document, pieces: Vec<String>) -> Vec<Chunk> {
    to_chunks_with_headers(document, pieces.into_iter().map(|piece| (piece, Vec::new())))
}

fn to_chunks_with_headers(
    document: &Document,
    pieces: impl IntoIterator<Item = (String, HeaderPath)>,
) -> Vec<Chunk> {
    pieces
        .into_iter()
        .filter(|(piece, _)| !piece.trim().is_empty())
        .enumerate()
        .map(|(index, (text, headers))| {
            let mut metadata = document.metadata.clone();
            for (level, title) in headers {
                metadata.insert(header_key(level), title);
            }
            Chunk {
                id: format!("{}_{index}", document.id),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// Enclosing headers of a section as `(level, title)`, outermost first.
type HeaderPath = Vec<(usize, String)>;

/// Metadata key for a header of `level`, e.g. `Header 2`.
pub fn header_key(level: usize) -> String {
    format!("Header {level}")
}

/// Makes `title` the innermost header at `level`, closing deeper ones.
fn enter_header(path: &mut HeaderPath, level: usize, title: String) {
    path.retain(|(open, _)| *open < level);
    path.push((level, title));
}

/// A header-delimited section.
struct Section {
    headers: HeaderPath,
    text: String,
}

/// Sections that fit are kept whole; larger ones are split recursively and
/// every piece inherits the section's headers.
fn section_pieces(
    sections: Vec<Section>,
    chunk_size: usize,
    fallback: &RecursiveChunker,
) -> Vec<(String, HeaderPath)> {
    sections
        .into_iter()
        .flat_map(|section| {
            let text = section.text.trim().to_string();
            let pieces =
                if char_len(&text) <= chunk_size { vec![text] } else { fallback.split_text(&text) };
            let headers = section.headers;
            pieces.into_iter().map(move |piece| (piece, headers.clone()))
        })
        .collect()
}

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::Config(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Fixed windows of `chunk_size` characters, each starting
/// `chunk_size - chunk_overlap` characters after the previous one.
fn char_windows(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - chunk_overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    windows
}

/// Greedily joins `splits` with `separator` into pieces of at most
/// `chunk_size`, carrying up to `chunk_overlap` characters of trailing
/// splits into the next piece.
fn merge_splits(splits: &[String], separator: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut merged = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for split in splits {
        let len = char_len(split);
        let joined_len = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

        if total + len + joined_len(&current) > chunk_size && !current.is_empty() {
            let text = current.iter().copied().collect::<Vec<_>>().join(separator);
            let text = text.trim();
            if !text.is_empty() {
                merged.push(text.to_string());
            }
            while total > chunk_overlap
                || (total + len + joined_len(&current) > chunk_size && total > 0)
            {
                let Some(front) = current.pop_front() else { break };
                total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
            }
        }

        total += len + joined_len(&current);
        current.push_back(split);
    }

    let text = current.iter().copied().collect::<Vec<_>>().join(separator);
    let text = text.trim();
    if !text.is_empty() {
        merged.push(text.to_string());
    }
    merged
}

/// Fixed-size character windows with overlap.
#[derive(Debug, Clone)]
pub struct CharacterChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl CharacterChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for CharacterChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        to_chunks(document, char_windows(&document.text, self.chunk_size, self.chunk_overlap))
    }
}

/// Splits on paragraph, line, word and finally character boundaries,
/// descending only into pieces that are still too large.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: ["\n\n", "\n", " ", ""].into_iter().map(String::from).collect(),
        })
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    fn split(&self, text: &str, separators: &[String]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep.as_str()))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).map(String::as_str).unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).map(String::from).collect()
        };

        let mut pieces = Vec::new();
        let mut small = Vec::new();
        for split in splits {
            if char_len(&split) <= self.chunk_size {
                small.push(split);
                continue;
            }
            if !small.is_empty() {
                pieces.extend(merge_splits(&small, separator, self.chunk_size, self.chunk_overlap));
                small.clear();
            }
            if remaining.is_empty() {
                pieces.push(split);
            } else {
                pieces.extend(self.split(&split, remaining));
            }
        }
        if !small.is_empty() {
            pieces.extend(merge_splits(&small, separator, self.chunk_size, self.chunk_overlap));
        }
        pieces
    }

    fn split_text(&self, text: &str) -> Vec<String> {
        self.split(text, &self.separators)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        to_chunks(document, self.split_text(&document.text))
    }
}

/// One chunk per markdown section, starting at each `#`..`######` header
/// outside fenced code blocks. Oversized sections are split recursively.
#[derive(Debug, Clone)]
pub struct MarkdownHeaderChunker {
    chunk_size: usize,
    fallback: RecursiveChunker,
}

impl MarkdownHeaderChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Ok(Self { chunk_size, fallback: RecursiveChunker::new(chunk_size, chunk_overlap)? })
    }

    /// Level and title of an ATX header line.
    fn header(line: &str) -> Option<(usize, String)> {
        let level = line.chars().take_while(|c| *c == '#').count();
        let rest = line.get(level..)?;
        if !(1..=6).contains(&level) || !rest.starts_with(' ') {
            return None;
        }
        let title = rest.trim().trim_end_matches('#').trim_end();
        Some((level, title.to_string()))
    }

    fn sections(text: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut headers = HeaderPath::new();
        let mut current = String::new();
        let mut in_fence = false;

        for line in text.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            }
            if let Some((level, title)) = Self::header(line).filter(|_| !in_fence) {
                if !current.trim().is_empty() {
                    sections.push(Section { headers: headers.clone(), text: std::mem::take(&mut current) });
                }
                current.clear();
                enter_header(&mut headers, level, title);
            }
            current.push_str(line);
            current.push('\n');
        }
        if !current.trim().is_empty() {
            sections.push(Section { headers, text: current });
        }
        sections
    }
}

impl Chunker for MarkdownHeaderChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces = section_pieces(Self::sections(&document.text), self.chunk_size, &self.fallback);
        to_chunks_with_headers(document, pieces)
    }
}

/// Splits HTML at `<h1>`..`<h6>` elements. Each section's body is converted
/// to markdown text; the headings themselves go to metadata only.
#[derive(Debug, Clone)]
pub struct HtmlHeaderChunker {
    chunk_size: usize,
    fallback: RecursiveChunker,
}

/// A heading element found in an HTML string, by byte offsets.
struct Heading {
    level: usize,
    start: usize,
    end: usize,
    inner: (usize, usize),
}

impl HtmlHeaderChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Ok(Self { chunk_size, fallback: RecursiveChunker::new(chunk_size, chunk_overlap)? })
    }

    /// Next heading at or after `from`. Offsets index the original string,
    /// since ASCII lowercasing keeps byte positions.
    fn next_heading(lower: &str, from: usize) -> Option<Heading> {
        let bytes = lower.as_bytes();
        let mut cursor = from;
        while let Some(found) = lower.get(cursor..)?.find("<h") {
            let start = cursor + found;
            let level =
                bytes.get(start + 2).copied().filter(|b| (b'1'..=b'6').contains(b)).map(|b| (b - b'0') as usize);
            let boundary = bytes.get(start + 3).is_some_and(|b| *b == b'>' || b.is_ascii_whitespace());
            if let (Some(level), true) = (level, boundary) {
                let open_end = start + lower[start..].find('>')? + 1;
                let close = format!("</h{level}");
                let close_start = open_end + lower[open_end..].find(&close)?;
                let end = close_start + lower[close_start..].find('>')? + 1;
                return Some(Heading { level, start, end, inner: (open_end, close_start) });
            }
            cursor = start + 2;
        }
        None
    }

    fn text_of(fragment: &str) -> String {
        html2md::parse_html(fragment).trim().to_string()
    }

    fn sections(html: &str) -> Vec<Section> {
        let lower = html.to_ascii_lowercase();
        let mut sections = Vec::new();
        let mut headers = HeaderPath::new();
        let mut cursor = 0;

        while let Some(heading) = Self::next_heading(&lower, cursor) {
            let body = Self::text_of(&html[cursor..heading.start]);
            if !body.is_empty() {
                sections.push(Section { headers: headers.clone(), text: body });
            }
            let title = Self::text_of(&html[heading.inner.0..heading.inner.1]);
            enter_header(&mut headers, heading.level, title);
            cursor = heading.end;
        }
        let body = Self::text_of(&html[cursor..]);
        if !body.is_empty() {
            sections.push(Section { headers, text: body });
        }
        sections
    }
}

impl Chunker for HtmlHeaderChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces = section_pieces(Self::sections(&document.text), self.chunk_size, &self.fallback);
        to_chunks_with_headers(document, pieces)
    }
}

/// Sentences merged up to `chunk_size`, overlapping by whole sentences.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Sentence ends are `.`, `!` or `?` followed by whitespace or the end.
    fn sentences(text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().is_none_or(|next| next.is_whitespace());
            if at_boundary {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
        }
        let rest = current.trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
        sentences
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let sentences: Vec<String> = Self::sentences(&document.text)
            .into_iter()
            .flat_map(|sentence| {
                if char_len(&sentence) <= self.chunk_size {
                    vec![sentence]
                } else {
                    char_windows(&sentence, self.chunk_size, self.chunk_overlap)
                }
            })
            .collect();
        to_chunks(document, merge_splits(&sentences, " ", self.chunk_size, self.chunk_overlap))
    }
}

/// Registered splitter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkerKind {
    Character,
    Recursive,
    MarkdownHeader,
    HtmlHeader,
    Sentence,
}

impl ChunkerKind {
    pub const ALL: [ChunkerKind; 5] = [
        ChunkerKind::Character,
        ChunkerKind::Recursive,
        ChunkerKind::MarkdownHeader,
        ChunkerKind::HtmlHeader,
        ChunkerKind::Sentence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Recursive => "recursive",
            Self::MarkdownHeader => "markdownheader",
            Self::HtmlHeader => "htmlheader",
            Self::Sentence => "sentence",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for ChunkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkerKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "markdown" => return Ok(Self::MarkdownHeader),
            "html" => return Ok(Self::HtmlHeader),
            "token" | "nltk" => return Ok(Self::Sentence),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| RagError::unsupported("Splitter", s, &Self::names()))
    }
}

/// Builds the splitter registered under `name`.
pub fn resolve_chunker(name: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Arc<dyn Chunker>> {
    let kind: ChunkerKind = name.parse()?;
    Ok(match kind {
        ChunkerKind::Character => Arc::new(CharacterChunker::new(chunk_size, chunk_overlap)?),
        ChunkerKind::Recursive => Arc::new(RecursiveChunker::new(chunk_size, chunk_overlap)?),
        ChunkerKind::MarkdownHeader => Arc::new(MarkdownHeaderChunker::new(chunk_size, chunk_overlap)?),
        ChunkerKind::HtmlHeader => Arc::new(HtmlHeaderChunker::new(chunk_size, chunk_overlap)?),
        ChunkerKind::Sentence => Arc::new(SentenceChunker::new(chunk_size, chunk_overlap)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text).with_id("doc").with_source("notes.md")
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn character_windows_overlap() {
        let chunker = CharacterChunker::new(4, 2).unwrap();
        let chunks = chunker.chunk(&doc("abcdefgh"));
        assert_eq!(texts(&chunks), vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn chunk_ids_and_metadata_follow_document() {
        let document = doc("one two three four five six").with_metadata("lang", "en");
        let chunks = CharacterChunker::new(10, 0).unwrap().chunk(&document);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("doc_{i}"));
            assert_eq!(chunk.document_id, "doc");
            assert_eq!(chunk.metadata, document.metadata);
            assert!(chunk.embedding.is_empty());
        }
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(40, 0).unwrap();
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = chunker.chunk(&doc(text));
        assert_eq!(texts(&chunks), vec!["First paragraph here.", "Second paragraph here.\n\nThird one."]);
    }

    #[test]
    fn recursive_descends_into_long_paragraphs() {
        let chunker = RecursiveChunker::new(10, 0).unwrap();
        let chunks = chunker.chunk(&doc("alpha beta gamma delta"));
        assert_eq!(texts(&chunks), vec!["alpha beta", "gamma", "delta"]);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
    }

    #[test]
    fn recursive_carries_overlap() {
        let chunker = RecursiveChunker::new(11, 5).unwrap();
        let chunks = chunker.chunk(&doc("aa bb cc dd ee"));
        assert_eq!(texts(&chunks), vec!["aa bb cc dd", "cc dd ee"]);
    }

    #[test]
    fn markdown_splits_at_headers_outside_fences() {
        let text = "intro\n# One\nbody one\n```\n# not a header\n```\n## Two\nbody two\n";
        let chunks = MarkdownHeaderChunker::new(200, 0).unwrap().chunk(&doc(text));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "intro");
        assert!(chunks[1].text.starts_with("# One"));
        assert!(chunks[1].text.contains("# not a header"));
        assert!(chunks[2].text.starts_with("## Two"));
    }

    #[test]
    fn markdown_sections_carry_their_header_path() {
        let text = "# Pets\nintro\n## Cats\npurr\n### Kittens\ntiny\n## Dogs\nbark\n";
        let chunks = MarkdownHeaderChunker::new(200, 0).unwrap().chunk(&doc(text));
        fn headers(chunk: &Chunk) -> Vec<Option<&str>> {
            (1..=3).map(|level| chunk.metadata.get(&header_key(level)).map(String::as_str)).collect::<Vec<_>>()
        }

        assert_eq!(chunks.len(), 4);
        assert_eq!(headers(&chunks[0]), vec![Some("Pets"), None, None]);
        assert_eq!(headers(&chunks[1]), vec![Some("Pets"), Some("Cats"), None]);
        assert_eq!(headers(&chunks[2]), vec![Some("Pets"), Some("Cats"), Some("Kittens")]);
        assert_eq!(headers(&chunks[3]), vec![Some("Pets"), Some("Dogs"), None]);
        assert!(chunks.iter().all(|c| c.metadata["source"] == "notes.md"));
    }

    #[test]
    fn oversized_sections_keep_headers_on_every_piece() {
        let text = "# Long\nalpha beta gamma delta epsilon zeta";
        let chunks = MarkdownHeaderChunker::new(12, 0).unwrap().chunk(&doc(text));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.metadata.get("Header 1").map(String::as_str) == Some("Long")));
    }

    #[test]
    fn html_splits_at_heading_elements() {
        let html = "<html><body><p>Preface</p><h1>Guide</h1><p>Welcome.</p>\
                    <H2 class=\"x\">Cats</H2><p>Cats purr.</p><h2>Dogs</h2><p>Dogs bark.</p>\
                    <hr><p>Dogs are loyal.</p></body></html>";
        let chunks = HtmlHeaderChunker::new(200, 0).unwrap().chunk(&doc(html));
        assert_eq!(chunks.len(), 4, "{:?}", texts(&chunks));
        assert_eq!(chunks[0].text, "Preface");
        assert!(!chunks[0].metadata.contains_key("Header 1"));
        assert_eq!(chunks[1].text, "Welcome.");
        assert_eq!(chunks[1].metadata["Header 1"], "Guide");
        assert_eq!(chunks[2].text, "Cats purr.");
        assert_eq!(chunks[2].metadata["Header 2"], "Cats");
        assert!(chunks[3].text.starts_with("Dogs bark."));
        assert!(chunks[3].text.contains("Dogs are loyal."));
        assert_eq!(chunks[3].metadata["Header 1"], "Guide");
        assert_eq!(chunks[3].metadata["Header 2"], "Dogs");
    }

    #[test]
    fn only_numbered_heading_tags_open_sections() {
        let html = "<header>site</header><hr><h7>no</h7><h3 id=\"a\">Title</h3>";
        let lower = html.to_ascii_lowercase();
        let heading = HtmlHeaderChunker::next_heading(&lower, 0).unwrap();
        assert_eq!(heading.level, 3);
        assert_eq!(&html[heading.inner.0..heading.inner.1], "Title");
        assert_eq!(heading.end, html.len());
        assert!(HtmlHeaderChunker::next_heading(&lower, heading.end).is_none());
    }

    #[test]
    fn html_without_headings_is_one_section() {
        let chunks = HtmlHeaderChunker::new(200, 0).unwrap().chunk(&doc("<p>Just <b>one</b> paragraph.</p>"));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("paragraph."));
        assert!(chunks[0].metadata.keys().all(|key| !key.starts_with("Header")));
    }

    #[test]
    fn sentences_merge_up_to_size() {
        let chunker = SentenceChunker::new(30, 0).unwrap();
        let chunks = chunker.chunk(&doc("Cats purr. Dogs bark loudly! Birds sing? Fish swim."));
        assert_eq!(texts(&chunks), vec!["Cats purr. Dogs bark loudly!", "Birds sing? Fish swim."]);
    }

    #[test]
    fn sentence_boundary_needs_whitespace() {
        assert_eq!(SentenceChunker::sentences("Version 1.2 is out. Yes"), vec!["Version 1.2 is out.", "Yes"]);
    }

    #[test]
    fn empty_document_has_no_chunks() {
        for name in ChunkerKind::names() {
            let chunker = resolve_chunker(name, 100, 10).unwrap();
            assert!(chunker.chunk(&doc("   \n ")).is_empty(), "{name}");
        }
    }

    #[test]
    fn registry_validates_names_and_sizes() {
        assert!(matches!(resolve_chunker("semantic", 100, 10), Err(RagError::UnsupportedProvider { .. })));
        assert!(matches!(resolve_chunker("recursive", 100, 100), Err(RagError::Config(_))));
        assert!(matches!(resolve_chunker("character", 0, 0), Err(RagError::Config(_))));
        assert!(resolve_chunker("MarkdownHeader", 100, 10).is_ok());
    }

    #[test]
    fn registry_accepts_legacy_names() {
        assert_eq!("token".parse::<ChunkerKind>().unwrap(), ChunkerKind::Sentence);
        assert_eq!("NLTK".parse::<ChunkerKind>().unwrap(), ChunkerKind::Sentence);
        assert_eq!("htmlheader".parse::<ChunkerKind>().unwrap(), ChunkerKind::HtmlHeader);
        assert_eq!("markdown".parse::<ChunkerKind>().unwrap(), ChunkerKind::MarkdownHeader);
        assert!(resolve_chunker("token", 100, 10).is_ok());
        let err = "semantic".parse::<ChunkerKind>().unwrap_err();
        assert!(err.to_string().contains("htmlheader"), "{err}");
    }
}
