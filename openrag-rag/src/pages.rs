//! Page-wise text extraction from PDF, Word and PowerPoint files.
//!
//! Every function returns one string per page (or slide), in reading order.
//! Pages without text come back as empty strings so numbering stays aligned
//! with the source file.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

type ExtractResult<T> = std::result::Result<T, String>;

/// Text of each PDF page, ordered by page number.
pub(crate) fn pdf_pages(bytes: &[u8]) -> ExtractResult<Vec<String>> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| format!("invalid PDF: {e}"))?;
    // BTreeMap keys are page numbers, already sorted.
    let numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    numbers
        .into_iter()
        .map(|number| {
            document
                .extract_text(&[number])
                .map(|text| text.trim().to_string())
                .map_err(|e| format!("page {number}: {e}"))
        })
        .collect()
}

/// Text of a `.docx`, split at explicit and rendered page breaks.
pub(crate) fn docx_pages(bytes: &[u8]) -> ExtractResult<Vec<String>> {
    let mut archive = open_archive(bytes)?;
    let xml = read_entry(&mut archive, "word/document.xml")?;
    let pages = OfficeXml { text: b"w:t", paragraph: b"w:p" }.pages(&xml)?;
    Ok(pages.into_iter().map(|page| page.trim().to_string()).collect())
}

/// Text of each slide of a `.pptx`, ordered by slide number.
pub(crate) fn pptx_slides(bytes: &[u8]) -> ExtractResult<Vec<String>> {
    let mut archive = open_archive(bytes)?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?.parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();

    let reader = OfficeXml { text: b"a:t", paragraph: b"a:p" };
    slides
        .into_iter()
        .map(|(_, name)| {
            let xml = read_entry(&mut archive, &name)?;
            Ok(reader.pages(&xml)?.join("\n").trim().to_string())
        })
        .collect()
}

fn open_archive(bytes: &[u8]) -> ExtractResult<zip::ZipArchive<Cursor<&[u8]>>> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not an Office Open XML archive: {e}"))
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> ExtractResult<String> {
    let mut entry = archive.by_name(name).map_err(|e| format!("{name}: {e}"))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| format!("{name}: {e}"))?;
    Ok(xml)
}

/// Element names of one Office Open XML dialect.
struct OfficeXml {
    text: &'static [u8],
    paragraph: &'static [u8],
}

impl OfficeXml {
    fn is_page_break(element: &BytesStart<'_>) -> bool {
        match element.name().as_ref() {
            b"w:lastRenderedPageBreak" => true,
            b"w:br" => matches!(
                element.try_get_attribute("w:type"),
                Ok(Some(attribute)) if attribute.value.as_ref() == b"page"
            ),
            _ => false,
        }
    }

    fn pages(&self, xml: &str) -> ExtractResult<Vec<String>> {
        let mut reader = Reader::from_str(xml);
        let mut pages = vec![String::new()];
        let mut in_text = false;

        loop {
            let event = reader.read_event().map_err(|e| format!("malformed XML: {e}"))?;
            let page = pages.last_mut().ok_or("no open page")?;
            match event {
                Event::Start(element) if element.name().as_ref() == self.text => in_text = true,
                Event::End(element) if element.name().as_ref() == self.text => in_text = false,
                Event::End(element) if element.name().as_ref() == self.paragraph => page.push('\n'),
                Event::Text(text) if in_text => {
                    page.push_str(&text.unescape().map_err(|e| format!("malformed XML text: {e}"))?);
                }
                Event::Empty(element) => {
                    if Self::is_page_break(&element) {
                        if !page.trim().is_empty() {
                            pages.push(String::new());
                        }
                        continue;
                    }
                    match element.name().as_ref() {
                        b"w:tab" => page.push('\t'),
                        b"w:br" | b"w:cr" | b"a:br" => page.push('\n'),
                        name if name == self.paragraph => page.push('\n'),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD: OfficeXml = OfficeXml { text: b"w:t", paragraph: b"w:p" };

    #[test]
    fn word_paragraphs_tabs_and_entities() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Cats &amp; dogs</w:t><w:tab/><w:t xml:space="preserve"> live here</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let pages = WORD.pages(xml).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].trim(), "Cats & dogs\t live here\nSecond");
    }

    #[test]
    fn page_breaks_start_new_pages() {
        let xml = r#"<w:body>
            <w:p><w:r><w:t>one</w:t><w:br w:type="page"/><w:t>two</w:t></w:r></w:p>
            <w:p><w:r><w:lastRenderedPageBreak/><w:t>three</w:t><w:br/><w:t>still three</w:t></w:r></w:p>
        </w:body>"#;
        let pages: Vec<String> = WORD.pages(xml).unwrap().iter().map(|p| p.trim().to_string()).collect();
        assert_eq!(pages, vec!["one", "two", "three\nstill three"]);
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let xml = "<w:body><w:p><w:instrText>PAGE</w:instrText><w:t>kept</w:t></w:p></w:body>";
        assert_eq!(WORD.pages(xml).unwrap()[0].trim(), "kept");
    }

    #[test]
    fn non_archives_are_rejected() {
        assert!(docx_pages(b"plain text").is_err());
        assert!(pptx_slides(b"").is_err());
        assert!(pdf_pages(b"%PDF-garbage").is_err());
    }
}
