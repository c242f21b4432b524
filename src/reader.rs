use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use regex::Regex;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::models::Document;

// ![alt](url), including the inner part of [![alt](url)](link)
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static SLIDE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Markdown,
    Pdf,
    Pptx,
    Text,
}

fn format_of(path: &Path) -> Format {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "md" | "markdown" => Format::Markdown,
        "pdf" => Format::Pdf,
        "pptx" => Format::Pptx,
        _ => Format::Text,
    }
}

/// Remove Markdown image syntax and squeeze the blank runs it leaves behind.
pub fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANK_RUN_RE.replace_all(&cleaned, "\n\n").into_owned()
}

/// Page texts separated by blank lines. Empty pages are dropped; a page
/// lopdf cannot decode is skipped.
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).context("parsing PDF")?;
    let mut pages = Vec::new();
    for number in doc.get_pages().into_keys() {
        match doc.extract_text(&[number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => debug!(page = number, error = %e, "skipping undecodable PDF page"),
        }
    }
    Ok(pages.join("\n\n"))
}

/// One `# Slide N` section per slide with text, one line per paragraph.
/// Slides are numbered by position, so empty slides still take a number.
pub fn pptx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("opening PPTX archive")?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n = SLIDE_PATH_RE.captures(name)?[1].parse().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut sections = Vec::new();
    for (i, (_, name)) in slides.iter().enumerate() {
        let mut xml = String::new();
        archive
            .by_name(name)?
            .read_to_string(&mut xml)
            .with_context(|| format!("reading {name}"))?;
        let paragraphs = slide_paragraphs(&xml).with_context(|| format!("parsing {name}"))?;
        if !paragraphs.is_empty() {
            sections.push(format!("# Slide {}\n{}", i + 1, paragraphs.join("\n")));
        }
    }
    Ok(sections.join("\n\n"))
}

/// Text runs of a slide, one entry per non-blank `<a:p>` paragraph.
fn slide_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => in_text = true,
            Ok(Event::Empty(e)) if e.name().as_ref() == b"a:br" => current.push(' '),
            Ok(Event::Text(e)) if in_text => current.push_str(&e.unescape()?),
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    let para = current.trim();
                    if !para.is_empty() {
                        paragraphs.push(para.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}

fn extract(path: &Path, format: Format) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match format {
        Format::Markdown => Ok(strip_images(&String::from_utf8_lossy(&bytes))),
        Format::Text => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Format::Pdf => pdf_text(&bytes),
        Format::Pptx => pptx_text(&bytes),
    }
}

/// Read every path into a `Document` named by its basename. A file that
/// cannot be read or extracted, or comes out blank, is skipped; the batch
/// never fails.
pub fn read_docs<P: AsRef<Path>>(paths: &[P]) -> Vec<Document> {
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let text = match extract(path, format_of(path)) {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %name, error = %format!("{e:#}"), "skipping unreadable file");
                continue;
            }
        };
        if text.trim().is_empty() {
            debug!(file = %name, "skipping blank file");
            continue;
        }
        docs.push(Document::new(name, text));
    }
    docs
}

/// One topic per non-blank line, list markers stripped.
pub fn parse_syllabus(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim_matches(|c: char| c == '-' || c == '*' || c.is_whitespace()))
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
