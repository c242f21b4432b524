use std::sync::LazyLock;

use regex::Regex;

// bullets: -, *, •, +, or 1. / 1) / (1)
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•+]\s+|\(?\d{1,3}[.)]\s+)").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,2}\s+(.+)$").unwrap());
// H3-H6 keep their text as paragraph content
static SUBHEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{3,6}\s+(.+)$").unwrap());

const STOPLINES: &[&str] = &["table of contents", "toc", "agenda", "references", "bibliography"];

const MIN_SENTENCE_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    /// Stoplisted navigation line ("References", "Agenda", ...).
    Stop,
    Heading(String),
    Bullet(String),
    Text(String),
}

pub fn classify_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if is_stopline(line) {
        return Line::Stop;
    }
    if let Some(caps) = HEADING_RE.captures(line) {
        let text = caps[1].trim();
        if is_stopline(text) {
            return Line::Stop;
        }
        return Line::Heading(text.to_string());
    }
    if let Some(caps) = SUBHEADING_RE.captures(line) {
        let text = caps[1].trim();
        if is_stopline(text) {
            return Line::Stop;
        }
        return Line::Text(text.to_string());
    }
    if BULLET_RE.is_match(line) {
        let rest = BULLET_RE.replace(line, "");
        return Line::Bullet(rest.trim().to_string());
    }
    Line::Text(line.to_string())
}

pub fn classify_lines(text: &str) -> Vec<Line> {
    text.lines().map(classify_line).collect()
}

fn is_stopline(line: &str) -> bool {
    let lower = line.to_lowercase();
    STOPLINES.contains(&lower.as_str())
}

/// Break cleaned text into raw candidate points. Bullets are taken whole;
/// contiguous text lines accumulate into a paragraph that is sentence-split
/// on flush. Headings and stoplines only terminate the paragraph.
pub fn extract_raw_points(text: &str) -> Vec<String> {
    let mut points = Vec::new();
    let mut buf: Vec<String> = Vec::new();

    for line in classify_lines(text) {
        match line {
            Line::Text(t) => buf.push(t),
            Line::Bullet(rest) => {
                flush_paragraph(&mut buf, &mut points);
                if !rest.is_empty() {
                    points.push(rest);
                }
            }
            Line::Blank | Line::Stop | Line::Heading(_) => flush_paragraph(&mut buf, &mut points),
        }
    }
    flush_paragraph(&mut buf, &mut points);

    points
}

fn flush_paragraph(buf: &mut Vec<String>, points: &mut Vec<String>) {
    if buf.is_empty() {
        return;
    }
    let para = buf.join(" ");
    buf.clear();
    for sent in split_sentences(para.trim()) {
        if sent.chars().count() >= MIN_SENTENCE_CHARS {
            points.push(sent.to_string());
        }
    }
}

/// Split where whitespace follows `.`, `!` or `?` and the next sentence
/// opens with an ASCII capital, a digit or `(`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    split_at_boundaries(text, |c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '(')
}

/// Split wherever whitespace follows `.`, `!` or `?`.
pub fn split_sentences_loose(text: &str) -> Vec<&str> {
    split_at_boundaries(text, |_| true)
}

fn split_at_boundaries(text: &str, opens_sentence: impl Fn(char) -> bool) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (_, c) = chars[i];
        if matches!(c, '.' | '!' | '?') && i + 1 < chars.len() && chars[i + 1].1.is_whitespace() {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            if j < chars.len() && opens_sentence(chars[j].1) {
                out.push(&text[start..chars[i + 1].0]);
                start = chars[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    out.push(&text[start..]);

    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
