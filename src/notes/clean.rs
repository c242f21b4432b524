use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static HSPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());

const TRIM_CHARS: &[char] = &[' ', '-', '•', '\t'];

fn strip_noise(text: &str) -> String {
    let t = CODE_FENCE_RE.replace_all(text, " ");
    let t = INLINE_CODE_RE.replace_all(&t, " ");
    URL_RE.replace_all(&t, " ").into_owned()
}

/// Remove code, inline code and URLs, then collapse every whitespace run
/// (newlines included) to one space.
pub fn clean_text(text: &str) -> String {
    let stripped = strip_noise(text);
    WS_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Same stripping as [`clean_text`] but line structure survives: only
/// horizontal whitespace is collapsed and each line is trimmed.
pub fn clean_lines(text: &str) -> String {
    let stripped = strip_noise(&text.replace("\r\n", "\n").replace('\r', "\n"));
    stripped
        .lines()
        .map(|l| HSPACE_RE.replace_all(l, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sentence case plus terminal punctuation. Empty after trimming -> "".
pub fn normalize_sentence(s: &str) -> String {
    let s = s.trim_matches(TRIM_CHARS);
    if s.is_empty() {
        return String::new();
    }

    let mut chars = s.chars();
    let mut out = String::with_capacity(s.len() + 1);
    if let Some(first) = chars.next() {
        if first.is_lowercase() {
            out.extend(first.to_uppercase());
        } else {
            out.push(first);
        }
    }
    out.push_str(chars.as_str());

    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

/// Python-style `str.capitalize`: first char upper, rest lower.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Python-style `str.title`: upper after any non-letter, lower otherwise.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}
