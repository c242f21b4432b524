use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::clean::title_case;
use super::tfidf::{TfidfModel, TfidfOptions};

// H1 / H2 only, which includes the "# Slide N" sections the PPTX reader emits
static H1_H2_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(#{1,2})\s+(.+)$").unwrap());
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

const STOP_HEADINGS: &[&str] = &[
    "introduction",
    "summary",
    "references",
    "overview",
    "table of contents",
    "toc",
    "agenda",
];

const MAX_VOCABULARY: usize = 2000;

pub const DEFAULT_TOPIC: &str = "Session Overview";

fn is_stop_heading(s: &str) -> bool {
    STOP_HEADINGS.contains(&s.to_lowercase().as_str())
}

pub fn headings<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    let mut out = Vec::new();
    for text in texts {
        for caps in H1_H2_RE.captures_iter(text.as_ref()) {
            let title = NON_WORD_RE.replace_all(&caps[2], "");
            let title = title.trim();
            if !title.is_empty() && !is_stop_heading(title) {
                out.push(title.to_string());
            }
        }
    }
    out
}

/// Ranked topic labels: document headings first, then salient bigrams when
/// the headings alone are too few. Never more than `cap`, never two labels
/// equal ignoring case.
pub fn extract_topics<S: AsRef<str>>(texts: &[S], cap: usize) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    if cap == 0 {
        return topics;
    }

    for h in headings(texts) {
        if seen.insert(h.to_lowercase()) {
            topics.push(h);
        }
        if topics.len() >= cap {
            return topics;
        }
    }

    if topics.len() < (cap / 2).max(3) {
        supplement_with_bigrams(texts, cap, &mut topics, &mut seen);
    }

    topics.truncate(cap);
    topics
}

fn supplement_with_bigrams<S: AsRef<str>>(
    texts: &[S],
    cap: usize,
    topics: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    let opts = TfidfOptions {
        max_ngram: 2,
        stop_words: true,
        max_features: Some(MAX_VOCABULARY),
    };
    let model = TfidfModel::fit_transform(texts, &opts);
    if model.vocabulary().is_empty() {
        return;
    }

    let mut ranked: Vec<(f64, &str)> = model
        .mean_weights()
        .into_iter()
        .zip(model.vocabulary().iter().map(String::as_str))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));

    // words already claimed by a topic; a bigram reusing one adds nothing new
    let mut claimed: HashSet<String> = topics
        .iter()
        .flat_map(|t| t.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>())
        .collect();

    for (_, term) in ranked {
        if topics.len() >= cap {
            break;
        }
        if term.matches(' ').count() != 1 || is_stop_heading(term) || seen.contains(term) {
            continue;
        }
        if term.split(' ').any(|w| claimed.contains(w)) {
            continue;
        }
        seen.insert(term.to_string());
        claimed.extend(term.split(' ').map(str::to_string));
        topics.push(title_case(term));
    }
}
