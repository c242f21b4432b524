pub mod clean;
pub mod dedupe;
pub mod points;
pub mod relevance;
pub mod stopwords;
pub mod tfidf;
pub mod topics;

use indicatif::ProgressBar;
use tracing::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::models::{Document, Fragment};
use dedupe::DedupeConfig;

/// Three-pass pipeline: raw text → cleaned lines → raw points → deduplicated fragments.
pub fn chunk_fragments(doc_name: &str, full_text: &str, cfg: &DedupeConfig) -> Vec<String> {
    if full_text.trim().is_empty() {
        return Vec::new();
    }
    let text = clean::clean_lines(full_text);
    let raw = points::extract_raw_points(&text);
    let kept = dedupe::dedupe_semantic(&raw, cfg);
    debug!(doc = doc_name, raw = raw.len(), kept = kept.len(), "chunked document");
    kept
}

fn chunk_one(doc: &Document, cfg: &DedupeConfig, pb: &ProgressBar) -> Vec<Fragment> {
    let frags = chunk_fragments(&doc.name, &doc.text, cfg)
        .into_iter()
        .map(|text| Fragment::new(doc.name.clone(), text))
        .collect();
    pb.inc(1);
    frags
}

/// Chunk every document; output keeps document order.
#[cfg(feature = "rayon")]
pub fn chunk_documents(docs: &[Document], cfg: &DedupeConfig, pb: &ProgressBar) -> Vec<Fragment> {
    docs.par_iter()
        .map(|d| chunk_one(d, cfg, pb))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(not(feature = "rayon"))]
pub fn chunk_documents(docs: &[Document], cfg: &DedupeConfig, pb: &ProgressBar) -> Vec<Fragment> {
    docs.iter().flat_map(|d| chunk_one(d, cfg, pb)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_document() {
        assert!(chunk_fragments("empty.md", "  \n\t ", &DedupeConfig::default()).is_empty());
    }

    #[test]
    fn economics_fixture() {
        let md = std::fs::read_to_string("tests/fixtures/economics.md").unwrap();
        let frags = chunk_fragments("economics.md", &md, &DedupeConfig::default());

        assert!(!frags.is_empty());
        assert!(frags.len() <= 80);
        for f in &frags {
            let len = f.chars().count();
            assert!((8..=220).contains(&len), "bad length: {f}");
            assert!(f.ends_with(['.', '!', '?']), "no terminal punctuation: {f}");
            assert!(!f.contains("http"), "url survived: {f}");
            assert!(!f.contains('`'), "code survived: {f}");
        }
        // bullet text survives as its own point
        assert!(frags.iter().any(|f| f == "A shift in price moves along the demand curve."));
        // bullet repeating a paragraph sentence is dropped
        let law = frags.iter().filter(|f| f.contains("law of demand")).count();
        assert_eq!(law, 1, "{frags:?}");
        // stoplisted heading is not a point
        assert!(!frags.iter().any(|f| f == "References."));
    }

    #[test]
    fn documents_keep_order_and_origin() {
        let docs = vec![
            Document::new("a.md", "- Opportunity cost is the next best alternative"),
            Document::new("b.md", "- Marginal analysis compares small changes"),
        ];
        let frags = chunk_documents(&docs, &DedupeConfig::default(), &ProgressBar::hidden());
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].doc_id, "a.md");
        assert_eq!(frags[1].doc_id, "b.md");
        assert_eq!(frags[1].text, "Marginal analysis compares small changes.");
    }
}
