//! Term-frequency / inverse-document-frequency vectors over a small corpus.
//!
//! A model is fitted per call on exactly the texts being compared and then
//! thrown away; nothing is cached between calls. Weighting follows the usual
//! smoothed scheme: raw counts times `ln((1 + n) / (1 + df)) + 1`, each row
//! L2-normalised.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use super::stopwords::is_stop_word;

// tokens of two or more word characters
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Sparse row: `(term index, weight)` sorted by index.
pub type SparseVec = Vec<(usize, f64)>;

#[derive(Debug, Clone, Copy)]
pub struct TfidfOptions {
    /// Largest n-gram size (1 = unigrams only, 2 = unigrams + bigrams).
    pub max_ngram: usize,
    pub stop_words: bool,
    /// Keep only the most frequent terms across the corpus.
    pub max_features: Option<usize>,
}

impl Default for TfidfOptions {
    fn default() -> Self {
        Self {
            max_ngram: 1,
            stop_words: false,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocabulary: Vec<String>,
    rows: Vec<SparseVec>,
}

struct TermStats {
    term: String,
    corpus_count: usize,
    doc_freq: usize,
}

impl TfidfModel {
    pub fn fit_transform<S: AsRef<str>>(docs: &[S], opts: &TfidfOptions) -> Self {
        let counts: Vec<HashMap<String, usize>> = docs
            .iter()
            .map(|d| {
                let mut c = HashMap::new();
                for term in analyze(d.as_ref(), opts) {
                    *c.entry(term).or_insert(0) += 1;
                }
                c
            })
            .collect();

        let mut corpus: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for doc in &counts {
            for (term, &k) in doc {
                let e = corpus.entry(term.as_str()).or_insert((0, 0));
                e.0 += k;
                e.1 += 1;
            }
        }

        let mut stats: Vec<TermStats> = corpus
            .into_iter()
            .map(|(term, (corpus_count, doc_freq))| TermStats {
                term: term.to_string(),
                corpus_count,
                doc_freq,
            })
            .collect();

        if let Some(limit) = opts.max_features {
            if stats.len() > limit {
                stats.sort_by(|a, b| {
                    b.corpus_count
                        .cmp(&a.corpus_count)
                        .then_with(|| a.term.cmp(&b.term))
                });
                stats.truncate(limit);
                stats.sort_by(|a, b| a.term.cmp(&b.term));
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = stats
            .iter()
            .map(|s| ((1.0 + n) / (1.0 + s.doc_freq as f64)).ln() + 1.0)
            .collect();
        let index: HashMap<&str, usize> = stats
            .iter()
            .enumerate()
            .map(|(i, s)| (s.term.as_str(), i))
            .collect();

        let rows = counts
            .iter()
            .map(|doc| {
                let mut row: SparseVec = doc
                    .iter()
                    .filter_map(|(term, &k)| {
                        index.get(term.as_str()).map(|&i| (i, k as f64 * idf[i]))
                    })
                    .collect();
                row.sort_by_key(|&(i, _)| i);
                l2_normalize(&mut row);
                row
            })
            .collect();

        let vocabulary = stats.iter().map(|s| s.term.clone()).collect();

        Self { vocabulary, rows }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn row(&self, i: usize) -> &SparseVec {
        &self.rows[i]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column means of the weight matrix, aligned with [`Self::vocabulary`].
    pub fn mean_weights(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.vocabulary.len()];
        for row in &self.rows {
            for &(i, w) in row {
                sums[i] += w;
            }
        }
        let n = self.rows.len().max(1) as f64;
        sums.into_iter().map(|s| s / n).collect()
    }
}

/// Lowercase, tokenize, drop stop words, then emit n-grams up to `max_ngram`.
pub fn analyze(text: &str, opts: &TfidfOptions) -> Vec<String> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !opts.stop_words || !is_stop_word(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    for n in 2..=opts.max_ngram.max(1) {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

fn l2_normalize(row: &mut SparseVec) {
    let norm = row.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
}

pub fn dot(a: &SparseVec, b: &SparseVec) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Cosine similarity; 0.0 when either side is the zero vector.
pub fn cosine(a: &SparseVec, b: &SparseVec) -> f64 {
    let na = dot(a, a).sqrt();
    let nb = dot(b, b).sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_unigrams_and_bigrams() {
        let opts = TfidfOptions {
            max_ngram: 2,
            ..Default::default()
        };
        let terms = analyze("Price elasticity, a measure!", &opts);
        assert_eq!(
            terms,
            vec!["price", "elasticity", "measure", "price elasticity", "elasticity measure"]
        );
    }

    #[test]
    fn stop_words_removed_before_ngrams() {
        let opts = TfidfOptions {
            max_ngram: 2,
            stop_words: true,
            max_features: None,
        };
        let terms = analyze("Text about demand", &opts);
        assert_eq!(terms, vec!["text", "demand", "text demand"]);
    }

    #[test]
    fn identical_docs_have_unit_similarity() {
        let model = TfidfModel::fit_transform(&["supply and demand", "supply and demand"], &TfidfOptions::default());
        let sim = cosine(model.row(0), model.row(1));
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_docs_have_zero_similarity() {
        let model = TfidfModel::fit_transform(&["alpha beta", "gamma delta"], &TfidfOptions::default());
        assert_eq!(cosine(model.row(0), model.row(1)), 0.0);
    }

    #[test]
    fn rows_are_normalised() {
        let model = TfidfModel::fit_transform(&["one two two three"], &TfidfOptions::default());
        let norm: f64 = model.row(0).iter().map(|&(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn max_features_keeps_most_frequent() {
        let opts = TfidfOptions {
            max_features: Some(2),
            ..Default::default()
        };
        let model = TfidfModel::fit_transform(&["aa aa aa bb bb cc", "aa bb dd"], &opts);
        assert_eq!(model.vocabulary(), &["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn empty_corpus_and_zero_vectors() {
        let model = TfidfModel::fit_transform::<&str>(&[], &TfidfOptions::default());
        assert!(model.is_empty());
        assert!(model.vocabulary().is_empty());
        assert_eq!(cosine(&vec![], &vec![(0, 1.0)]), 0.0);
    }

    #[test]
    fn mean_weights_rank_shared_terms() {
        let model = TfidfModel::fit_transform(&["cat cat dog", "cat fish"], &TfidfOptions::default());
        let means = model.mean_weights();
        let cat = model.vocabulary().iter().position(|t| t == "cat").unwrap();
        let fish = model.vocabulary().iter().position(|t| t == "fish").unwrap();
        assert!(means[cat] > means[fish]);
    }
}
