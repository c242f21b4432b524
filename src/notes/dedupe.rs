use std::collections::HashSet;

use serde::Deserialize;

use super::clean::{clean_text, normalize_sentence};
use super::tfidf::{cosine, SparseVec, TfidfModel, TfidfOptions};

const MIN_POINT_CHARS: usize = 8;
const MAX_POINT_CHARS: usize = 220;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Candidates at or above this cosine similarity to a kept point are dropped.
    pub threshold: f64,
    pub cap: usize,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            threshold: 0.72,
            cap: 80,
        }
    }
}

/// Normalize, length-guard, exact-dedupe, then greedily drop near duplicates.
pub fn dedupe_semantic<S: AsRef<str>>(points: &[S], cfg: &DedupeConfig) -> Vec<String> {
    if cfg.cap == 0 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut unique: Vec<String> = Vec::new();
    for p in points {
        let p = normalize_sentence(&clean_text(p.as_ref()));
        let len = p.chars().count();
        if !(MIN_POINT_CHARS..=MAX_POINT_CHARS).contains(&len) {
            continue;
        }
        if seen.insert(p.to_lowercase()) {
            unique.push(p);
        }
    }

    if unique.len() <= 1 {
        unique.truncate(cfg.cap);
        return unique;
    }

    let opts = TfidfOptions {
        max_ngram: 2,
        ..Default::default()
    };
    let model = TfidfModel::fit_transform(&unique, &opts);

    let mut keep: Vec<String> = Vec::new();
    let mut kept_rows: Vec<&SparseVec> = Vec::new();
    for (i, p) in unique.iter().enumerate() {
        let row = model.row(i);
        let max_sim = kept_rows
            .iter()
            .map(|k| cosine(row, k))
            .fold(0.0_f64, f64::max);
        if kept_rows.is_empty() || max_sim < cfg.threshold {
            keep.push(p.clone());
            kept_rows.push(row);
        }
        if keep.len() >= cfg.cap {
            break;
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DedupeConfig {
        DedupeConfig::default()
    }

    #[test]
    fn exact_duplicates_case_insensitive() {
        let out = dedupe_semantic(&["Supply curves slope upward", "supply curves slope upward."], &cfg());
        assert_eq!(out, vec!["Supply curves slope upward."]);
    }

    #[test]
    fn length_bounds() {
        let long = "x".repeat(230);
        let out = dedupe_semantic(&["tiny", long.as_str(), "A reasonable point"], &cfg());
        assert_eq!(out, vec!["A reasonable point."]);
    }

    #[test]
    fn near_duplicates_dropped() {
        let points = [
            "Price elasticity of demand measures responsiveness to price",
            "Price elasticity of demand measures the responsiveness to price",
            "Inflation erodes purchasing power over time",
        ];
        let out = dedupe_semantic(&points, &cfg());
        assert_eq!(
            out,
            vec![
                "Price elasticity of demand measures responsiveness to price.",
                "Inflation erodes purchasing power over time.",
            ]
        );
    }

    #[test]
    fn threshold_is_tunable() {
        let points = [
            "Price elasticity of demand measures responsiveness to price",
            "Price elasticity of demand measures the responsiveness to price",
        ];
        let loose = DedupeConfig {
            threshold: 1.01,
            cap: 80,
        };
        assert_eq!(dedupe_semantic(&points, &loose).len(), 2);
    }

    #[test]
    fn cap_is_respected() {
        let points: Vec<String> = (0..20)
            .map(|i| format!("Distinct point number{i} about topic{i}"))
            .collect();
        let small = DedupeConfig {
            threshold: 0.72,
            cap: 5,
        };
        assert_eq!(dedupe_semantic(&points, &small).len(), 5);
        let none = DedupeConfig {
            threshold: 0.72,
            cap: 0,
        };
        assert!(dedupe_semantic(&points, &none).is_empty());
    }

    #[test]
    fn idempotent_on_own_output() {
        let points = [
            "Markets clear where supply meets demand",
            "Inflation erodes purchasing power",
            "Comparative advantage drives trade",
            "markets clear where supply meets demand",
        ];
        let once = dedupe_semantic(&points, &cfg());
        let twice = dedupe_semantic(&once, &cfg());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn single_point_passthrough() {
        assert_eq!(dedupe_semantic(&["only one point here"], &cfg()), vec!["Only one point here."]);
        assert!(dedupe_semantic::<&str>(&[], &cfg()).is_empty());
    }
}
