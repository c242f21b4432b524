use super::tfidf::{dot, TfidfModel, TfidfOptions};

pub const DEFAULT_TOP_K: usize = 3;

/// Indices of the `top_k` fragments most similar to `topic`, best first.
/// Equal scores keep their original order.
pub fn rank_fragments<S: AsRef<str>>(fragments: &[S], topic: &str, top_k: usize) -> Vec<(usize, f64)> {
    if fragments.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut corpus: Vec<&str> = fragments.iter().map(AsRef::as_ref).collect();
    corpus.push(topic);

    let opts = TfidfOptions {
        stop_words: true,
        ..Default::default()
    };
    let model = TfidfModel::fit_transform(&corpus, &opts);
    let topic_row = model.row(fragments.len());

    let mut scored: Vec<(usize, f64)> = (0..fragments.len())
        .map(|i| (i, dot(model.row(i), topic_row)))
        .collect();
    // sort_by is stable: ties stay in index order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);
    scored
}

pub fn map_fragments_to_topic<S: AsRef<str>>(fragments: &[S], topic: &str, top_k: usize) -> Vec<String> {
    rank_fragments(fragments, topic, top_k)
        .into_iter()
        .map(|(i, _)| fragments[i].as_ref().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENTS: [&str; 4] = [
        "Inflation erodes purchasing power.",
        "Price elasticity of demand measures responsiveness.",
        "Supply curves slope upward.",
        "Elastic demand means large quantity changes.",
    ];

    #[test]
    fn best_match_first() {
        let top = map_fragments_to_topic(&FRAGMENTS, "Elasticity of demand", 2);
        assert_eq!(top[0], FRAGMENTS[1]);
        assert_eq!(top.len(), 2);
        assert_eq!(top[1], FRAGMENTS[3]);
    }

    #[test]
    fn ties_keep_original_order() {
        let top = map_fragments_to_topic(&FRAGMENTS, "Unrelated gardening", 3);
        assert_eq!(top, vec![FRAGMENTS[0], FRAGMENTS[1], FRAGMENTS[2]]);
    }

    #[test]
    fn empty_and_oversized_k() {
        assert!(map_fragments_to_topic::<&str>(&[], "Demand", 3).is_empty());
        assert_eq!(map_fragments_to_topic(&FRAGMENTS, "Supply", 10).len(), 4);
    }
}
