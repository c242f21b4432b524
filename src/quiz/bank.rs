use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Bank, QaPair};

static TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^#\s*Topic:\s*(.+)$").unwrap());
static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^[-*]\s*Q:\s*(.+)$").unwrap());
static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^A:\s*(.+)$").unwrap());

/// Parse the plain-text bank format:
///
/// ```text
/// # Topic: Elasticity
/// - Q: What is price elasticity of demand?
///   A: The responsiveness of quantity demanded to price change.
/// ```
///
/// A repeated `# Topic:` appends to the pairs already collected for it.
pub fn parse_bank(text: &str) -> Bank {
    let mut bank = Bank::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = TOPIC_RE.captures(line) {
            let topic = caps[1].trim().to_string();
            bank.entry(topic.clone()).or_default();
            current = Some(topic);
            continue;
        }
        let Some(pairs) = current.as_ref().and_then(|t| bank.get_mut(t)) else {
            continue;
        };
        if let Some(caps) = QUESTION_RE.captures(line) {
            pairs.push(QaPair {
                q: caps[1].trim().to_string(),
                a: String::new(),
            });
        } else if let Some(caps) = ANSWER_RE.captures(line) {
            if let Some(last) = pairs.last_mut() {
                last.a = caps[1].trim().to_string();
            }
        }
    }
    bank
}
