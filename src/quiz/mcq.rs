//! Tiered MCQ generation. Each tier can be called on its own; `generate`
//! chains them: bank, language model, cloze heuristic, placeholder pad.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::{McqBackend, MAX_CONTEXT_FRAGMENTS};
use crate::models::{Bank, Mcq};
use crate::notes::clean::capitalize;
use crate::notes::points::split_sentences_loose;

pub const DISTRACTORS: [&str; 4] = ["None of the above", "All of the above", "It depends", "A constant value"];
pub const OPTION_COUNT: usize = 4;
pub const DEFAULT_COUNT: usize = 4;

const BLANK: &str = "_____";
const CLOZE_MIN_WORDS: usize = 8;
const CLOZE_MAX_WORDS: usize = 30;
const WRAPPER_KEYS: [&str; 3] = ["mcqs", "questions", "items"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum McqSource {
    Bank,
    Llm,
    Heuristic,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoBankEntries,
    BackendUnavailable,
    BackendFailed(String),
    NoValidItems,
    NoUsableSentences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Produced(Vec<Mcq>),
    Skipped(SkipReason),
}

impl TierOutcome {
    fn from_items(items: Vec<Mcq>, empty: SkipReason) -> Self {
        if items.is_empty() {
            TierOutcome::Skipped(empty)
        } else {
            TierOutcome::Produced(items)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcedMcq {
    #[serde(flatten)]
    pub mcq: Mcq,
    pub source: McqSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McqReport {
    pub items: Vec<SourcedMcq>,
    pub skipped: Vec<(McqSource, SkipReason)>,
}

impl McqReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, source: McqSource) -> usize {
        self.items.iter().filter(|i| i.source == source).count()
    }

    pub fn mcqs(&self) -> Vec<Mcq> {
        self.items.iter().map(|i| i.mcq.clone()).collect()
    }

    pub fn into_mcqs(self) -> Vec<Mcq> {
        self.items.into_iter().map(|i| i.mcq).collect()
    }

    fn absorb(&mut self, source: McqSource, outcome: TierOutcome) {
        match outcome {
            TierOutcome::Produced(mcqs) => {
                debug!(?source, produced = mcqs.len(), "mcq tier");
                self.items
                    .extend(mcqs.into_iter().map(|mcq| SourcedMcq { mcq, source }));
            }
            TierOutcome::Skipped(reason) => {
                debug!(?source, ?reason, "mcq tier skipped");
                self.skipped.push((source, reason));
            }
        }
    }
}

/// Put `answer` into `options` at a random slot unless it is already there.
fn ensure_answer<R: Rng + ?Sized>(options: &mut Vec<String>, answer: &str, rng: &mut R) {
    if options.iter().any(|o| o == answer) {
        return;
    }
    if options.is_empty() {
        options.push(answer.to_string());
        return;
    }
    let slot = rng.gen_range(0..options.len());
    options[slot] = answer.to_string();
}

/// Four shuffled options: the answer plus the fixed distractors.
pub fn mcqize<R: Rng + ?Sized>(question: &str, answer: &str, rng: &mut R) -> Mcq {
    let mut options: Vec<String> = Vec::with_capacity(DISTRACTORS.len() + 1);
    for opt in std::iter::once(answer).chain(DISTRACTORS) {
        if !options.iter().any(|o| o == opt) {
            options.push(opt.to_string());
        }
    }
    options.shuffle(rng);
    options.truncate(OPTION_COUNT);
    ensure_answer(&mut options, answer, rng);

    Mcq {
        question: question.to_string(),
        options,
        answer: answer.to_string(),
    }
}

pub fn placeholder(topic: &str) -> Mcq {
    Mcq {
        question: format!("{topic}: True or False? Worked examples help clarify definitions."),
        options: vec!["True".into(), "False".into()],
        answer: "True".into(),
    }
}

pub fn bank_tier<R: Rng + ?Sized>(topic: &str, bank: &Bank, n: usize, rng: &mut R) -> TierOutcome {
    let items: Vec<Mcq> = bank
        .get(topic)
        .into_iter()
        .flatten()
        .filter(|p| !p.q.trim().is_empty() && !p.a.trim().is_empty())
        .take(n)
        .map(|p| mcqize(p.q.trim(), p.a.trim(), rng))
        .collect();
    TierOutcome::from_items(items, SkipReason::NoBankEntries)
}

pub fn llm_tier<R: Rng + ?Sized>(
    topic: &str,
    fragments: &[String],
    backend: Option<&dyn McqBackend>,
    n: usize,
    rng: &mut R,
) -> TierOutcome {
    let Some(backend) = backend.filter(|b| b.available()) else {
        return TierOutcome::Skipped(SkipReason::BackendUnavailable);
    };
    let context = &fragments[..fragments.len().min(MAX_CONTEXT_FRAGMENTS)];
    match backend.mcqs_from_notes(topic, context, n) {
        Ok(value) => {
            let mut items = validate_llm_items(&value, rng);
            items.truncate(n);
            TierOutcome::from_items(items, SkipReason::NoValidItems)
        }
        Err(e) => {
            warn!(topic, error = %e, "LLM tier failed, falling back");
            TierOutcome::Skipped(SkipReason::BackendFailed(e.to_string()))
        }
    }
}

/// Coerce a backend reply into MCQs, dropping items that lack a question,
/// an options list or an answer.
pub fn validate_llm_items<R: Rng + ?Sized>(value: &Value, rng: &mut R) -> Vec<Mcq> {
    let items: &[Value] = match value {
        Value::Array(items) => items,
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };
    items.iter().filter_map(|item| validate_item(item, rng)).collect()
}

fn validate_item<R: Rng + ?Sized>(item: &Value, rng: &mut R) -> Option<Mcq> {
    let question = item.get("question")?.as_str()?.trim();
    let answer = item.get("answer")?.as_str()?.trim();
    let raw_options = item.get("options")?.as_array()?;
    if question.is_empty() || answer.is_empty() || raw_options.is_empty() {
        return None;
    }

    let mut options: Vec<String> = Vec::with_capacity(OPTION_COUNT);
    for raw in raw_options {
        let text = match raw {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !text.is_empty() && !options.contains(&text) {
            options.push(text);
        }
    }
    let mut label = options.len() + 1;
    while options.len() < OPTION_COUNT {
        let pad = format!("Option {label}");
        if !options.contains(&pad) {
            options.push(pad);
        }
        label += 1;
    }
    options.truncate(OPTION_COUNT);

    let answer = resolve_letter(answer, &options).unwrap_or(answer).to_string();
    ensure_answer(&mut options, &answer, rng);

    Some(Mcq {
        question: question.to_string(),
        options,
        answer,
    })
}

// "B" means the second option unless "B" is itself an option
fn resolve_letter<'a>(answer: &str, options: &'a [String]) -> Option<&'a str> {
    if options.iter().any(|o| o == answer) {
        return None;
    }
    let mut chars = answer.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };
    let idx = match c.to_ascii_uppercase() {
        'A' => 0,
        'B' => 1,
        'C' => 2,
        'D' => 3,
        _ => return None,
    };
    options.get(idx).map(String::as_str)
}

/// Blank the first word of each mid-length sentence and ask for it back.
pub fn cloze_tier<R: Rng + ?Sized>(fragments: &[String], n: usize, rng: &mut R) -> TierOutcome {
    let mut items = Vec::new();
    let sentences = fragments.iter().flat_map(|f| split_sentences_loose(f));
    for sentence in sentences {
        if items.len() >= n {
            break;
        }
        let words = sentence.split_whitespace().count();
        if !(CLOZE_MIN_WORDS..=CLOZE_MAX_WORDS).contains(&words) {
            continue;
        }
        let Some(first) = sentence.split_whitespace().next() else {
            continue;
        };
        let key = capitalize(first.trim_matches([',', '.']));
        if key.is_empty() {
            continue;
        }
        let blanked = sentence.replacen(first, BLANK, 1);
        let question = format!("What does {BLANK} refer to here? {blanked}");
        items.push(mcqize(&question, &key, rng));
    }
    TierOutcome::from_items(items, SkipReason::NoUsableSentences)
}

/// Exactly `n` MCQs for `topic`, tagged with the tier that produced each.
pub fn generate<R: Rng + ?Sized>(
    topic: &str,
    fragments: &[String],
    bank: &Bank,
    backend: Option<&dyn McqBackend>,
    n: usize,
    rng: &mut R,
) -> McqReport {
    let mut report = McqReport::default();
    if n == 0 {
        return report;
    }

    report.absorb(McqSource::Bank, bank_tier(topic, bank, n, rng));
    if report.len() < n {
        let outcome = llm_tier(topic, fragments, backend, n - report.len(), rng);
        report.absorb(McqSource::Llm, outcome);
    }
    if report.len() < n {
        let outcome = cloze_tier(fragments, n - report.len(), rng);
        report.absorb(McqSource::Heuristic, outcome);
    }
    while report.len() < n {
        report.items.push(SourcedMcq {
            mcq: placeholder(topic),
            source: McqSource::Placeholder,
        });
    }
    report.items.truncate(n);
    report
}

pub fn make_mcqs_from_fragments<R: Rng + ?Sized>(
    topic: &str,
    fragments: &[String],
    bank: &Bank,
    backend: Option<&dyn McqBackend>,
    n: usize,
    rng: &mut R,
) -> Vec<Mcq> {
    generate(topic, fragments, bank, backend, n, rng).into_mcqs()
}
