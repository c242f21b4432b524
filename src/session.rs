use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use indicatif::ProgressBar;
use tracing::info;

use crate::config::Settings;
use crate::db::new_id;
use crate::error::SessionError;
use crate::models::{Bank, Block, Document, Exam, Fragment, Mcq, Session};
use crate::notes::chunk_documents;
use crate::notes::relevance::{rank_fragments, DEFAULT_TOP_K};
use crate::notes::topics::{extract_topics, DEFAULT_TOPIC};
use crate::planner::{self, order, Allocator};

pub const MAX_PINS: usize = 3;
pub const MAX_ASKED_OPTIONS: usize = 6;
pub const MIN_SESSION_MINUTES: u32 = 10;

// doc id for pins whose text no longer matches a block fragment
const LOOSE_DOC_ID: &str = "notes";

pub struct SessionInput {
    pub name: String,
    pub minutes: u32,
    pub docs: Vec<Document>,
    pub syllabus: Vec<String>,
    pub bank: Bank,
}

pub fn clean_name(name: &str) -> Result<String, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::EmptyName);
    }
    Ok(name.to_string())
}

/// Chunk the notes, pick topics, plan timed blocks and attach the best
/// fragments to each block.
pub fn build_session(input: SessionInput, settings: &Settings, pb: &ProgressBar) -> Result<Session, SessionError> {
    let name = clean_name(&input.name)?;
    let docs: Vec<Document> = input
        .docs
        .into_iter()
        .filter(|d| !d.text.trim().is_empty())
        .collect();
    let Some(first) = docs.first() else {
        return Err(SessionError::NoUsableContent);
    };

    let mut fragments = chunk_documents(&docs, &settings.dedupe, pb);
    if fragments.is_empty() {
        fragments.push(Fragment::new(first.name.clone(), first.text.trim()));
    }

    let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
    let mut topics = extract_topics(&texts, settings.topics.cap);
    if topics.is_empty() {
        topics.push(DEFAULT_TOPIC.to_string());
    }

    let specs = settings.plan.allocator().plan(&topics, input.minutes);
    let frag_texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    let blocks: Vec<Block> = specs
        .into_iter()
        .map(|spec| {
            let picked = rank_fragments(&frag_texts, &spec.title, DEFAULT_TOP_K)
                .into_iter()
                .map(|(i, _)| fragments[i].clone())
                .collect();
            Block::from_spec(spec, picked)
        })
        .collect();

    info!(
        docs = docs.len(),
        fragments = fragments.len(),
        blocks = blocks.len(),
        "built session"
    );

    Ok(Session {
        id: new_id(),
        name,
        created_at: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        blocks,
        syllabus_topics: input.syllabus,
        pins: Vec::new(),
        bank: input.bank,
    })
}

impl Session {
    pub fn block(&self, block_id: &str) -> Result<&Block, SessionError> {
        self.blocks
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| SessionError::BlockNotFound(block_id.to_string()))
    }

    fn block_mut(&mut self, block_id: &str) -> Result<&mut Block, SessionError> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == block_id)
            .ok_or_else(|| SessionError::BlockNotFound(block_id.to_string()))
    }

    pub fn total_minutes(&self) -> u32 {
        planner::sum_minutes(self.blocks.iter().map(|b| b.minutes))
    }

    /// Returns the new covered state.
    pub fn toggle_covered(&mut self, block_id: &str) -> Result<bool, SessionError> {
        let block = self.block_mut(block_id)?;
        block.covered = !block.covered;
        Ok(block.covered)
    }

    /// Unpin `text` if pinned, otherwise pin it most-recent-first keeping at
    /// most `MAX_PINS`. Returns whether the text is pinned afterwards.
    pub fn toggle_pin(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if let Some(i) = self.pins.iter().position(|p| p.text == text) {
            self.pins.remove(i);
            return false;
        }
        let doc_id = self
            .blocks
            .iter()
            .flat_map(|b| &b.fragments)
            .find(|f| f.text == text)
            .map_or(LOOSE_DOC_ID, |f| f.doc_id.as_str())
            .to_string();
        self.pins.insert(0, Fragment::new(doc_id, text));
        self.pins.truncate(MAX_PINS);
        true
    }

    /// Log an MCQ as asked. A question already logged for the block is
    /// ignored; returns whether anything was added.
    pub fn record_asked(&mut self, block_id: &str, mut mcq: Mcq) -> Result<bool, SessionError> {
        let block = self.block_mut(block_id)?;
        mcq.question = mcq.question.trim().to_string();
        mcq.answer = mcq.answer.trim().to_string();
        if mcq.question.is_empty() || mcq.answer.is_empty() {
            return Ok(false);
        }
        if block.asked_mcqs.iter().any(|m| m.question == mcq.question) {
            return Ok(false);
        }
        mcq.options.truncate(MAX_ASKED_OPTIONS);
        if !mcq.has_answer() {
            if mcq.options.len() < MAX_ASKED_OPTIONS {
                mcq.options.push(mcq.answer.clone());
            } else if let Some(last) = mcq.options.last_mut() {
                *last = mcq.answer.clone();
            }
        }
        block.asked_mcqs.push(mcq);
        Ok(true)
    }

    /// Rescale every block to a new session length (at least
    /// `MIN_SESSION_MINUTES`).
    pub fn update_duration(&mut self, minutes: u32, alloc: &Allocator) {
        let current: Vec<u32> = self.blocks.iter().map(|b| b.minutes).collect();
        let rescaled = alloc.rescale(&current, minutes.max(MIN_SESSION_MINUTES));
        for (block, m) in self.blocks.iter_mut().zip(rescaled) {
            block.minutes = m;
        }
    }

    pub fn reprioritize(&mut self, exams: &[Exam], today: NaiveDate, alloc: &Allocator) {
        let blocks = std::mem::take(&mut self.blocks);
        self.blocks = order::reprioritize(blocks, &self.syllabus_topics, exams, today, alloc);
    }

    /// Syllabus topics without a covered block of the same title.
    pub fn syllabus_gaps(&self) -> Vec<&str> {
        let covered: HashSet<String> = self
            .blocks
            .iter()
            .filter(|b| b.covered)
            .map(|b| b.title.trim().to_lowercase())
            .collect();
        self.syllabus_topics
            .iter()
            .filter(|t| !covered.contains(&t.trim().to_lowercase()))
            .map(String::as_str)
            .collect()
    }

    pub fn export_markdown(&self) -> String {
        let mut lines = vec![format!("# Session: {} ({})", self.name, self.id), String::new()];

        lines.extend(["## Covered".to_string(), String::new()]);
        for b in self.blocks.iter().filter(|b| b.covered) {
            lines.push(format!("- {} ({}m)", b.title, b.minutes));
        }

        lines.extend([String::new(), "## Missed / Next Up".to_string(), String::new()]);
        for b in self.blocks.iter().filter(|b| !b.covered) {
            lines.push(format!("- {} ({}m)", b.title, b.minutes));
        }

        lines.extend([String::new(), "## Pinned".to_string(), String::new()]);
        for p in &self.pins {
            lines.push(format!("> {}", p.text));
        }

        if !self.syllabus_topics.is_empty() {
            lines.extend([String::new(), "## Syllabus Gaps".to_string(), String::new()]);
            for t in self.syllabus_gaps() {
                lines.push(format!("- {t}"));
            }
        }

        if self.blocks.iter().any(|b| !b.asked_mcqs.is_empty()) {
            lines.extend([String::new(), "## MCQs Asked (by topic)".to_string(), String::new()]);
            for b in self.blocks.iter().filter(|b| !b.asked_mcqs.is_empty()) {
                lines.push(format!("### {}", b.title));
                for (i, q) in b.asked_mcqs.iter().enumerate() {
                    lines.push(format!("{}. {}", i + 1, q.question));
                    for (letter, opt) in ('A'..).zip(&q.options) {
                        lines.push(format!("   {letter}. {opt}"));
                    }
                    lines.push(format!("   **Answer:** {}", q.answer));
                    lines.push(String::new());
                }
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockSpec;

    fn block(id: &str, title: &str, minutes: u32, frags: &[&str]) -> Block {
        Block::from_spec(
            BlockSpec {
                id: id.into(),
                title: title.into(),
                minutes,
            },
            frags.iter().map(|t| Fragment::new("econ.md", *t)).collect(),
        )
    }

    fn sample() -> Session {
        Session {
            id: "abc123def456".into(),
            name: "Econ".into(),
            created_at: "2026-10-19 09:00".into(),
            blocks: vec![
                block("b1", "Demand", 15, &["Demand slopes down.", "Income shifts demand."]),
                block("b2", "Supply", 8, &["Supply slopes up."]),
                block("b3", "Elasticity", 7, &[]),
            ],
            syllabus_topics: vec!["Elasticity".into(), "Demand".into(), "Taxes".into()],
            pins: vec![],
            bank: Bank::new(),
        }
    }

    fn input(docs: Vec<Document>, minutes: u32) -> SessionInput {
        SessionInput {
            name: "Econ".into(),
            minutes,
            docs,
            syllabus: vec![],
            bank: Bank::new(),
        }
    }

    #[test]
    fn builds_from_fixture() {
        let md = std::fs::read_to_string("tests/fixtures/economics.md").unwrap();
        let docs = vec![Document::new("economics.md", md)];
        let sess = build_session(input(docs, 45), &Settings::default(), &ProgressBar::hidden()).unwrap();

        let titles: Vec<&str> = sess.blocks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(&titles[..3], &["Demand", "Supply", "Elasticity"]);
        assert!(sess.blocks.len() <= 8);
        assert_eq!(sess.total_minutes(), 45);
        assert!(sess.blocks.iter().all(|b| b.minutes >= 3));
        assert!(sess.blocks.iter().all(|b| b.fragments.len() <= DEFAULT_TOP_K));
        assert!(sess.blocks[0]
            .fragments
            .iter()
            .all(|f| f.text.to_lowercase().contains("demand")));
        assert!(sess.blocks[1].fragments[0].text.to_lowercase().contains("supply"));
        assert_eq!(sess.blocks[0].fragments[0].doc_id, "economics.md");
        assert_eq!(sess.id.len(), 12);
    }

    #[test]
    fn blank_notes_are_rejected() {
        let docs = vec![Document::new("a.md", "   "), Document::new("b.md", "\n\n")];
        let err = build_session(input(docs, 30), &Settings::default(), &ProgressBar::hidden()).unwrap_err();
        assert_eq!(err, SessionError::NoUsableContent);

        let err = build_session(input(vec![], 30), &Settings::default(), &ProgressBar::hidden()).unwrap_err();
        assert_eq!(err, SessionError::NoUsableContent);
    }

    #[test]
    fn tiny_notes_fall_back_to_overview() {
        let docs = vec![Document::new("tiny.md", " Hi. ")];
        let sess = build_session(input(docs, 30), &Settings::default(), &ProgressBar::hidden()).unwrap();
        assert_eq!(sess.blocks.len(), 1);
        assert_eq!(sess.blocks[0].title, DEFAULT_TOPIC);
        assert_eq!(sess.blocks[0].minutes, 30);
        assert_eq!(sess.blocks[0].fragments, vec![Fragment::new("tiny.md", "Hi.")]);
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(clean_name("  "), Err(SessionError::EmptyName));
        assert_eq!(clean_name(" Econ "), Ok("Econ".to_string()));
    }

    #[test]
    fn toggle_cover() {
        let mut s = sample();
        assert_eq!(s.toggle_covered("b2"), Ok(true));
        assert_eq!(s.toggle_covered("b2"), Ok(false));
        assert_eq!(s.toggle_covered("zz"), Err(SessionError::BlockNotFound("zz".into())));
    }

    #[test]
    fn pinning_twice_unpins() {
        let mut s = sample();
        assert!(s.toggle_pin("Supply slopes up."));
        let before = s.pins.clone();
        assert!(s.toggle_pin("Demand slopes down."));
        assert!(!s.toggle_pin("Demand slopes down."));
        assert_eq!(s.pins, before);
        assert_eq!(s.pins[0].doc_id, "econ.md");
    }

    #[test]
    fn pins_capped_most_recent_first() {
        let mut s = sample();
        for t in ["one", "two", "three", "four"] {
            s.toggle_pin(t);
        }
        let texts: Vec<&str> = s.pins.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["four", "three", "two"]);
        assert_eq!(s.pins[0].doc_id, LOOSE_DOC_ID);
    }

    #[test]
    fn asked_mcqs_deduped_and_fixed() {
        let mut s = sample();
        let mcq = Mcq {
            question: "What is demand?".into(),
            options: (1..=8).map(|i| format!("opt {i}")).collect(),
            answer: "Willingness to buy".into(),
        };
        assert_eq!(s.record_asked("b1", mcq.clone()), Ok(true));
        assert_eq!(s.record_asked("b1", mcq), Ok(false));
        let logged = &s.block("b1").unwrap().asked_mcqs;
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].options.len(), 6);
        assert!(logged[0].has_answer());
        assert!(s.record_asked("nope", logged[0].clone()).is_err());
    }

    #[test]
    fn duration_rescales_exactly() {
        let mut s = sample();
        s.update_duration(60, &Allocator::default());
        assert_eq!(s.total_minutes(), 60);
        assert!(s.blocks[0].minutes > s.blocks[1].minutes);

        s.update_duration(2, &Allocator::default());
        assert_eq!(s.total_minutes(), MIN_SESSION_MINUTES);
        assert!(s.blocks.iter().all(|b| b.minutes >= 3));
    }

    #[test]
    fn huge_duration_keeps_exact_total() {
        let mut s = sample();
        s.update_duration(u32::MAX, &Allocator::default());
        assert_eq!(s.total_minutes(), u32::MAX);

        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        s.reprioritize(&[], today, &Allocator::default());
        assert_eq!(s.total_minutes(), u32::MAX);
    }

    #[test]
    fn reprioritize_follows_syllabus_and_exam() {
        let mut s = sample();
        let exams = vec![Exam {
            id: "e1".into(),
            title: "Quiz".into(),
            date: "2026-10-21".into(),
            topics: vec!["Supply".into()],
        }];
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        s.reprioritize(&exams, today, &Allocator::default());
        let titles: Vec<&str> = s.blocks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Supply", "Elasticity", "Demand"]);
        assert_eq!(s.total_minutes(), 30);
        assert!(s.blocks[0].minutes > s.blocks[1].minutes);
    }

    #[test]
    fn export_sections() {
        let mut s = sample();
        s.toggle_covered("b1").unwrap();
        s.toggle_pin("Supply slopes up.");
        s.record_asked(
            "b1",
            Mcq {
                question: "Which way does demand slope?".into(),
                options: vec!["Up".into(), "Down".into()],
                answer: "Down".into(),
            },
        )
        .unwrap();

        let md = s.export_markdown();
        assert!(md.starts_with("# Session: Econ (abc123def456)\n"));
        assert!(md.contains("## Covered\n\n- Demand (15m)\n"));
        assert!(md.contains("## Missed / Next Up\n\n- Supply (8m)\n- Elasticity (7m)\n"));
        assert!(md.contains("## Pinned\n\n> Supply slopes up.\n"));
        assert!(md.contains("## Syllabus Gaps\n\n- Elasticity\n- Taxes\n"));
        assert!(md.contains("### Demand\n1. Which way does demand slope?\n   A. Up\n   B. Down\n   **Answer:** Down\n"));
    }

    #[test]
    fn export_without_mcqs_or_syllabus() {
        let mut s = sample();
        s.syllabus_topics.clear();
        let md = s.export_markdown();
        assert!(!md.contains("## MCQs Asked"));
        assert!(!md.contains("## Syllabus Gaps"));
        assert!(md.contains("## Pinned"));
    }
}
