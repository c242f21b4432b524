use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A source document as produced by the reader: basename plus full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub doc_id: String,
    pub text: String,
}

impl Fragment {
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
        }
    }
}

/// Allocator output: one timed slot per topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub id: String,
    pub title: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl Mcq {
    pub fn has_answer(&self) -> bool {
        self.options.iter().any(|o| o == &self.answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub title: String,
    pub minutes: u32,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
    #[serde(default)]
    pub covered: bool,
    #[serde(default)]
    pub asked_mcqs: Vec<Mcq>,
}

impl Block {
    pub fn from_spec(spec: BlockSpec, fragments: Vec<Fragment>) -> Self {
        Self {
            id: spec.id,
            title: spec.title,
            minutes: spec.minutes,
            fragments,
            covered: false,
            asked_mcqs: Vec::new(),
        }
    }

    pub fn spec(&self) -> BlockSpec {
        BlockSpec {
            id: self.id.clone(),
            title: self.title.clone(),
            minutes: self.minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    /// ISO date (`YYYY-MM-DD`); anything else counts as "no date".
    pub date: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Exam {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub q: String,
    pub a: String,
}

/// Question bank keyed by exact topic label.
pub type Bank = BTreeMap<String, Vec<QaPair>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub syllabus_topics: Vec<String>,
    #[serde(default)]
    pub pins: Vec<Fragment>,
    #[serde(default)]
    pub bank: Bank,
}
