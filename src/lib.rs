//! Study session planner: turns a pile of notes into timed topic blocks with
//! relevant fragments and multiple-choice questions.
//!
//! Pipeline: raw documents → `notes` (clean, extract points, dedupe, topics)
//! → `planner` (allocate minutes, order by syllabus and exams) → `quiz`.

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod notes;
pub mod planner;
pub mod quiz;
pub mod reader;
pub mod session;
