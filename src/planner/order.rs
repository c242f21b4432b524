use std::collections::HashSet;

use chrono::NaiveDate;

use super::allocate::{sum_minutes, Allocator};
use crate::models::{Block, Exam};

/// Nearest exam on or after `today`. Exams without a parseable date never match.
pub fn nearest_exam(exams: &[Exam], today: NaiveDate) -> Option<&Exam> {
    exams
        .iter()
        .filter_map(|e| e.parsed_date().map(|d| (d, e)))
        .filter(|(d, _)| *d >= today)
        .min_by_key(|(d, _)| *d)
        .map(|(_, e)| e)
}

pub fn focus_topics(exams: &[Exam], today: NaiveDate) -> Vec<String> {
    nearest_exam(exams, today)
        .map(|e| e.topics.clone())
        .unwrap_or_default()
}

/// Syllabus-listed items first in syllabus order, then the rest in their
/// original order. Matching is case-insensitive on `key`.
pub fn order_by_syllabus_with<T, F>(items: Vec<T>, syllabus: &[String], key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());

    for entry in syllabus {
        let wanted = entry.trim().to_lowercase();
        if wanted.is_empty() {
            continue;
        }
        for slot in slots.iter_mut() {
            let hit = slot
                .as_ref()
                .is_some_and(|item| key(item).trim().to_lowercase() == wanted);
            if hit {
                ordered.extend(slot.take());
            }
        }
    }
    ordered.extend(slots.into_iter().flatten());
    ordered
}

/// Stable partition: focus items first, everything else after.
pub fn boost_focus_with<T, F>(items: Vec<T>, focus: &[String], key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let focus: HashSet<String> = focus.iter().map(|t| t.trim().to_lowercase()).collect();
    let (mut front, back): (Vec<T>, Vec<T>) = items
        .into_iter()
        .partition(|item| focus.contains(&key(item).trim().to_lowercase()));
    front.extend(back);
    front
}

pub fn order_by_syllabus(topics: &[String], syllabus: &[String]) -> Vec<String> {
    order_by_syllabus_with(topics.to_vec(), syllabus, String::as_str)
}

pub fn boost_nearest_exam_topics(topics: &[String], exams: &[Exam], today: NaiveDate) -> Vec<String> {
    let focus = focus_topics(exams, today);
    boost_focus_with(topics.to_vec(), &focus, String::as_str)
}

/// Syllabus order first, nearest-exam focus blocks pulled to the front,
/// then minutes re-split with focus weighting over the current total.
pub fn reprioritize(
    blocks: Vec<Block>,
    syllabus: &[String],
    exams: &[Exam],
    today: NaiveDate,
    alloc: &Allocator,
) -> Vec<Block> {
    let total = sum_minutes(blocks.iter().map(|b| b.minutes));
    let focus = focus_topics(exams, today);

    let blocks = order_by_syllabus_with(blocks, syllabus, |b| b.title.as_str());
    let mut blocks = boost_focus_with(blocks, &focus, |b| b.title.as_str());

    let specs: Vec<_> = blocks.iter().map(Block::spec).collect();
    for (block, spec) in blocks.iter_mut().zip(alloc.allocate_with_focus(&specs, &focus, total)) {
        block.minutes = spec.minutes;
    }
    blocks
}
