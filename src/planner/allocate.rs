use std::collections::HashSet;

use crate::models::BlockSpec;

pub const MIN_BLOCK_MINUTES: u32 = 3;
pub const DEFAULT_FOCUS_BOOST: f64 = 1.4;

// smallest base share per topic before rescaling
const MIN_BASE_MINUTES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocator {
    /// Weight of a focus topic relative to 1.0 for the rest.
    pub focus_boost: f64,
    pub min_block_minutes: u32,
}

impl Default for Allocator {
    fn default() -> Self {
        Self {
            focus_boost: DEFAULT_FOCUS_BOOST,
            min_block_minutes: MIN_BLOCK_MINUTES,
        }
    }
}

impl Allocator {
    /// Equal base share per topic, double for the first of several,
    /// rescaled to `total_minutes`.
    pub fn plan<S: AsRef<str>>(&self, topics: &[S], total_minutes: u32) -> Vec<BlockSpec> {
        if topics.is_empty() {
            return Vec::new();
        }
        let k = topics.len() as u32;
        let base = (total_minutes / k).max(MIN_BASE_MINUTES);
        let raw: Vec<u32> = (0..topics.len())
            .map(|i| if i == 0 && k > 1 { base * 2 } else { base })
            .collect();
        let minutes = self.rescale(&raw, total_minutes);

        topics
            .iter()
            .zip(minutes)
            .enumerate()
            .map(|(i, (t, m))| BlockSpec {
                id: format!("b{}", i + 1),
                title: t.as_ref().to_string(),
                minutes: m,
            })
            .collect()
    }

    /// Weight each block by `focus_boost` when its title is a focus topic
    /// (case-insensitive) and split `total_minutes` by weight.
    pub fn allocate_with_focus<S: AsRef<str>>(
        &self,
        blocks: &[BlockSpec],
        focus_topics: &[S],
        total_minutes: u32,
    ) -> Vec<BlockSpec> {
        if blocks.is_empty() {
            return Vec::new();
        }
        let focus: HashSet<String> = focus_topics
            .iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .collect();
        let weights: Vec<f64> = blocks
            .iter()
            .map(|b| {
                if focus.contains(&b.title.trim().to_lowercase()) {
                    self.focus_boost
                } else {
                    1.0
                }
            })
            .collect();
        let weight_sum: f64 = weights.iter().sum();

        let mut minutes: Vec<u32> = weights
            .iter()
            .map(|w| {
                let share = (w * total_minutes as f64 / weight_sum).round() as u32;
                share.max(self.min_block_minutes)
            })
            .collect();
        reconcile(&mut minutes, total_minutes, self.min_block_minutes);

        blocks
            .iter()
            .zip(minutes)
            .map(|(b, m)| BlockSpec {
                minutes: m,
                ..b.clone()
            })
            .collect()
    }

    /// Scale minutes proportionally to a new total, floor each, fix drift.
    pub fn rescale(&self, minutes: &[u32], total_minutes: u32) -> Vec<u32> {
        let sum: u64 = minutes.iter().map(|&m| u64::from(m)).sum();
        if sum == 0 {
            return minutes.to_vec();
        }
        let scale = total_minutes as f64 / sum as f64;
        let mut out: Vec<u32> = minutes
            .iter()
            .map(|&m| ((m as f64 * scale).round() as u32).max(self.min_block_minutes))
            .collect();
        reconcile(&mut out, total_minutes, self.min_block_minutes);
        out
    }
}

/// Push the rounding residual onto the first block, or take it back from the
/// last blocks without going under `floor`.
fn reconcile(minutes: &mut [u32], total: u32, floor: u32) {
    if minutes.is_empty() {
        return;
    }
    let total = u64::from(total);
    let sum: u64 = minutes.iter().map(|&m| u64::from(m)).sum();
    if sum < total {
        let short = u32::try_from(total - sum).unwrap_or(u32::MAX);
        minutes[0] = minutes[0].saturating_add(short);
        return;
    }
    let mut excess = sum - total;
    for m in minutes.iter_mut().rev() {
        if excess == 0 {
            break;
        }
        let give = u64::from(m.saturating_sub(floor)).min(excess);
        // give <= *m - floor, so it fits
        *m -= give as u32;
        excess -= give;
    }
}

/// Total minutes, saturating at `u32::MAX`.
pub fn sum_minutes<I: IntoIterator<Item = u32>>(minutes: I) -> u32 {
    minutes.into_iter().fold(0u32, u32::saturating_add)
}

pub fn plan_blocks<S: AsRef<str>>(topics: &[S], total_minutes: u32) -> Vec<BlockSpec> {
    Allocator::default().plan(topics, total_minutes)
}

pub fn allocate_minutes_with_focus<S: AsRef<str>>(
    blocks: &[BlockSpec],
    focus_topics: &[S],
    total_minutes: u32,
) -> Vec<BlockSpec> {
    Allocator::default().allocate_with_focus(blocks, focus_topics, total_minutes)
}

pub fn rescale_minutes(minutes: &[u32], total_minutes: u32) -> Vec<u32> {
    Allocator::default().rescale(minutes, total_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(blocks: &[BlockSpec]) -> u32 {
        blocks.iter().map(|b| b.minutes).sum()
    }

    fn wide_total(blocks: &[BlockSpec]) -> u64 {
        blocks.iter().map(|b| u64::from(b.minutes)).sum()
    }

    #[test]
    fn three_topics_thirty_minutes() {
        let blocks = plan_blocks(&["A", "B", "C"], 30);
        assert_eq!(blocks.len(), 3);
        assert_eq!(total(&blocks), 30);
        assert_eq!(blocks[0].id, "b1");
        assert_eq!(blocks[2].id, "b3");
        assert!(blocks[0].minutes > blocks[1].minutes);
        assert!(blocks[0].minutes > blocks[2].minutes);
    }

    #[test]
    fn single_topic_takes_everything() {
        let blocks = plan_blocks(&["Only"], 45);
        assert_eq!(blocks[0].minutes, 45);
    }

    #[test]
    fn exact_total_and_floor_across_budgets() {
        for k in 1..=8usize {
            let topics: Vec<String> = (0..k).map(|i| format!("T{i}")).collect();
            for total_min in (3 * k as u32)..=180 {
                let blocks = plan_blocks(&topics, total_min);
                assert_eq!(total(&blocks), total_min, "k={k} total={total_min}");
                assert!(blocks.iter().all(|b| b.minutes >= MIN_BLOCK_MINUTES));
            }
        }
    }

    #[test]
    fn floor_holds_on_tiny_budgets() {
        let blocks = plan_blocks(&["A", "B", "C", "D"], 5);
        assert!(blocks.iter().all(|b| b.minutes >= MIN_BLOCK_MINUTES));
    }

    #[test]
    fn empty_topics() {
        assert!(plan_blocks::<&str>(&[], 30).is_empty());
    }

    #[test]
    fn focus_topic_gets_more_time() {
        let blocks = plan_blocks(&["Demand", "Supply"], 60);
        let out = allocate_minutes_with_focus(&blocks, &["supply"], 60);
        assert_eq!(total(&out), 60);
        assert_eq!(out[0].minutes, 25);
        assert_eq!(out[1].minutes, 35);
        assert_eq!(out[1].id, "b2");
    }

    #[test]
    fn no_focus_splits_evenly() {
        let blocks = plan_blocks(&["A", "B", "C"], 30);
        let out = allocate_minutes_with_focus::<&str>(&blocks, &[], 30);
        assert!(out.iter().all(|b| b.minutes == 10));
    }

    #[test]
    fn focus_residual_reconciled() {
        let blocks = plan_blocks(&["A", "B", "C"], 31);
        let out = allocate_minutes_with_focus(&blocks, &["b"], 31);
        assert_eq!(total(&out), 31);
        assert!(out[1].minutes > out[0].minutes);
        assert!(out[1].minutes > out[2].minutes);
    }

    #[test]
    fn custom_boost() {
        let alloc = Allocator {
            focus_boost: 3.0,
            min_block_minutes: 3,
        };
        let blocks = alloc.plan(&["A", "B"], 40);
        let out = alloc.allocate_with_focus(&blocks, &["A"], 40);
        assert_eq!(out[0].minutes, 30);
        assert_eq!(out[1].minutes, 10);
    }

    #[test]
    fn rescale_hits_new_total() {
        let out = rescale_minutes(&[20, 10, 10], 55);
        assert_eq!(out.iter().sum::<u32>(), 55);
        assert!(out[0] > out[1]);
    }

    #[test]
    fn huge_budgets_do_not_overflow() {
        for total_min in [4_000_000_000, u32::MAX] {
            let blocks = plan_blocks(&["A", "B", "C"], total_min);
            assert_eq!(wide_total(&blocks), u64::from(total_min));
            assert!(blocks[0].minutes > blocks[1].minutes);

            let out = allocate_minutes_with_focus(&blocks, &["C"], total_min);
            assert_eq!(wide_total(&out), u64::from(total_min));
            assert!(out[2].minutes > out[1].minutes);
        }
        let out = rescale_minutes(&[u32::MAX, u32::MAX, 10], 60);
        assert_eq!(out.iter().sum::<u32>(), 60);
        assert!(out.iter().all(|&m| m >= MIN_BLOCK_MINUTES));
    }

    #[test]
    fn sum_minutes_saturates() {
        assert_eq!(sum_minutes([10, 20, 30]), 60);
        assert_eq!(sum_minutes([u32::MAX, 5]), u32::MAX);
        assert_eq!(sum_minutes(Vec::<u32>::new()), 0);
    }
}
