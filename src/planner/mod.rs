pub mod allocate;
pub mod order;

pub use allocate::{allocate_minutes_with_focus, plan_blocks, rescale_minutes, sum_minutes, Allocator};
pub use order::{boost_nearest_exam_topics, nearest_exam, order_by_syllabus, reprioritize};
