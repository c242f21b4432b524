pub mod bank;
pub mod mcq;

pub use bank::parse_bank;
pub use mcq::{generate, make_mcqs_from_fragments, mcqize, McqReport, McqSource, SkipReason, TierOutcome};
