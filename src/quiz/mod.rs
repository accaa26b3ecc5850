//! Quiz assignment tracking and mastery scoring

pub mod assignment;
pub mod random;
pub mod scoring;

pub use assignment::{AssignmentService, SubmittedAnswer};
pub use random::{RandomSource, ThreadRngSource};
pub use scoring::{ScoringEngine, TopicScore};
