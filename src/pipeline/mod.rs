//! Transcript -> quiz pipeline
//!
//! Segment selection, topic presence detection, question generation and
//! summary analysis, orchestrated by `QuizService`.

pub mod detection;
pub mod questions;
pub mod segments;
pub mod service;
pub mod summary;

pub use segments::{select_segments, SegmentWindow};
pub use service::{PipelineConfig, QuizService, SummaryRun};
