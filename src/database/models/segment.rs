// Database models - Transcript segment
use serde::{Deserialize, Serialize};

/// A time-coded slice of the course transcript
///
/// Segments are created by ingestion and never change afterwards; reads
/// always return them ordered by `start` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub course_id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
}
