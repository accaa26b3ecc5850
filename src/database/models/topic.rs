// Database models - Topic and Resumen
use serde::{Deserialize, Serialize};

/// A named subject tracked per course; names are unique within a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
}

/// A stored summary for a topic, with its supporting transcript excerpt
///
/// Append-only; a topic accumulates one resumen per summary-generation run
/// that found it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resumen {
    pub id: i64,
    pub topic_id: i64,
    pub summary: String,
    pub transcript_segment: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default)]
    pub related_topics: Vec<String>,
    pub created_at: String,
}

/// A topic together with all of its resumen rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicWithResumenes {
    pub topic: Topic,
    pub resumenes: Vec<Resumen>,
}

/// A summary ready to persist
#[derive(Debug, Clone)]
pub struct NewResumen {
    pub topic_id: i64,
    pub summary: String,
    pub transcript_segment: String,
    pub start_time: f64,
    pub end_time: f64,
    pub key_terms: Vec<String>,
    pub related_topics: Vec<String>,
}
