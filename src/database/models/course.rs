// Database models - Course
use serde::{Deserialize, Serialize};

/// A course: the anchor every segment, topic and quiz hangs off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}
