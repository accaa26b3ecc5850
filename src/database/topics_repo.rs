// Topics repository for aula-quiz

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::Topic;
use super::DatabaseManager;

impl DatabaseManager {
    /// Create a topic under a course; name is unique within the course
    pub fn create_topic(&self, course_id: i64, name: &str) -> Result<Topic> {
        self.with_connection(|conn| create_topic_impl(conn, course_id, name))
    }

    /// All topics for a course, ordered by id
    pub fn get_topics_by_course(&self, course_id: i64) -> Result<Vec<Topic>> {
        self.with_connection(|conn| get_topics_by_course_impl(conn, course_id))
    }

    /// All topics across courses, ordered by id
    pub fn get_all_topics(&self) -> Result<Vec<Topic>> {
        self.with_connection(get_all_topics_impl)
    }

    /// The first `limit` topics by ascending id
    pub fn get_first_topics(&self, limit: usize) -> Result<Vec<Topic>> {
        self.with_connection(|conn| get_first_topics_impl(conn, limit))
    }

    /// Find a topic by exact name within a course
    pub fn find_topic_by_name(&self, course_id: i64, name: &str) -> Result<Option<Topic>> {
        self.with_connection(|conn| find_topic_by_name_impl(conn, course_id, name))
    }
}

fn create_topic_impl(conn: &Connection, course_id: i64, name: &str) -> Result<Topic> {
    conn.execute(
        "INSERT INTO topics (course_id, name) VALUES (?1, ?2)",
        params![course_id, name],
    )
    .context("Failed to create topic")?;

    Ok(Topic {
        id: conn.last_insert_rowid(),
        course_id,
        name: name.to_string(),
    })
}

fn topic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        course_id: row.get(1)?,
        name: row.get(2)?,
    })
}

pub(crate) fn get_topics_by_course_impl(conn: &Connection, course_id: i64) -> Result<Vec<Topic>> {
    let mut stmt = conn
        .prepare("SELECT id, course_id, name FROM topics WHERE course_id = ?1 ORDER BY id ASC")
        .context("Failed to prepare get_topics_by_course query")?;

    let topics = stmt
        .query_map(params![course_id], topic_from_row)
        .context("Failed to query topics")?;

    topics
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect topics")
}

pub(crate) fn get_all_topics_impl(conn: &Connection) -> Result<Vec<Topic>> {
    let mut stmt = conn
        .prepare("SELECT id, course_id, name FROM topics ORDER BY id ASC")
        .context("Failed to prepare get_all_topics query")?;

    let topics = stmt
        .query_map([], topic_from_row)
        .context("Failed to query topics")?;

    topics
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect topics")
}

fn get_first_topics_impl(conn: &Connection, limit: usize) -> Result<Vec<Topic>> {
    let mut stmt = conn
        .prepare("SELECT id, course_id, name FROM topics ORDER BY id ASC LIMIT ?1")
        .context("Failed to prepare get_first_topics query")?;

    let topics = stmt
        .query_map(params![limit as i64], topic_from_row)
        .context("Failed to query first topics")?;

    topics
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect first topics")
}

pub(crate) fn find_topic_by_name_impl(
    conn: &Connection,
    course_id: i64,
    name: &str,
) -> Result<Option<Topic>> {
    conn.query_row(
        "SELECT id, course_id, name FROM topics WHERE course_id = ?1 AND name = ?2",
        params![course_id, name],
        topic_from_row,
    )
    .optional()
    .context("Failed to query topic by name")
}
