// Courses repository for aula-quiz

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::Course;
use super::DatabaseManager;

impl DatabaseManager {
    /// Create a course and return it with its assigned id
    pub fn create_course(&self, name: &str) -> Result<Course> {
        self.with_connection(|conn| create_course_impl(conn, name))
    }

    /// Look up a course by id
    pub fn get_course(&self, course_id: i64) -> Result<Option<Course>> {
        self.with_connection(|conn| get_course_impl(conn, course_id))
    }
}

fn create_course_impl(conn: &Connection, name: &str) -> Result<Course> {
    let created_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO courses (name, created_at) VALUES (?1, ?2)",
        params![name, created_at],
    )
    .context("Failed to create course")?;

    let id = conn.last_insert_rowid();
    get_course_impl(conn, id)?
        .ok_or_else(|| anyhow::anyhow!("Course {} vanished after insert", id))
}

pub(crate) fn get_course_impl(conn: &Connection, course_id: i64) -> Result<Option<Course>> {
    conn.query_row(
        "SELECT id, name, created_at FROM courses WHERE id = ?1",
        params![course_id],
        |row| {
            Ok(Course {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
    .context("Failed to query course")
}
