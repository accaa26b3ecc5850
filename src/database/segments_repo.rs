// Segments repository for aula-quiz
// Transcript segments are written once by ingestion and only ever read back

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::Segment;
use super::DatabaseManager;

impl DatabaseManager {
    /// Insert one transcript segment
    pub fn create_segment(&self, course_id: i64, start: f64, end: f64, text: &str) -> Result<Segment> {
        self.with_connection(|conn| create_segment_impl(conn, course_id, start, end, text))
    }

    /// Insert a batch of (start, end, text) segments for a course
    pub fn create_segments_batch(&self, course_id: i64, segments: &[(f64, f64, String)]) -> Result<()> {
        self.with_connection(|conn| create_segments_batch_impl(conn, course_id, segments))
    }

    /// All segments for a course, ordered by start time ascending
    pub fn get_segments_by_course(&self, course_id: i64) -> Result<Vec<Segment>> {
        self.with_connection(|conn| get_segments_by_course_impl(conn, course_id))
    }
}

fn create_segment_impl(
    conn: &Connection,
    course_id: i64,
    start: f64,
    end: f64,
    text: &str,
) -> Result<Segment> {
    conn.execute(
        "INSERT INTO segments (course_id, start_time, end_time, text) VALUES (?1, ?2, ?3, ?4)",
        params![course_id, start, end, text],
    )
    .context("Failed to insert segment")?;

    Ok(Segment {
        id: conn.last_insert_rowid(),
        course_id,
        start,
        end,
        text: text.to_string(),
    })
}

fn create_segments_batch_impl(
    conn: &Connection,
    course_id: i64,
    segments: &[(f64, f64, String)],
) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start segment batch transaction")?;

    for (start, end, text) in segments {
        tx.execute(
            "INSERT INTO segments (course_id, start_time, end_time, text) VALUES (?1, ?2, ?3, ?4)",
            params![course_id, start, end, text],
        )
        .context("Failed to insert segment in batch")?;
    }

    tx.commit().context("Failed to commit segment batch")?;
    Ok(())
}

pub(crate) fn get_segments_by_course_impl(conn: &Connection, course_id: i64) -> Result<Vec<Segment>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, course_id, start_time, end_time, text
             FROM segments WHERE course_id = ?1 ORDER BY start_time ASC",
        )
        .context("Failed to prepare get_segments_by_course query")?;

    let segments = stmt
        .query_map(params![course_id], |row| {
            Ok(Segment {
                id: row.get(0)?,
                course_id: row.get(1)?,
                start: row.get(2)?,
                end: row.get(3)?,
                text: row.get(4)?,
            })
        })
        .context("Failed to query segments")?;

    segments
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect segments")
}
