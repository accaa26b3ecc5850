// Database migrations for aula-quiz
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version
const SCHEMA_VERSION: i32 = 4;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
    }

    if current_version < 4 {
        migrate_v4(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Initial schema: courses, users, topics, transcript segments (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Courses table: everything else hangs off a course
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Users table: students receive quiz assignments
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'student'
        );

        -- Topics table: named subjects per course
        CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
            UNIQUE (course_id, name)
        );

        -- Transcript segments: immutable time-coded slices, read start-ascending
        CREATE TABLE IF NOT EXISTS segments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            start_time REAL NOT NULL,
            end_time REAL NOT NULL,
            text TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_segments_course_start
        ON segments(course_id, start_time);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
    "#,
    )
    .context("Failed to run migration v1")?;

    log::info!("Migration v1 completed successfully");
    Ok(())
}

/// Quizzes and questions (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2 - Quizzes and questions");

    conn.execute_batch(
        r#"
        -- Quizzes: one per topic per generation run, module carries the topic name
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            module TEXT NOT NULL,
            threshold INTEGER NOT NULL DEFAULT 50,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
            UNIQUE (course_id, module)
        );

        -- Questions: options stored as an ordered letter->text JSON object
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id INTEGER NOT NULL,
            question_text TEXT NOT NULL,
            options_json TEXT NOT NULL DEFAULT '{}',
            correct_answer_key TEXT NOT NULL DEFAULT '',
            answer_text TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_questions_quiz ON questions(quiz_id);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
    "#,
    )
    .context("Failed to run migration v2")?;

    log::info!("Migration v2 completed successfully");
    Ok(())
}

/// Student answers and assignments (version 3)
fn migrate_v3(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v3 - Student answers and assignments");

    conn.execute_batch(
        r#"
        -- Student answers: append-only, is_correct derived at insert
        CREATE TABLE IF NOT EXISTS student_answers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            response TEXT NOT NULL,
            is_correct INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_student_answers_student
        ON student_answers(student_id, question_id);

        -- Assignments: one row per student per quiz, pending -> completed once
        CREATE TABLE IF NOT EXISTS student_quizzes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            quiz_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE,
            UNIQUE (student_id, quiz_id)
        );

        CREATE INDEX IF NOT EXISTS idx_student_quizzes_pending
        ON student_quizzes(student_id, status);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (3);
    "#,
    )
    .context("Failed to run migration v3")?;

    log::info!("Migration v3 completed successfully");
    Ok(())
}

/// Topic summaries (version 4)
fn migrate_v4(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v4 - Topic summaries");

    conn.execute_batch(
        r#"
        -- Resumenes: append-only topic summaries with their transcript excerpt
        CREATE TABLE IF NOT EXISTS resumenes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic_id INTEGER NOT NULL,
            summary TEXT NOT NULL,
            transcript_segment TEXT NOT NULL DEFAULT '',
            start_time REAL NOT NULL DEFAULT 0,
            end_time REAL NOT NULL DEFAULT 0,
            key_terms_json TEXT NOT NULL DEFAULT '[]',
            related_topics_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_resumenes_topic ON resumenes(topic_id);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (4);
    "#,
    )
    .context("Failed to run migration v4")?;

    log::info!("Migration v4 completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();

        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        // Re-running is a no-op
        run_migrations(&conn).unwrap();

        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('courses','users','topics','segments','quizzes','questions',
                  'student_answers','student_quizzes','resumenes')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 9);
    }
}
