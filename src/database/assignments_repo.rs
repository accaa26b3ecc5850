// Assignments repository for aula-quiz
// StudentQuiz rows, student answers and the per-topic answer counts the
// scoring engine reads

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{QuizStatus, StudentQuiz};
use super::DatabaseManager;

impl DatabaseManager {
    /// Assign a quiz to the given students as pending
    ///
    /// Rows are inserted under UNIQUE(student_id, quiz_id), so students who
    /// already hold this quiz are skipped; returns how many were newly
    /// assigned.
    pub fn insert_assignments(&self, quiz_id: i64, student_ids: &[i64]) -> Result<usize> {
        self.with_connection(|conn| insert_assignments_impl(conn, quiz_id, student_ids))
    }

    /// The student's earliest pending assignment, if any
    pub fn get_pending_assignment(&self, student_id: i64) -> Result<Option<StudentQuiz>> {
        self.with_connection(|conn| get_pending_assignment_impl(conn, student_id))
    }

    /// Look up one assignment row
    pub fn get_student_quiz(&self, student_id: i64, quiz_id: i64) -> Result<Option<StudentQuiz>> {
        self.with_connection(|conn| get_student_quiz_impl(conn, student_id, quiz_id))
    }

    /// Persist a quiz submission as one unit: every answer row plus the
    /// pending -> completed transition; returns how many assignment rows
    /// transitioned
    pub fn record_quiz_completion(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &[(i64, String, bool)],
    ) -> Result<usize> {
        self.with_connection(|conn| record_quiz_completion_impl(conn, student_id, quiz_id, answers))
    }

    /// Total answer rows for a student
    pub fn count_student_answers(&self, student_id: i64) -> Result<i64> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM student_answers WHERE student_id = ?1",
                params![student_id],
                |row| row.get(0),
            )
            .context("Failed to count student answers")
        })
    }

    /// (total questions, correct answers) for one student on one topic,
    /// joining questions to the topic through its quiz module
    pub fn get_topic_answer_stats(
        &self,
        student_id: i64,
        course_id: i64,
        module: &str,
    ) -> Result<(i64, i64)> {
        self.with_connection(|conn| get_topic_answer_stats_impl(conn, student_id, course_id, module))
    }
}

fn insert_assignments_impl(conn: &Connection, quiz_id: i64, student_ids: &[i64]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start assignment transaction")?;

    let mut assigned = 0;
    for student_id in student_ids {
        assigned += tx
            .execute(
                "INSERT OR IGNORE INTO student_quizzes (student_id, quiz_id, status)
                 VALUES (?1, ?2, 'pending')",
                params![student_id, quiz_id],
            )
            .context("Failed to insert assignment")?;
    }

    tx.commit().context("Failed to commit assignments")?;
    Ok(assigned)
}

fn student_quiz_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentQuiz> {
    Ok(StudentQuiz {
        id: row.get(0)?,
        student_id: row.get(1)?,
        quiz_id: row.get(2)?,
        status: QuizStatus::from_str(&row.get::<_, String>(3)?),
    })
}

pub(crate) fn get_pending_assignment_impl(
    conn: &Connection,
    student_id: i64,
) -> Result<Option<StudentQuiz>> {
    // Earliest assignment wins when several are pending
    conn.query_row(
        "SELECT id, student_id, quiz_id, status FROM student_quizzes
         WHERE student_id = ?1 AND status = 'pending'
         ORDER BY id ASC LIMIT 1",
        params![student_id],
        student_quiz_from_row,
    )
    .optional()
    .context("Failed to query pending assignment")
}

fn get_student_quiz_impl(
    conn: &Connection,
    student_id: i64,
    quiz_id: i64,
) -> Result<Option<StudentQuiz>> {
    conn.query_row(
        "SELECT id, student_id, quiz_id, status FROM student_quizzes
         WHERE student_id = ?1 AND quiz_id = ?2",
        params![student_id, quiz_id],
        student_quiz_from_row,
    )
    .optional()
    .context("Failed to query student quiz")
}

fn record_quiz_completion_impl(
    conn: &Connection,
    student_id: i64,
    quiz_id: i64,
    answers: &[(i64, String, bool)],
) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start completion transaction")?;

    for (question_id, response, is_correct) in answers {
        tx.execute(
            "INSERT INTO student_answers (student_id, question_id, response, is_correct)
             VALUES (?1, ?2, ?3, ?4)",
            params![student_id, question_id, response, *is_correct as i32],
        )
        .context("Failed to insert student answer")?;
    }

    let transitioned = tx
        .execute(
            "UPDATE student_quizzes SET status = 'completed'
             WHERE student_id = ?1 AND quiz_id = ?2 AND status = 'pending'",
            params![student_id, quiz_id],
        )
        .context("Failed to complete assignment")?;

    tx.commit().context("Failed to commit quiz completion")?;
    Ok(transitioned)
}

fn get_topic_answer_stats_impl(
    conn: &Connection,
    student_id: i64,
    course_id: i64,
    module: &str,
) -> Result<(i64, i64)> {
    conn.query_row(
        r#"
        SELECT COUNT(DISTINCT q.id),
               COALESCE(SUM(sa.is_correct), 0)
        FROM questions q
        JOIN quizzes z ON z.id = q.quiz_id
        LEFT JOIN student_answers sa
               ON sa.question_id = q.id AND sa.student_id = ?1
        WHERE z.course_id = ?2 AND z.module = ?3
        "#,
        params![student_id, course_id, module],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .context("Failed to query topic answer stats")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewQuestion, NewQuiz, QuestionOptions, UserRole};
    use tempfile::tempdir;

    fn create_test_db() -> DatabaseManager {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let manager = DatabaseManager::new(db_path).unwrap();
        // Keep the temp dir alive for the test's duration; otherwise it is
        // dropped here and the db file is deleted out from under the open
        // connection (SQLite error 1032 on the next write).
        std::mem::forget(dir);
        manager
    }

    fn seed_quiz(db: &DatabaseManager, course_id: i64, module: &str, stems: &[&str]) -> i64 {
        let questions = stems
            .iter()
            .map(|stem| {
                let mut options = QuestionOptions::new();
                options.set('A', "uno");
                options.set('B', "dos");
                NewQuestion {
                    question_text: stem.to_string(),
                    options,
                    correct_answer_key: "A".to_string(),
                    answer_text: "uno".to_string(),
                }
            })
            .collect();

        db.create_quizzes_batch(
            course_id,
            &[NewQuiz {
                module: module.to_string(),
                threshold: 50,
                questions,
            }],
        )
        .unwrap()[0]
            .quiz
            .id
    }

    #[test]
    fn test_assignments_are_idempotent() {
        let db = create_test_db();
        let course = db.create_course("Curso").unwrap();
        let quiz_id = seed_quiz(&db, course.id, "PIB", &["¿Qué es X?"]);
        let ana = db.create_user("Ana", UserRole::Student).unwrap();
        let leo = db.create_user("Leo", UserRole::Student).unwrap();

        assert_eq!(db.insert_assignments(quiz_id, &[ana.id, leo.id]).unwrap(), 2);
        // Repeating the call assigns nobody new
        assert_eq!(db.insert_assignments(quiz_id, &[ana.id, leo.id]).unwrap(), 0);
    }

    #[test]
    fn test_pending_assignment_earliest_first() {
        let db = create_test_db();
        let course = db.create_course("Curso").unwrap();
        let first = seed_quiz(&db, course.id, "PIB", &["¿Qué es X?"]);
        let second = seed_quiz(&db, course.id, "Inflacion", &["¿Qué es Y?"]);
        let ana = db.create_user("Ana", UserRole::Student).unwrap();

        db.insert_assignments(first, &[ana.id]).unwrap();
        db.insert_assignments(second, &[ana.id]).unwrap();

        let pending = db.get_pending_assignment(ana.id).unwrap().unwrap();
        assert_eq!(pending.quiz_id, first);
        assert_eq!(pending.status, QuizStatus::Pending);
    }

    #[test]
    fn test_record_completion_transitions_once() {
        let db = create_test_db();
        let course = db.create_course("Curso").unwrap();
        let quiz_id = seed_quiz(&db, course.id, "PIB", &["¿Qué es X?"]);
        let ana = db.create_user("Ana", UserRole::Student).unwrap();
        db.insert_assignments(quiz_id, &[ana.id]).unwrap();

        let question = &db.get_questions_by_quiz(quiz_id).unwrap()[0];
        let answers = vec![(question.id, "A".to_string(), true)];

        assert_eq!(db.record_quiz_completion(ana.id, quiz_id, &answers).unwrap(), 1);
        let row = db.get_student_quiz(ana.id, quiz_id).unwrap().unwrap();
        assert_eq!(row.status, QuizStatus::Completed);

        // Second submission appends answers but transitions nothing
        assert_eq!(db.record_quiz_completion(ana.id, quiz_id, &answers).unwrap(), 0);
        assert_eq!(db.count_student_answers(ana.id).unwrap(), 2);
    }

    #[test]
    fn test_topic_answer_stats() {
        let db = create_test_db();
        let course = db.create_course("Curso").unwrap();
        let quiz_id = seed_quiz(&db, course.id, "PIB", &["p1", "p2", "p3"]);
        let ana = db.create_user("Ana", UserRole::Student).unwrap();
        db.insert_assignments(quiz_id, &[ana.id]).unwrap();

        let questions = db.get_questions_by_quiz(quiz_id).unwrap();
        let answers = vec![
            (questions[0].id, "A".to_string(), true),
            (questions[1].id, "B".to_string(), false),
            (questions[2].id, "C".to_string(), false),
        ];
        db.record_quiz_completion(ana.id, quiz_id, &answers).unwrap();

        let (total, correct) = db.get_topic_answer_stats(ana.id, course.id, "PIB").unwrap();
        assert_eq!(total, 3);
        assert_eq!(correct, 1);

        // A student with no answers still sees the question count
        let leo = db.create_user("Leo", UserRole::Student).unwrap();
        let (total, correct) = db.get_topic_answer_stats(leo.id, course.id, "PIB").unwrap();
        assert_eq!(total, 3);
        assert_eq!(correct, 0);
    }
}
