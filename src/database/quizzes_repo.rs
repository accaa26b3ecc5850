// Quizzes repository for aula-quiz
// Quiz and question persistence; a generation run's quizzes land in one
// transaction so an aborted run leaves nothing behind

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{NewQuiz, Question, QuestionOptions, Quiz, QuizWithQuestions};
use super::DatabaseManager;

impl DatabaseManager {
    /// Persist all quizzes and questions of a generation run atomically
    pub fn create_quizzes_batch(
        &self,
        course_id: i64,
        new_quizzes: &[NewQuiz],
    ) -> Result<Vec<QuizWithQuestions>> {
        self.with_connection(|conn| create_quizzes_batch_impl(conn, course_id, new_quizzes))
    }

    /// All quizzes for a course, questions attached
    pub fn get_quizzes_by_course(&self, course_id: i64) -> Result<Vec<QuizWithQuestions>> {
        self.with_connection(|conn| get_quizzes_by_course_impl(conn, course_id))
    }

    /// Look up a quiz by id
    pub fn get_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>> {
        self.with_connection(|conn| get_quiz_impl(conn, quiz_id))
    }

    /// Look up a question by id
    pub fn get_question(&self, question_id: i64) -> Result<Option<Question>> {
        self.with_connection(|conn| get_question_impl(conn, question_id))
    }

    /// Questions of a quiz, ordered by id
    pub fn get_questions_by_quiz(&self, quiz_id: i64) -> Result<Vec<Question>> {
        self.with_connection(|conn| get_questions_by_quiz_impl(conn, quiz_id))
    }

    /// Overwrite a question's text, options and answer; returns rows updated
    pub fn update_question(
        &self,
        question_id: i64,
        question_text: &str,
        options: &QuestionOptions,
        correct_answer_key: &str,
        answer_text: &str,
    ) -> Result<usize> {
        self.with_connection(|conn| {
            update_question_impl(
                conn,
                question_id,
                question_text,
                options,
                correct_answer_key,
                answer_text,
            )
        })
    }

    /// Delete a question; student answers referencing it cascade away
    pub fn delete_question(&self, question_id: i64) -> Result<usize> {
        self.with_connection(|conn| delete_question_impl(conn, question_id))
    }
}

fn create_quizzes_batch_impl(
    conn: &Connection,
    course_id: i64,
    new_quizzes: &[NewQuiz],
) -> Result<Vec<QuizWithQuestions>> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start quiz batch transaction")?;

    let mut created = Vec::with_capacity(new_quizzes.len());

    for new_quiz in new_quizzes {
        tx.execute(
            "INSERT INTO quizzes (course_id, module, threshold) VALUES (?1, ?2, ?3)",
            params![course_id, new_quiz.module, new_quiz.threshold],
        )
        .with_context(|| format!("Failed to insert quiz for module '{}'", new_quiz.module))?;

        let quiz_id = tx.last_insert_rowid();
        let mut questions = Vec::with_capacity(new_quiz.questions.len());

        for question in &new_quiz.questions {
            tx.execute(
                r#"
                INSERT INTO questions (quiz_id, question_text, options_json, correct_answer_key, answer_text)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    quiz_id,
                    question.question_text,
                    question.options.to_json(),
                    question.correct_answer_key,
                    question.answer_text,
                ],
            )
            .context("Failed to insert question")?;

            questions.push(Question {
                id: tx.last_insert_rowid(),
                quiz_id,
                question_text: question.question_text.clone(),
                options: question.options.clone(),
                correct_answer_key: question.correct_answer_key.clone(),
                answer_text: question.answer_text.clone(),
            });
        }

        created.push(QuizWithQuestions {
            quiz: Quiz {
                id: quiz_id,
                course_id,
                module: new_quiz.module.clone(),
                threshold: new_quiz.threshold,
            },
            questions,
        });
    }

    tx.commit().context("Failed to commit quiz batch")?;
    Ok(created)
}

fn quiz_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        course_id: row.get(1)?,
        module: row.get(2)?,
        threshold: row.get(3)?,
    })
}

fn question_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    let options_json: String = row.get(3)?;
    let options = QuestionOptions::from_json(&options_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(Question {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        question_text: row.get(2)?,
        options,
        correct_answer_key: row.get(4)?,
        answer_text: row.get(5)?,
    })
}

pub(crate) fn get_quizzes_by_course_impl(
    conn: &Connection,
    course_id: i64,
) -> Result<Vec<QuizWithQuestions>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, course_id, module, threshold FROM quizzes
             WHERE course_id = ?1 ORDER BY id ASC",
        )
        .context("Failed to prepare get_quizzes_by_course query")?;

    let quizzes = stmt
        .query_map(params![course_id], quiz_from_row)
        .context("Failed to query quizzes")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect quizzes")?;

    quizzes
        .into_iter()
        .map(|quiz| {
            let questions = get_questions_by_quiz_impl(conn, quiz.id)?;
            Ok(QuizWithQuestions { quiz, questions })
        })
        .collect()
}

pub(crate) fn get_quiz_impl(conn: &Connection, quiz_id: i64) -> Result<Option<Quiz>> {
    conn.query_row(
        "SELECT id, course_id, module, threshold FROM quizzes WHERE id = ?1",
        params![quiz_id],
        quiz_from_row,
    )
    .optional()
    .context("Failed to query quiz")
}

pub(crate) fn get_question_impl(conn: &Connection, question_id: i64) -> Result<Option<Question>> {
    conn.query_row(
        "SELECT id, quiz_id, question_text, options_json, correct_answer_key, answer_text
         FROM questions WHERE id = ?1",
        params![question_id],
        question_from_row,
    )
    .optional()
    .context("Failed to query question")
}

pub(crate) fn get_questions_by_quiz_impl(conn: &Connection, quiz_id: i64) -> Result<Vec<Question>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, quiz_id, question_text, options_json, correct_answer_key, answer_text
             FROM questions WHERE quiz_id = ?1 ORDER BY id ASC",
        )
        .context("Failed to prepare get_questions_by_quiz query")?;

    let questions = stmt
        .query_map(params![quiz_id], question_from_row)
        .context("Failed to query questions")?;

    questions
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect questions")
}

fn update_question_impl(
    conn: &Connection,
    question_id: i64,
    question_text: &str,
    options: &QuestionOptions,
    correct_answer_key: &str,
    answer_text: &str,
) -> Result<usize> {
    conn.execute(
        r#"
        UPDATE questions
        SET question_text = ?2, options_json = ?3, correct_answer_key = ?4, answer_text = ?5
        WHERE id = ?1
        "#,
        params![
            question_id,
            question_text,
            options.to_json(),
            correct_answer_key,
            answer_text,
        ],
    )
    .context("Failed to update question")
}

fn delete_question_impl(conn: &Connection, question_id: i64) -> Result<usize> {
    conn.execute("DELETE FROM questions WHERE id = ?1", params![question_id])
        .context("Failed to delete question")
}
