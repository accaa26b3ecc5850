//! Quiz assignment state machine
//!
//! Unassigned (no row) -> Pending -> Completed, the last transition exactly
//! once. A submission is one atomic unit: either every answer row lands and
//! the assignment completes, or nothing is written.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::models::PendingTest;
use crate::database::DatabaseManager;
use crate::error::ServiceError;

/// One answer of a quiz submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    /// One of the option letters A-D
    pub response: String,
}

/// Assignment and submission handling
pub struct AssignmentService {
    db: Arc<DatabaseManager>,
}

impl AssignmentService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Assign a quiz to every student-role user as pending
    ///
    /// Students already holding the quiz are skipped; returns the number of
    /// newly assigned students.
    pub fn assign_quiz_to_students(&self, quiz_id: i64) -> Result<usize, ServiceError> {
        self.db
            .get_quiz(quiz_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quiz {} does not exist", quiz_id)))?;

        let students = self.db.get_students()?;
        let student_ids: Vec<i64> = students.iter().map(|s| s.id).collect();
        let assigned = self.db.insert_assignments(quiz_id, &student_ids)?;

        log::info!(
            "Assigned quiz {} to {} of {} students",
            quiz_id,
            assigned,
            student_ids.len()
        );
        Ok(assigned)
    }

    /// Record a student's submission and complete the assignment
    ///
    /// Every question id is resolved before anything is written; one missing
    /// id fails the whole submission. Returns the number of assignment rows
    /// that transitioned to completed.
    pub fn complete_quiz(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &[SubmittedAnswer],
    ) -> Result<usize, ServiceError> {
        for answer in answers {
            if !matches!(answer.response.as_str(), "A" | "B" | "C" | "D") {
                return Err(ServiceError::Validation(format!(
                    "Response '{}' is not one of A, B, C, D",
                    answer.response
                )));
            }
        }

        self.db
            .get_quiz(quiz_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quiz {} does not exist", quiz_id)))?;

        // Resolve all questions first so a bad id aborts before any write
        let mut graded = Vec::with_capacity(answers.len());
        for answer in answers {
            let question = self.db.get_question(answer.question_id)?.ok_or_else(|| {
                ServiceError::NotFound(format!("Question {} does not exist", answer.question_id))
            })?;
            let is_correct = question.correct_answer_key == answer.response;
            graded.push((answer.question_id, answer.response.clone(), is_correct));
        }

        let transitioned = self.db.record_quiz_completion(student_id, quiz_id, &graded)?;
        log::info!(
            "Student {} completed quiz {}: {} answers, {} assignment rows transitioned",
            student_id,
            quiz_id,
            graded.len(),
            transitioned
        );
        Ok(transitioned)
    }

    /// The student's earliest pending assignment with its quiz and questions
    pub fn get_pending_test(&self, student_id: i64) -> Result<Option<PendingTest>, ServiceError> {
        let assignment = match self.db.get_pending_assignment(student_id)? {
            Some(assignment) => assignment,
            None => return Ok(None),
        };

        let quiz = self.db.get_quiz(assignment.quiz_id)?.ok_or_else(|| {
            ServiceError::NotFound(format!("Quiz {} does not exist", assignment.quiz_id))
        })?;
        let questions = self.db.get_questions_by_quiz(quiz.id)?;

        Ok(Some(PendingTest {
            assignment,
            quiz,
            questions,
        }))
    }
}
