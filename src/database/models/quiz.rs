// Database models - Quiz, Question and student progress
use anyhow::{anyhow, Context, Result};
use serde::de::{Deserializer, Error as DeError};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A generated quiz: one per topic per generation run
///
/// `module` carries the topic name; `threshold` is the mastery cutoff (0-100)
/// the quiz was generated with. Quizzes are never updated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub module: String,
    pub threshold: i64,
}

/// Ordered letter -> text option mapping for a multiple-choice question
///
/// Letters are A-D and unique. Serializes as a JSON object whose keys come
/// out in letter order, so a serialize/deserialize round trip returns an
/// identical mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuestionOptions {
    entries: Vec<(char, String)>,
}

impl QuestionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text for a letter, replacing any existing entry
    pub fn set(&mut self, letter: char, text: impl Into<String>) {
        let text = text.into();
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| *l == letter) {
            entry.1 = text;
        } else {
            self.entries.push((letter, text));
        }
    }

    pub fn get(&self, letter: char) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, t)| t.as_str())
    }

    pub fn contains(&self, letter: char) -> bool {
        self.entries.iter().any(|(l, _)| *l == letter)
    }

    pub fn entries(&self) -> &[(char, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the JSON object stored in the questions table
    pub fn to_json(&self) -> String {
        let map: BTreeMap<String, &str> = self
            .entries
            .iter()
            .map(|(l, t)| (l.to_string(), t.as_str()))
            .collect();
        serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse the stored JSON object back into an ordered mapping
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<String, String> =
            serde_json::from_str(json).context("Failed to parse question options JSON")?;
        let mut options = Self::new();
        for (key, text) in map {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => options.set(letter, text),
                _ => return Err(anyhow!("Option key '{}' is not a single letter", key)),
            }
        }
        Ok(options)
    }
}

impl Serialize for QuestionOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (letter, text) in &self.entries {
            map.serialize_entry(&letter.to_string(), text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QuestionOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut options = Self::new();
        for (key, text) in map {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => options.set(letter, text),
                _ => return Err(D::Error::custom(format!(
                    "option key '{}' is not a single letter",
                    key
                ))),
            }
        }
        Ok(options)
    }
}

/// A multiple-choice question belonging to a quiz
///
/// Invariant (enforced before persisting an edit): when `correct_answer_key`
/// is non-empty it names one of the present option letters and `answer_text`
/// equals that option's text. Generation is lenient, so both may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub options: QuestionOptions,
    pub correct_answer_key: String,
    pub answer_text: String,
}

/// A quiz with its questions attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizWithQuestions {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// One generation run's quiz, ready to persist
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub module: String,
    pub threshold: i64,
    pub questions: Vec<NewQuestion>,
}

/// A question ready to persist
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub options: QuestionOptions,
    pub correct_answer_key: String,
    pub answer_text: String,
}

/// A student's answer to one question; append-only, `is_correct` is derived
/// at creation and never recomputed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub student_id: i64,
    pub question_id: i64,
    pub response: String,
    pub is_correct: bool,
}

/// Assignment status: pending until the student submits, then completed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Pending,
    Completed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Pending => "pending",
            QuizStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "completed" => QuizStatus::Completed,
            _ => QuizStatus::Pending,
        }
    }
}

/// The assignment record tracking one student's progress on one quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentQuiz {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub status: QuizStatus,
}

/// A pending assignment with its quiz and questions, ready to present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTest {
    pub assignment: StudentQuiz,
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}
