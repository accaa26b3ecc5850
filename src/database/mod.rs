// Database module for aula-quiz
// Provides SQLite persistence for courses, users, topics, segments, quizzes,
// questions, student answers, assignments and topic summaries

pub mod manager;
pub mod migrations;
pub mod models;

pub mod assignments_repo;
pub mod courses_repo;
pub mod quizzes_repo;
pub mod segments_repo;
pub mod summaries_repo;
pub mod topics_repo;
pub mod users_repo;

pub use manager::DatabaseManager;
pub use models::*;
