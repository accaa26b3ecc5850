// aula-quiz - transcript-driven quiz generation and mastery scoring
//
// Time-coded transcript segments are filtered to a window, a remote
// text-generation oracle flags which course topics the window discusses,
// multiple-choice questions are generated and parsed per topic, quizzes are
// persisted and assigned to students, and per-topic mastery scores drive
// study recommendations.

pub mod database;
pub mod error;
pub mod llm_engine;
pub mod pipeline;
pub mod quiz;
pub mod state;

pub use error::ServiceError;
pub use state::AppState;

/// Initialize env_logger-backed logging; safe to call more than once
pub fn init_logging() {
    let _ = env_logger::try_init();
}
