// State management for aula-quiz
//
// The single initialization point: the database and oracle handles are
// created here and injected into every service; nothing reaches for a
// global.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::database::DatabaseManager;
use crate::llm_engine::provider::LlmProvider;
use crate::pipeline::{PipelineConfig, QuizService};
use crate::quiz::{AssignmentService, ScoringEngine};

pub struct AppState {
    /// Database manager for SQLite persistence
    database: Arc<DatabaseManager>,
    /// Text-generation oracle used by detection, generation and summaries
    oracle: Arc<dyn LlmProvider>,
    pipeline_config: PipelineConfig,
}

impl AppState {
    /// Open the database at `db_path` and wire up the given oracle
    pub fn new(db_path: PathBuf, oracle: Arc<dyn LlmProvider>) -> Result<Self> {
        Self::with_pipeline_config(db_path, oracle, PipelineConfig::default())
    }

    pub fn with_pipeline_config(
        db_path: PathBuf,
        oracle: Arc<dyn LlmProvider>,
        pipeline_config: PipelineConfig,
    ) -> Result<Self> {
        let database = Arc::new(DatabaseManager::new(db_path)?);
        log::info!(
            "App state initialized with oracle provider '{}'",
            oracle.provider_name()
        );

        Ok(Self {
            database,
            oracle,
            pipeline_config,
        })
    }

    pub fn database(&self) -> Arc<DatabaseManager> {
        self.database.clone()
    }

    pub fn oracle(&self) -> Arc<dyn LlmProvider> {
        self.oracle.clone()
    }

    /// The transcript -> quiz pipeline service
    pub fn quiz_service(&self) -> QuizService {
        QuizService::with_config(
            self.database.clone(),
            self.oracle.clone(),
            self.pipeline_config.clone(),
        )
    }

    /// Assignment and submission handling
    pub fn assignment_service(&self) -> AssignmentService {
        AssignmentService::new(self.database.clone())
    }

    /// Mastery scoring and recommendations
    pub fn scoring_engine(&self) -> ScoringEngine {
        ScoringEngine::new(self.database.clone())
    }
}
