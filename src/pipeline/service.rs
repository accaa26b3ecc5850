//! Quiz pipeline orchestration
//!
//! Wires the segment selector, topic detection and question generation to
//! the persistence layer. All oracle work for a run finishes before any row
//! is written; the run's quizzes then land in a single transaction, so an
//! aborted run leaves nothing visible.

use std::sync::Arc;

use crate::database::models::{
    NewQuiz, Question, QuestionOptions, QuizWithQuestions, Resumen, Topic,
};
use crate::database::DatabaseManager;
use crate::error::ServiceError;
use crate::llm_engine::provider::{CompletionRequest, LlmProvider};
use crate::pipeline::detection::detect_topics;
use crate::pipeline::questions::{
    assemble_sub_text, generate_questions, DEFAULT_QUESTIONS_PER_TOPIC,
};
use crate::pipeline::segments::select_segments;
use crate::pipeline::summary::{
    build_summary_prompt, parse_summary_analysis, SummaryAnalysis, SUMMARY_TEMPERATURE,
};

/// Default mastery threshold recorded on generated quizzes
pub const DEFAULT_THRESHOLD: i64 = 50;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifier passed to the oracle
    pub model: String,
    /// Threshold recorded on quizzes when the caller gives none
    pub default_threshold: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "llama3-70b-8192".to_string(),
            default_threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Outcome of a summary-generation run
#[derive(Debug, Clone)]
pub struct SummaryRun {
    pub analysis: SummaryAnalysis,
    pub resumenes: Vec<Resumen>,
}

/// The transcript -> quiz pipeline service
///
/// Handles are injected at construction; `state::AppState` is the single
/// initialization point.
pub struct QuizService {
    db: Arc<DatabaseManager>,
    oracle: Arc<dyn LlmProvider>,
    config: PipelineConfig,
}

impl QuizService {
    pub fn new(db: Arc<DatabaseManager>, oracle: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(db, oracle, PipelineConfig::default())
    }

    pub fn with_config(
        db: Arc<DatabaseManager>,
        oracle: Arc<dyn LlmProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self { db, oracle, config }
    }

    /// Generate quizzes for every topic the oracle finds in the selected
    /// transcript window
    pub async fn create_questions(
        &self,
        course_id: i64,
        from_second: Option<f64>,
        to_second: Option<f64>,
        threshold: Option<i64>,
        questions_per_topic: Option<u32>,
    ) -> Result<Vec<QuizWithQuestions>, ServiceError> {
        let threshold = threshold.unwrap_or(self.config.default_threshold);
        if !(0..=100).contains(&threshold) {
            return Err(ServiceError::Validation(format!(
                "Threshold must be between 0 and 100, got {}",
                threshold
            )));
        }

        let questions_per_topic = questions_per_topic.unwrap_or(DEFAULT_QUESTIONS_PER_TOPIC);
        if questions_per_topic == 0 {
            return Err(ServiceError::Validation(
                "Questions per topic must be at least 1".to_string(),
            ));
        }

        self.db
            .get_course(course_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} does not exist", course_id)))?;

        let segments = self.db.get_segments_by_course(course_id)?;
        if segments.is_empty() {
            return Err(ServiceError::Validation(format!(
                "Course {} has no transcript segments",
                course_id
            )));
        }

        let topics = self.db.get_topics_by_course(course_id)?;
        if topics.is_empty() {
            return Err(ServiceError::Validation(format!(
                "Course {} has no topics to detect",
                course_id
            )));
        }
        let topic_names: Vec<String> = topics.into_iter().map(|t| t.name).collect();

        let window = select_segments(&segments, from_second, to_second);
        if window.segments.is_empty() {
            return Err(ServiceError::Validation(
                "Selected time window contains no segments".to_string(),
            ));
        }

        let analysis = detect_topics(
            self.oracle.as_ref(),
            &self.config.model,
            &window.full_text,
            &topic_names,
        )
        .await?;

        // Every oracle round-trip happens before the first write; a failure
        // on any topic aborts the run with nothing persisted
        let mut new_quizzes = Vec::new();
        for presence in analysis
            .temas_presentes
            .iter()
            .filter(|presence| presence.presente)
        {
            let sub_text = assemble_sub_text(&window.texts, &presence.segmentos);
            let parsed = generate_questions(
                self.oracle.as_ref(),
                &self.config.model,
                &presence.tema,
                &sub_text,
                questions_per_topic,
            )
            .await?;

            new_quizzes.push(NewQuiz {
                module: presence.tema.clone(),
                threshold,
                questions: parsed.into_iter().map(|q| q.into_new_question()).collect(),
            });
        }

        if new_quizzes.is_empty() {
            log::info!("No topics present in the selected window; nothing to persist");
            return Ok(Vec::new());
        }

        let created = self.db.create_quizzes_batch(course_id, &new_quizzes)?;
        log::info!(
            "Created {} quizzes with {} questions for course {}",
            created.len(),
            created.iter().map(|q| q.questions.len()).sum::<usize>(),
            course_id
        );
        Ok(created)
    }

    /// Edit a question's text, options and answer key
    pub fn update_question(
        &self,
        question_id: i64,
        question_text: &str,
        options: &QuestionOptions,
        correct_key: &str,
    ) -> Result<Question, ServiceError> {
        let mut chars = correct_key.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(letter), None) => letter,
            _ => {
                return Err(ServiceError::Validation(format!(
                    "Correct key '{}' is not a single letter",
                    correct_key
                )))
            }
        };
        if !options.contains(letter) {
            return Err(ServiceError::Validation(format!(
                "Correct key '{}' is not among the option letters",
                correct_key
            )));
        }

        let answer_text = options.get(letter).unwrap_or_default().to_string();

        let updated = self.db.update_question(
            question_id,
            question_text,
            options,
            correct_key,
            &answer_text,
        )?;
        if updated == 0 {
            return Err(ServiceError::NotFound(format!(
                "Question {} does not exist",
                question_id
            )));
        }

        self.db
            .get_question(question_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Question {} does not exist", question_id)))
    }

    /// Delete a question; its student answers cascade away
    pub fn delete_question(&self, question_id: i64) -> Result<(), ServiceError> {
        let deleted = self.db.delete_question(question_id)?;
        if deleted == 0 {
            return Err(ServiceError::NotFound(format!(
                "Question {} does not exist",
                question_id
            )));
        }
        Ok(())
    }

    /// All quizzes of a course, questions attached
    pub fn get_quizzes_by_course(
        &self,
        course_id: i64,
    ) -> Result<Vec<QuizWithQuestions>, ServiceError> {
        self.db
            .get_course(course_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} does not exist", course_id)))?;
        Ok(self.db.get_quizzes_by_course(course_id)?)
    }

    /// Create a topic under an existing course
    pub fn create_topic(&self, course_id: i64, name: &str) -> Result<Topic, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "Topic name must not be empty".to_string(),
            ));
        }
        self.db
            .get_course(course_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} does not exist", course_id)))?;
        Ok(self.db.create_topic(course_id, name)?)
    }

    /// All topics of a course, ordered by id
    pub fn get_topics_by_course(&self, course_id: i64) -> Result<Vec<Topic>, ServiceError> {
        self.db
            .get_course(course_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} does not exist", course_id)))?;
        Ok(self.db.get_topics_by_course(course_id)?)
    }

    /// Run the summary analysis over a transcript window and append resumen
    /// rows for every topic the answer names
    pub async fn generate_summary(
        &self,
        course_id: i64,
        from_second: Option<f64>,
        to_second: Option<f64>,
    ) -> Result<SummaryRun, ServiceError> {
        self.db
            .get_course(course_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} does not exist", course_id)))?;

        let segments = self.db.get_segments_by_course(course_id)?;
        if segments.is_empty() {
            return Err(ServiceError::Validation(format!(
                "Course {} has no transcript segments",
                course_id
            )));
        }

        let topics = self.db.get_topics_by_course(course_id)?;
        let topic_names: Vec<String> = topics.iter().map(|t| t.name.clone()).collect();

        let window = select_segments(&segments, from_second, to_second);
        let transcript_json = serde_json::to_string_pretty(&window.segments)
            .map_err(|e| ServiceError::Validation(format!("Cannot serialize segments: {}", e)))?;

        let prompt = build_summary_prompt(&transcript_json, &topic_names);
        let response = self
            .oracle
            .complete(CompletionRequest::new(
                &self.config.model,
                prompt,
                SUMMARY_TEMPERATURE,
            ))
            .await?;

        let analysis = parse_summary_analysis(&response.content)?;

        let mut new_resumenes = Vec::new();
        for generated in &analysis.topics {
            match self.db.find_topic_by_name(course_id, &generated.name)? {
                Some(topic) => {
                    new_resumenes.push(generated.clone().into_new_resumen(topic.id));
                }
                None => {
                    log::warn!(
                        "Summary names topic '{}' which course {} does not have; skipping",
                        generated.name,
                        course_id
                    );
                }
            }
        }

        let resumenes = self.db.create_resumenes_batch(&new_resumenes)?;
        log::info!(
            "Stored {} resumenes for course {}",
            resumenes.len(),
            course_id
        );

        Ok(SummaryRun { analysis, resumenes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_engine::provider::{CompletionResponse, LlmError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Oracle stand-in that replays scripted answers and records requests
    struct MockOracle {
        responses: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockOracle {
        fn new(responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded_requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockOracle {
        fn provider_name(&self) -> &'static str {
            "mock"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(content) => Ok(CompletionResponse {
                    content,
                    model: request.model,
                    prompt_tokens: None,
                    completion_tokens: None,
                }),
                None => Err(LlmError::RequestFailed("Script exhausted".to_string())),
            }
        }
    }

    fn test_db() -> Arc<DatabaseManager> {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        // Leak the tempdir so the database outlives the setup function
        std::mem::forget(dir);
        Arc::new(DatabaseManager::new(db_path).unwrap())
    }

    fn seed_course(db: &DatabaseManager) -> i64 {
        let course = db.create_course("Finanzas").unwrap();
        db.create_topic(course.id, "Inflacion").unwrap();
        db.create_topic(course.id, "PIB").unwrap();
        db.create_segment(course.id, 0.0, 10.0, "la inflación sube los precios")
            .unwrap();
        db.create_segment(course.id, 10.0, 20.0, "el PIB mide la producción")
            .unwrap();
        course.id
    }

    const DETECTION_ANSWER: &str = r#"```json
{
  "temas_presentes": [
    { "tema": "Inflacion", "presente": true, "segmentos": [0] },
    { "tema": "PIB", "presente": false, "segmentos": [] }
  ]
}
```"#;

    const GENERATION_ANSWER: &str = "Pregunta 1:\n¿Qué es la inflación?\nA. subida de precios\nB. bajada de precios\nC. un impuesto\nD. una moneda\nRespuesta correcta: A\n\nPregunta 2:\n¿Qué mide el IPC?\nA. salarios\nB. precios\nC. empleo\nD. exportaciones\nRespuesta correcta: B";

    #[tokio::test]
    async fn test_create_questions_end_to_end() {
        let db = test_db();
        let course_id = seed_course(&db);
        let oracle = MockOracle::new(vec![DETECTION_ANSWER, GENERATION_ANSWER]);
        let service = QuizService::new(db.clone(), oracle.clone());

        let created = service
            .create_questions(course_id, None, None, None, None)
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].quiz.module, "Inflacion");
        assert_eq!(created[0].quiz.threshold, 50);
        assert_eq!(created[0].questions.len(), 2);
        assert_eq!(created[0].questions[0].correct_answer_key, "A");
        assert_eq!(created[0].questions[0].answer_text, "subida de precios");

        // Detection ran cool, generation ran hot
        let requests = oracle.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].temperature, 0.2);
        assert_eq!(requests[1].temperature, 0.7);
        // The generation prompt carries only the referenced segment
        assert!(requests[1].prompt.contains("la inflación sube los precios"));
        assert!(!requests[1].prompt.contains("el PIB mide la producción"));

        // Persisted and readable back
        let stored = service.get_quizzes_by_course(course_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].questions.len(), 2);
    }

    #[tokio::test]
    async fn test_create_questions_aborts_without_partial_writes() {
        let db = test_db();
        let course_id = seed_course(&db);
        // Both topics present but only one generation answer scripted: the
        // second oracle call fails and the whole run must leave no rows
        let detection = r#"{"temas_presentes": [
            {"tema": "Inflacion", "presente": true, "segmentos": [0]},
            {"tema": "PIB", "presente": true, "segmentos": [1]}
        ]}"#;
        let oracle = MockOracle::new(vec![detection, GENERATION_ANSWER]);
        let service = QuizService::new(db.clone(), oracle);

        let result = service
            .create_questions(course_id, None, None, None, None)
            .await;
        assert!(matches!(result, Err(ServiceError::RemoteService(_))));

        assert!(db.get_quizzes_by_course(course_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_questions_parse_error_keeps_raw() {
        let db = test_db();
        let course_id = seed_course(&db);
        let oracle = MockOracle::new(vec!["lo siento, no puedo ayudar con eso"]);
        let service = QuizService::new(db.clone(), oracle);

        let err = service
            .create_questions(course_id, None, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.raw_output(), Some("lo siento, no puedo ayudar con eso"));
        assert!(db.get_quizzes_by_course(course_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_questions_missing_course() {
        let db = test_db();
        let oracle = MockOracle::new(vec![]);
        let service = QuizService::new(db, oracle);

        let err = service
            .create_questions(42, None, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_questions_validates_inputs() {
        let db = test_db();
        let course_id = seed_course(&db);
        let oracle = MockOracle::new(vec![]);
        let service = QuizService::new(db, oracle);

        let err = service
            .create_questions(course_id, None, None, Some(150), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // Bounds that exclude every segment
        let err = service
            .create_questions(course_id, Some(5.0), Some(15.0), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_question_validates_and_recomputes_answer() {
        let db = test_db();
        let course_id = seed_course(&db);
        let oracle = MockOracle::new(vec![DETECTION_ANSWER, GENERATION_ANSWER]);
        let service = QuizService::new(db, oracle);

        let created = service
            .create_questions(course_id, None, None, None, None)
            .await
            .unwrap();
        let question = &created[0].questions[0];

        let mut options = question.options.clone();
        options.set('C', "otra cosa");

        // Key outside the options is rejected
        let err = service
            .update_question(question.id, "¿Nueva?", &options, "Z")
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let updated = service
            .update_question(question.id, "¿Nueva?", &options, "C")
            .unwrap();
        assert_eq!(updated.question_text, "¿Nueva?");
        assert_eq!(updated.correct_answer_key, "C");
        assert_eq!(updated.answer_text, "otra cosa");

        // Unknown question id
        let err = service
            .update_question(99999, "¿?", &options, "C")
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_topic_checks_course_and_name() {
        let db = test_db();
        let course_id = seed_course(&db);
        let oracle = MockOracle::new(vec![]);
        let service = QuizService::new(db, oracle);

        let topic = service.create_topic(course_id, "Tipos de interés").unwrap();
        assert_eq!(topic.course_id, course_id);

        let err = service.create_topic(course_id, "   ").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.create_topic(4242, "Algo").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        // Duplicate name within the course surfaces as a persistence error
        let err = service.create_topic(course_id, "Inflacion").unwrap_err();
        assert!(matches!(err, ServiceError::Persistence(_)));

        let topics = service.get_topics_by_course(course_id).unwrap();
        assert_eq!(topics.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_question_not_found() {
        let db = test_db();
        let oracle = MockOracle::new(vec![]);
        let service = QuizService::new(db, oracle);

        let err = service.delete_question(12345).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_generate_summary_skips_unknown_topics() {
        let db = test_db();
        let course_id = seed_course(&db);

        let answer = r#"{
            "topics": [
                {
                    "name": "Inflacion",
                    "start_time": "0",
                    "end_time": "10.5",
                    "transcript_segment": "la inflación sube los precios",
                    "summary": "Resumen de inflación.",
                    "key_terms": ["IPC"],
                    "related_topics": []
                },
                {
                    "name": "Tema inventado",
                    "summary": "No existe en el curso."
                }
            ]
        }"#;
        let oracle = MockOracle::new(vec![answer]);
        let service = QuizService::new(db.clone(), oracle.clone());

        let run = service
            .generate_summary(course_id, None, None)
            .await
            .unwrap();

        assert_eq!(run.analysis.topics.len(), 2);
        assert_eq!(run.resumenes.len(), 1);
        assert_eq!(run.resumenes[0].end_time, 10.5);

        let topic = db.find_topic_by_name(course_id, "Inflacion").unwrap().unwrap();
        assert_eq!(db.get_resumenes_by_topic(topic.id).unwrap().len(), 1);

        // Summary prompt runs at detection temperature over serialized segments
        let requests = oracle.recorded_requests();
        assert_eq!(requests[0].temperature, 0.2);
        assert!(requests[0].prompt.contains("\"start\": 0.0"));
    }
}
