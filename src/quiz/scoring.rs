//! Mastery scoring and topic recommendations
//!
//! Questions join to a topic through their quiz: `quizzes.module` carries
//! the topic name and `quizzes.course_id` scopes it to the topic's course.
//! That is the canonical join; questions never reference topics directly.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::models::{Resumen, TopicWithResumenes};
use crate::database::DatabaseManager;
use crate::error::ServiceError;
use crate::quiz::random::{RandomSource, ThreadRngSource};

/// How many low-score topics a recommendation returns at most
const RECOMMENDATION_LIMIT: usize = 2;

/// One topic's mastery result for a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScore {
    pub topic_id: i64,
    pub name: String,
    /// correct answers / total questions, in 0.0..=1.0 (can exceed 1.0 only
    /// if a student answered the same question correctly more than once)
    pub score: f64,
    pub resumenes: Vec<Resumen>,
}

/// Per-student mastery scoring and fallback recommendations
pub struct ScoringEngine {
    db: Arc<DatabaseManager>,
    random: Box<dyn RandomSource>,
}

impl ScoringEngine {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self::with_random_source(db, Box::new(ThreadRngSource))
    }

    pub fn with_random_source(db: Arc<DatabaseManager>, random: Box<dyn RandomSource>) -> Self {
        Self { db, random }
    }

    /// Topics where the student's score falls below `threshold` percent
    ///
    /// Topics without questions are skipped. When more than two qualify,
    /// exactly two are sampled uniformly without replacement.
    pub fn get_low_score_topics(
        &mut self,
        student_id: i64,
        threshold: i64,
    ) -> Result<Vec<TopicScore>, ServiceError> {
        if !(0..=100).contains(&threshold) {
            return Err(ServiceError::Validation(format!(
                "Threshold must be between 0 and 100, got {}",
                threshold
            )));
        }

        let mut low_topics = Vec::new();
        for topic in self.db.get_all_topics()? {
            let (total, correct) =
                self.db
                    .get_topic_answer_stats(student_id, topic.course_id, &topic.name)?;
            if total == 0 {
                continue;
            }

            let score = correct as f64 / total as f64;
            log::info!(
                "Topic '{}': {} questions, {} correct, score {:.3}",
                topic.name,
                total,
                correct,
                score
            );

            if score < threshold as f64 / 100.0 {
                let resumenes = self.db.get_resumenes_by_topic(topic.id)?;
                low_topics.push(TopicScore {
                    topic_id: topic.id,
                    name: topic.name,
                    score,
                    resumenes,
                });
            }
        }

        if low_topics.len() > RECOMMENDATION_LIMIT {
            let picked = self
                .random
                .sample_indices(low_topics.len(), RECOMMENDATION_LIMIT);
            let mut sampled = Vec::with_capacity(RECOMMENDATION_LIMIT);
            for idx in picked {
                sampled.push(low_topics[idx].clone());
            }
            return Ok(sampled);
        }

        Ok(low_topics)
    }

    /// The two topics with smallest id, each with all of their resumen rows
    ///
    /// Fallback recommendation; independent of any student or score.
    pub fn get_two_topic_summaries(&self) -> Result<Vec<TopicWithResumenes>, ServiceError> {
        let topics = self.db.get_first_topics(RECOMMENDATION_LIMIT)?;

        let mut result = Vec::with_capacity(topics.len());
        for topic in topics {
            let resumenes = self.db.get_resumenes_by_topic(topic.id)?;
            result.push(TopicWithResumenes { topic, resumenes });
        }
        Ok(result)
    }
}
