//! Question generation and parsing
//!
//! Requests raw multiple-choice question text from the oracle per present
//! topic, then parses it with a lenient line-oriented pass: blocks split on
//! "Pregunta <n>:", options recognized only by their "A. ".."D. " prefixes,
//! the answer key by its "Respuesta correcta: X" line. Missing pieces become
//! empty strings instead of failing the block.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::models::{NewQuestion, QuestionOptions};
use crate::error::ServiceError;
use crate::llm_engine::provider::{CompletionRequest, LlmProvider};

/// Sampling temperature for generation prompts; runs hotter than detection
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Questions requested per topic when the caller does not say otherwise
pub const DEFAULT_QUESTIONS_PER_TOPIC: u32 = 3;

static QUESTION_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Pregunta \d+:").expect("Invalid regex"));

static CORRECT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Respuesta correcta: ([A-D])").expect("Invalid regex"));

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// A question as parsed out of raw generated text
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuestion {
    pub stem: String,
    pub options: QuestionOptions,
    /// Empty when the block had no recognizable answer line
    pub correct_key: String,
}

impl ParsedQuestion {
    /// The text of the correct option; empty when the key is absent or does
    /// not name a present option
    pub fn answer_text(&self) -> String {
        self.correct_key
            .chars()
            .next()
            .and_then(|letter| self.options.get(letter))
            .unwrap_or_default()
            .to_string()
    }

    /// Convert into the persistence payload
    pub fn into_new_question(self) -> NewQuestion {
        let answer_text = self.answer_text();
        NewQuestion {
            question_text: self.stem,
            options: self.options,
            correct_answer_key: self.correct_key,
            answer_text,
        }
    }
}

/// Build the generation prompt for one topic's sub-text
pub fn build_question_prompt(topic: &str, sub_text: &str, count: u32) -> String {
    format!(
        "Basándote en el siguiente texto sobre el tema \"{topic}\", genera {count} preguntas \
         de opción múltiple (4 opciones cada una).\n\n\
         Pregunta 1:...\nA. ...\n...\nRespuesta correcta: ...\n\n\
         Texto:\n{sub_text}"
    )
}

/// Join the texts of the referenced segment indices into the topic sub-text
///
/// Indices outside the window are skipped; the oracle occasionally points at
/// segments it was never shown.
pub fn assemble_sub_text(texts: &[String], indices: &[usize]) -> String {
    let mut parts = Vec::with_capacity(indices.len());
    for &idx in indices {
        match texts.get(idx) {
            Some(text) => parts.push(text.as_str()),
            None => log::warn!(
                "Oracle referenced segment index {} outside the window of {}",
                idx,
                texts.len()
            ),
        }
    }
    parts.join(" ")
}

/// Parse raw generated text into ordered question records
pub fn parse_question_blocks(raw: &str) -> Vec<ParsedQuestion> {
    QUESTION_SPLIT_RE
        .split(raw)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(parse_block)
        .collect()
}

fn parse_block(block: &str) -> ParsedQuestion {
    let stem = block.lines().next().unwrap_or("").trim().to_string();

    let mut options = QuestionOptions::new();
    let mut correct_key = String::new();

    for line in block.lines() {
        let line = line.trim();
        for letter in OPTION_LETTERS {
            if let Some(rest) = line.strip_prefix(&format!("{}. ", letter)) {
                options.set(letter, rest.trim());
            }
        }
        if let Some(caps) = CORRECT_KEY_RE.captures(line) {
            correct_key = caps[1].to_string();
        }
    }

    if options.len() < OPTION_LETTERS.len() {
        log::warn!(
            "Question block '{}' has only {} of 4 options",
            stem,
            options.len()
        );
    }
    if correct_key.is_empty() {
        log::warn!("Question block '{}' has no answer key", stem);
    }

    ParsedQuestion {
        stem,
        options,
        correct_key,
    }
}

/// Ask the oracle for `count` questions about one topic and parse the answer
pub async fn generate_questions(
    oracle: &dyn LlmProvider,
    model: &str,
    topic: &str,
    sub_text: &str,
    count: u32,
) -> Result<Vec<ParsedQuestion>, ServiceError> {
    let prompt = build_question_prompt(topic, sub_text, count);
    log::info!("Generating {} questions for topic '{}'", count, topic);

    let response = oracle
        .complete(CompletionRequest::new(model, prompt, GENERATION_TEMPERATURE))
        .await?;

    Ok(parse_question_blocks(&response.content))
}
