//! Topic presence detection
//!
//! Builds the detection prompt, calls the oracle and extracts its JSON
//! answer. The parsed structure is returned verbatim; topic names coming
//! back from the oracle are not cross-checked against the input list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::llm_engine::provider::{CompletionRequest, LlmProvider};

/// Sampling temperature for detection prompts
pub const DETECTION_TEMPERATURE: f32 = 0.2;

static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("Invalid regex"));

/// One topic's presence verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPresence {
    pub tema: String,
    pub presente: bool,
    /// Indices into the per-segment text array of the analyzed window
    #[serde(default)]
    pub segmentos: Vec<usize>,
}

/// The oracle's full detection answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicAnalysis {
    pub temas_presentes: Vec<TopicPresence>,
}

/// Build the deterministic detection prompt: topics enumerated 1-based,
/// answer constrained to a single JSON object
pub fn build_detection_prompt(full_text: &str, topic_names: &[String]) -> String {
    let topic_list = topic_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
Analiza el siguiente texto y determina qué temas de la lista están presentes en el texto.

Lista de temas:
{topic_list}

Texto:
{full_text}

Devuelve un JSON:
{{
  "temas_presentes": [
    {{ "tema": "nombre del tema", "presente": true/false, "segmentos": [0, 1, 2] }}
  ]
}}"#
    )
}

/// Pull the JSON payload out of a raw oracle answer
///
/// Tries a fenced ```json block first, then falls back to the substring
/// between the first `{` and the last `}`.
pub fn extract_json(raw: &str) -> Result<String, ServiceError> {
    if let Some(caps) = JSON_BLOCK_RE.captures(raw) {
        if let Some(m) = caps.get(1) {
            return Ok(m.as_str().to_string());
        }
    }

    let first = raw.find('{');
    let last = raw.rfind('}');
    match (first, last) {
        (Some(start), Some(end)) if start < end => Ok(raw[start..=end].to_string()),
        _ => Err(ServiceError::parse(
            "Oracle answer contains no JSON object",
            raw,
        )),
    }
}

/// Parse a raw oracle answer into a `TopicAnalysis`
pub fn parse_topic_analysis(raw: &str) -> Result<TopicAnalysis, ServiceError> {
    let json = extract_json(raw)?;
    serde_json::from_str(&json).map_err(|e| {
        ServiceError::parse(format!("Oracle answer is not valid detection JSON: {}", e), raw)
    })
}

/// Run detection over the window's concatenated text
pub async fn detect_topics(
    oracle: &dyn LlmProvider,
    model: &str,
    full_text: &str,
    topic_names: &[String],
) -> Result<TopicAnalysis, ServiceError> {
    let prompt = build_detection_prompt(full_text, topic_names);
    log::info!(
        "Detecting presence of {} topics over {} chars of transcript",
        topic_names.len(),
        full_text.len()
    );

    let response = oracle
        .complete(CompletionRequest::new(model, prompt, DETECTION_TEMPERATURE))
        .await?;

    parse_topic_analysis(&response.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_enumerates_topics_one_based() {
        let topics = vec!["Inflacion".to_string(), "PIB".to_string()];
        let prompt = build_detection_prompt("algo de texto", &topics);

        assert!(prompt.contains("1. Inflacion"));
        assert!(prompt.contains("2. PIB"));
        assert!(prompt.contains("temas_presentes"));
        // Deterministic: same inputs, same prompt
        assert_eq!(prompt, build_detection_prompt("algo de texto", &topics));
    }

    #[test]
    fn test_extract_json_fenced_block() {
        let raw = "Claro, aquí está:\n```json\n{\"temas_presentes\": []}\n```\nEspero que sirva.";
        let json = extract_json(raw).unwrap();
        assert_eq!(json, "{\"temas_presentes\": []}");
    }

    #[test]
    fn test_extract_json_brace_fallback() {
        let raw = "El análisis es {\"temas_presentes\": []} según el texto.";
        let json = extract_json(raw).unwrap();
        assert_eq!(json, "{\"temas_presentes\": []}");
    }

    #[test]
    fn test_extract_json_none_found() {
        let err = extract_json("no hay nada estructurado aquí").unwrap_err();
        match err {
            ServiceError::Parse { raw, .. } => {
                assert_eq!(raw, "no hay nada estructurado aquí");
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_topic_analysis() {
        let raw = r#"```json
{
  "temas_presentes": [
    { "tema": "Inflacion", "presente": true, "segmentos": [0, 2] },
    { "tema": "PIB", "presente": false, "segmentos": [] }
  ]
}
```"#;
        let analysis = parse_topic_analysis(raw).unwrap();
        assert_eq!(analysis.temas_presentes.len(), 2);
        assert!(analysis.temas_presentes[0].presente);
        assert_eq!(analysis.temas_presentes[0].segmentos, vec![0, 2]);
        assert!(!analysis.temas_presentes[1].presente);
    }

    #[test]
    fn test_parse_keeps_unknown_topic_names() {
        // The detector trusts the oracle verbatim
        let raw = r#"{"temas_presentes": [{"tema": "Algo inventado", "presente": true, "segmentos": [0]}]}"#;
        let analysis = parse_topic_analysis(raw).unwrap();
        assert_eq!(analysis.temas_presentes[0].tema, "Algo inventado");
    }

    #[test]
    fn test_parse_invalid_json_keeps_raw() {
        let raw = "{\"temas_presentes\": [truncado";
        let err = parse_topic_analysis(raw).unwrap_err();
        assert_eq!(err.raw_output(), Some(raw));
    }

    #[test]
    fn test_missing_segmentos_defaults_empty() {
        let raw = r#"{"temas_presentes": [{"tema": "PIB", "presente": true}]}"#;
        let analysis = parse_topic_analysis(raw).unwrap();
        assert!(analysis.temas_presentes[0].segmentos.is_empty());
    }
}
