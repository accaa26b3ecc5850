//! Summary generation
//!
//! Runs the analysis prompt over a segment window and turns the oracle's
//! JSON answer into Resumen rows. Topic names in the answer are matched
//! against the course's topics by exact name; unknown names are skipped.

use serde::{Deserialize, Serialize};

use crate::database::models::NewResumen;
use crate::error::ServiceError;
use crate::pipeline::detection::extract_json;

/// Sampling temperature for summary prompts, same as detection
pub const SUMMARY_TEMPERATURE: f32 = 0.2;

/// One generated topic summary as returned by the oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTopicSummary {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub transcript_segment: String,
    /// Timestamps arrive as strings like "12.5" or "12:30"; coerced leniently
    #[serde(default)]
    pub start_time: Option<serde_json::Value>,
    #[serde(default)]
    pub end_time: Option<serde_json::Value>,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

impl GeneratedTopicSummary {
    /// Persistence payload for a matched topic id
    pub fn into_new_resumen(self, topic_id: i64) -> NewResumen {
        NewResumen {
            topic_id,
            summary: self.summary,
            transcript_segment: self.transcript_segment,
            start_time: coerce_time(self.start_time.as_ref()),
            end_time: coerce_time(self.end_time.as_ref()),
            key_terms: self.key_terms,
            related_topics: self.related_topics,
        }
    }
}

/// The oracle's full summary answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryAnalysis {
    #[serde(default)]
    pub topics: Vec<GeneratedTopicSummary>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Coerce a JSON timestamp into seconds: numbers pass through, strings keep
/// their leading float ("12:30" -> 12.0), anything else is 0
fn coerce_time(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => parse_leading_float(s),
        _ => 0.0,
    }
}

fn parse_leading_float(s: &str) -> f64 {
    let trimmed = s.trim();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in trimmed.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '-' if i == 0 => end = i + 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

/// Build the analysis prompt over the serialized segment window
pub fn build_summary_prompt(transcript_json: &str, topic_names: &[String]) -> String {
    let topic_list = topic_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n");
    let exact_names = topic_names.join(", ");

    format!(
        r#"Por favor, analiza este archivo de transcripción y extrae información sobre TODOS los siguientes temas que están PRESENTES en la transcripción. Es OBLIGATORIO buscar y analizar cada uno de estos temas:

{topic_list}

Para cada uno de estos temas, debes:

1. Identificar el segmento COMPLETO donde se explica el tema, desde el inicio de su introducción hasta el final de su explicación completa
2. Extraer el segmento completo de la transcripción para ese tema, incluyendo toda la discusión relacionada
3. Generar un resumen conciso pero completo (4-5 oraciones) en español
4. Formatear todo en un JSON estructurado con el siguiente esquema:

{{
  "topics": [
    {{
      "name": "[DEBE ser EXACTAMENTE uno de los siguientes temas, sin modificar: {exact_names}]",
      "start_time": "[marca de tiempo del inicio de la explicación como esta en la transcripción]",
      "end_time": "[marca de tiempo del final de la explicación como esta en la transcripción]",
      "transcript_segment": "[texto completo que cubre toda la explicación del tema]",
      "summary": "[resumen conciso de los puntos clave en español]",
      "key_terms": ["[término1]", "[término2]"],
      "related_topics": ["[tema relacionado1]", "[tema relacionado2]"]
    }}
  ]
}}

INSTRUCCIONES IMPORTANTES:
1. DEBES analizar TODOS los temas de la lista proporcionada
2. El campo "name" DEBE ser EXACTAMENTE uno de los siguientes (copiar y pegar el nombre exacto): {exact_names}
3. TODOS los resúmenes deben estar en español

Contenido de la transcripción:
{transcript_json}"#
    )
}

/// Parse a raw oracle answer into a `SummaryAnalysis`
pub fn parse_summary_analysis(raw: &str) -> Result<SummaryAnalysis, ServiceError> {
    let json = extract_json(raw)?;
    serde_json::from_str(&json).map_err(|e| {
        ServiceError::parse(format!("Oracle answer is not valid summary JSON: {}", e), raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_analysis() {
        let raw = r#"{
            "topics": [
                {
                    "name": "Inflacion",
                    "start_time": "12.5",
                    "end_time": "80",
                    "transcript_segment": "hablamos de inflación",
                    "summary": "La inflación sube los precios.",
                    "key_terms": ["IPC"],
                    "related_topics": ["PIB"]
                }
            ],
            "metadata": {"transcript_title": "Curso"}
        }"#;

        let analysis = parse_summary_analysis(raw).unwrap();
        assert_eq!(analysis.topics.len(), 1);

        let resumen = analysis.topics[0].clone().into_new_resumen(7);
        assert_eq!(resumen.topic_id, 7);
        assert_eq!(resumen.start_time, 12.5);
        assert_eq!(resumen.end_time, 80.0);
        assert_eq!(resumen.key_terms, vec!["IPC"]);
    }

    #[test]
    fn test_coerce_time_variants() {
        use serde_json::json;
        assert_eq!(coerce_time(Some(&json!(3.25))), 3.25);
        assert_eq!(coerce_time(Some(&json!("12:30"))), 12.0);
        assert_eq!(coerce_time(Some(&json!("  7.5 "))), 7.5);
        assert_eq!(coerce_time(Some(&json!("sin número"))), 0.0);
        assert_eq!(coerce_time(None), 0.0);
    }

    #[test]
    fn test_missing_fields_default() {
        let raw = r#"{"topics": [{"name": "PIB"}]}"#;
        let analysis = parse_summary_analysis(raw).unwrap();
        let topic = &analysis.topics[0];
        assert_eq!(topic.summary, "");
        assert!(topic.key_terms.is_empty());
        assert_eq!(coerce_time(topic.start_time.as_ref()), 0.0);
    }

    #[test]
    fn test_prompt_names_every_topic() {
        let topics = vec!["Inflacion".to_string(), "PIB".to_string()];
        let prompt = build_summary_prompt("[]", &topics);
        assert!(prompt.contains("1. Inflacion"));
        assert!(prompt.contains("2. PIB"));
        assert!(prompt.contains("Inflacion, PIB"));
    }
}
