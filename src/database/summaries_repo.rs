// Summaries repository for aula-quiz
// Resumen rows are append-only; a summary-generation run lands in one
// transaction

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{NewResumen, Resumen};
use super::DatabaseManager;

impl DatabaseManager {
    /// Append all resumen rows of a summary run atomically
    pub fn create_resumenes_batch(&self, new_resumenes: &[NewResumen]) -> Result<Vec<Resumen>> {
        self.with_connection(|conn| create_resumenes_batch_impl(conn, new_resumenes))
    }

    /// All resumen rows for a topic, oldest first
    pub fn get_resumenes_by_topic(&self, topic_id: i64) -> Result<Vec<Resumen>> {
        self.with_connection(|conn| get_resumenes_by_topic_impl(conn, topic_id))
    }
}

fn create_resumenes_batch_impl(
    conn: &Connection,
    new_resumenes: &[NewResumen],
) -> Result<Vec<Resumen>> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start resumen batch transaction")?;

    let mut ids = Vec::with_capacity(new_resumenes.len());
    for resumen in new_resumenes {
        let key_terms_json = serde_json::to_string(&resumen.key_terms)
            .context("Failed to serialize key terms")?;
        let related_topics_json = serde_json::to_string(&resumen.related_topics)
            .context("Failed to serialize related topics")?;

        tx.execute(
            r#"
            INSERT INTO resumenes (topic_id, summary, transcript_segment, start_time, end_time,
                                   key_terms_json, related_topics_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                resumen.topic_id,
                resumen.summary,
                resumen.transcript_segment,
                resumen.start_time,
                resumen.end_time,
                key_terms_json,
                related_topics_json,
            ],
        )
        .context("Failed to insert resumen")?;
        ids.push(tx.last_insert_rowid());
    }

    tx.commit().context("Failed to commit resumen batch")?;

    ids.into_iter()
        .map(|id| {
            get_resumen_impl(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Resumen {} vanished after insert", id))
        })
        .collect()
}

fn resumen_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resumen> {
    let key_terms_json: String = row.get(6)?;
    let related_topics_json: String = row.get(7)?;

    Ok(Resumen {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        summary: row.get(2)?,
        transcript_segment: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        key_terms: serde_json::from_str(&key_terms_json).unwrap_or_default(),
        related_topics: serde_json::from_str(&related_topics_json).unwrap_or_default(),
        created_at: row.get(8)?,
    })
}

fn get_resumen_impl(conn: &Connection, id: i64) -> Result<Option<Resumen>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT id, topic_id, summary, transcript_segment, start_time, end_time,
                key_terms_json, related_topics_json, created_at
         FROM resumenes WHERE id = ?1",
        params![id],
        resumen_from_row,
    )
    .optional()
    .context("Failed to query resumen")
}

pub(crate) fn get_resumenes_by_topic_impl(conn: &Connection, topic_id: i64) -> Result<Vec<Resumen>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, topic_id, summary, transcript_segment, start_time, end_time,
                    key_terms_json, related_topics_json, created_at
             FROM resumenes WHERE topic_id = ?1 ORDER BY id ASC",
        )
        .context("Failed to prepare get_resumenes_by_topic query")?;

    let resumenes = stmt
        .query_map(params![topic_id], resumen_from_row)
        .context("Failed to query resumenes")?;

    resumenes
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect resumenes")
}
