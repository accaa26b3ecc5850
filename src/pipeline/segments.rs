//! Segment selection
//!
//! Pure filtering and concatenation of transcript segments by time bounds.
//! Everything downstream (detection, generation, summaries) works on the
//! window produced here.

use crate::database::models::Segment;

/// The selected slice of a transcript
#[derive(Debug, Clone, Default)]
pub struct SegmentWindow {
    /// Segments that survived the bounds, input order preserved
    pub segments: Vec<Segment>,
    /// Trimmed per-segment texts, index-parallel with `segments`
    pub texts: Vec<String>,
    /// All trimmed texts joined by single spaces
    pub full_text: String,
}

/// Filter segments by optional time bounds and build the text window
///
/// A segment is kept when `start >= lower` (if given) and `end <= upper`
/// (if given). No bounds means passthrough; bounds that exclude everything
/// yield an empty window.
pub fn select_segments(
    segments: &[Segment],
    lower: Option<f64>,
    upper: Option<f64>,
) -> SegmentWindow {
    let selected: Vec<Segment> = segments
        .iter()
        .filter(|seg| {
            let start_ok = lower.map_or(true, |lo| seg.start >= lo);
            let end_ok = upper.map_or(true, |hi| seg.end <= hi);
            start_ok && end_ok
        })
        .cloned()
        .collect();

    let texts: Vec<String> = selected.iter().map(|s| s.text.trim().to_string()).collect();
    let full_text = texts.join(" ");

    SegmentWindow {
        segments: selected,
        texts,
        full_text,
    }
}
