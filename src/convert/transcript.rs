// ABOUTME: Renders speaker-tagged utterance lists into timestamped Markdown
// ABOUTME: Timestamps that fail to parse are dropped from the output

use crate::model::Utterance;
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

pub const TRANSCRIPT_HEADER: &str = "# Transcript\n\n";
pub const EMPTY_TRANSCRIPT: &str = "# Transcript\n\nNo transcript content available.\n";

pub fn render(utterances: &[Utterance]) -> String {
    if utterances.is_empty() {
        return EMPTY_TRANSCRIPT.to_string();
    }

    let mut markdown = String::from(TRANSCRIPT_HEADER);
    for utterance in utterances {
        let timestamp = utterance
            .start_timestamp
            .as_deref()
            .and_then(format_timestamp)
            .map(|ts| format!("[{}]", ts))
            .unwrap_or_default();

        markdown.push_str(&format!(
            "**{}** {}\n\n{}\n\n",
            utterance.source.speaker_label(),
            timestamp,
            utterance.text
        ));
    }
    markdown
}

/// Renders a raw transcript response. Non-array payloads produce the
/// placeholder document.
pub fn render_value(value: &Value) -> String {
    match Utterance::list_from_value(value) {
        Some(utterances) => render(&utterances),
        None => EMPTY_TRANSCRIPT.to_string(),
    }
}

/// Formats an ISO-8601 timestamp as `HH:MM:SS` in the timestamp's own offset.
pub fn format_timestamp(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format("%H:%M:%S").to_string());
    }

    // Offset-less timestamps are read as wall-clock time.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format("%H:%M:%S").to_string())
}
