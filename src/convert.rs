// ABOUTME: Markdown renderers for Granola notes and transcripts
// ABOUTME: Both converters are total: malformed input yields text, never an error

pub mod document;
pub mod transcript;
