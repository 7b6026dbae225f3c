// ABOUTME: Fetch-convert-persist pipeline over every Granola document
// ABOUTME: A failing document is logged and skipped, the batch keeps going

use crate::{
    api::ApiClient,
    convert::{document, transcript},
    model::{Document, SyncRecord, Utterance},
    storage::{write_atomic, write_json, Paths},
    Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
}

pub fn sync_all(client: &ApiClient, paths: &Paths) -> Result<SyncReport> {
    info!("Fetching documents from Granola API");
    let docs = client.list_documents()?;
    info!("Successfully fetched {} documents from Granola", docs.len());

    let mut report = SyncReport {
        total: docs.len(),
        ..Default::default()
    };

    if docs.is_empty() {
        warn!("No documents found in the API response");
        return Ok(report);
    }

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} docs")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    for raw in docs {
        let doc = Document::from_value(raw);
        info!("Processing document: {} (ID: {})", doc.title, doc.id);

        match sync_document(client, paths, &doc) {
            Ok(()) => {
                info!("Successfully processed document: {}", doc.title);
                report.synced += 1;
            }
            Err(e) => {
                error!(
                    "Error processing document '{}' (ID: {}): {}",
                    doc.title, doc.id, e
                );
                report.failed += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "synced {} docs ({} ok, {} failed)",
        report.total, report.synced, report.failed
    ));
    info!(
        "Sync complete. {} documents processed and saved to '{}'",
        report.synced,
        paths.output_dir.display()
    );

    Ok(report)
}

/// Writes one document's folder. Transcript fetch failures are logged and
/// treated as a missing transcript; write failures fail the document.
pub fn sync_document(client: &ApiClient, paths: &Paths, doc: &Document) -> Result<()> {
    let out = paths.document(&doc.id);
    out.ensure_dir()?;
    debug!("Created folder: {}", out.dir.display());

    write_json(&out.document_json, &doc.raw)?;
    debug!("Saved raw document JSON to: {}", out.document_json.display());

    let transcript_raw = match client.get_transcript(&doc.id) {
        Ok(value) => value.filter(has_content),
        Err(e) => {
            error!("Error fetching transcript for {}: {}", doc.id, e);
            None
        }
    };

    if let Some(raw) = &transcript_raw {
        write_json(&out.transcript_json, raw)?;
        debug!("Saved raw transcript JSON to: {}", out.transcript_json.display());
    }

    let utterances = transcript_raw.as_ref().and_then(Utterance::list_from_value);
    let record = SyncRecord::derive(doc, utterances.as_deref());
    write_json(&out.metadata_json, &record)?;
    debug!("Saved metadata to: {}", out.metadata_json.display());

    match doc.panel_content() {
        Some(content) => {
            let summary = document::render_summary(&doc.title, content);
            write_atomic(&out.resume_md, summary.as_bytes())?;
            debug!("Saved resume to: {}", out.resume_md.display());
        }
        None => warn!("No content found for resume.md in document: {}", doc.title),
    }

    match &transcript_raw {
        Some(raw) => {
            let markdown = transcript::render_value(raw);
            write_atomic(&out.transcript_md, markdown.as_bytes())?;
            debug!("Saved transcript markdown to: {}", out.transcript_md.display());
        }
        None => warn!("No transcript available for document: {}", doc.title),
    }

    Ok(())
}

/// Null and empty payloads count as "no transcript".
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
