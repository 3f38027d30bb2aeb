use std::path::Path;

use crate::error::Result;
use crate::rag::semantic_memory::SemanticMemory;
use super::loader::{load_records, FieldNames, SourceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted,
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Receives per-item progress. Purely observational.
pub trait IngestProgress: Sync {
    fn start(&self, _total: usize) {}
    fn item(&self, index: usize, total: usize, outcome: ItemOutcome);
}

pub struct NoProgress;

impl IngestProgress for NoProgress {
    fn item(&self, _index: usize, _total: usize, _outcome: ItemOutcome) {}
}

/// Loads `path` into `collection`, skipping ids that are already stored.
///
/// A timeout anywhere in the batch restarts the whole batch once; already stored
/// items are skipped on the second pass. A second timeout is returned to the caller.
pub async fn ingest(
    memory: &SemanticMemory,
    collection: &str,
    path: &Path,
    fields: &FieldNames,
    progress: &dyn IngestProgress,
) -> Result<IngestReport> {
    match upsert_data(memory, collection, path, fields, progress).await {
        Err(e) if e.is_timeout() => {
            tracing::warn!("Ingestion timed out ({}), retrying the batch once", e);
            upsert_data(memory, collection, path, fields, progress).await
        }
        other => other,
    }
}

async fn already_created(memory: &SemanticMemory, collection: &str, id: &str) -> bool {
    match memory.get(collection, id).await {
        Ok(Some(_)) => true,
        Ok(None) => {
            tracing::debug!(id, "record confirmed absent");
            false
        }
        Err(e) => {
            // Lookup failures are treated as absent, so the record is (re)embedded.
            tracing::warn!(id, error = %e, "existence check failed, treating record as absent");
            false
        }
    }
}

async fn upsert_data(
    memory: &SemanticMemory,
    collection: &str,
    path: &Path,
    fields: &FieldNames,
    progress: &dyn IngestProgress,
) -> Result<IngestReport> {
    let items = load_records(path)?;
    let total = items.len();
    let mut report = IngestReport {
        total,
        ..IngestReport::default()
    };
    progress.start(total);

    for (index, value) in items.iter().enumerate() {
        let record = SourceRecord::from_value(index, value, fields)?;

        let outcome = if already_created(memory, collection, &record.id).await {
            report.skipped += 1;
            ItemOutcome::Skipped
        } else {
            memory
                .save_information(
                    collection,
                    &record.id,
                    &record.text,
                    &record.description,
                    Some(&record.raw),
                )
                .await?;
            report.inserted += 1;
            ItemOutcome::Inserted
        };

        progress.item(index + 1, total, outcome);
    }

    tracing::info!(
        total = report.total,
        inserted = report.inserted,
        skipped = report.skipped,
        "ingestion pass finished"
    );
    Ok(report)
}
