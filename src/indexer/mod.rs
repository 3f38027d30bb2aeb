pub mod job;
pub mod loader;

pub use job::{ingest, IngestProgress, IngestReport, ItemOutcome, NoProgress};
pub use loader::{FieldNames, SourceRecord};
