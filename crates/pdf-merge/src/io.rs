//! Document I/O operations

use crate::types::*;
use lopdf::Document;
use std::path::Path;

/// Load a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}

/// Save a document to disk in one final write
pub async fn save_pdf(doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || document_to_bytes(doc)).await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

/// Serialize a document to bytes
pub fn document_to_bytes(mut doc: Document) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    Ok(writer)
}

/// Whether a path exists, treating permission errors as absent
pub(crate) async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
