pub mod error;
pub mod loader;
pub mod splitter;
pub mod types;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

pub use error::DocumentError;
pub use loader::{PdfLoader, TextLoader};
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, Document, DocumentMetadata, fingerprint};

/// Default maximum document size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        source: &str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Document, DocumentError>> + Send + '_>>;

    fn supported_extensions(&self) -> &[&str];
}

fn extension(source: &str) -> String {
    Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Pick a loader by content sniffing first, then by file extension.
///
/// # Errors
///
/// Returns `UnsupportedFormat` when neither the bytes nor the name identify a known format.
pub fn loader_for(source: &str, bytes: &[u8]) -> Result<Box<dyn DocumentLoader>, DocumentError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(Box::new(PdfLoader));
    }
    let ext = extension(source);
    if TextLoader.supported_extensions().contains(&ext.as_str()) {
        return Ok(Box::new(TextLoader));
    }
    if ext == "pdf" {
        return Err(DocumentError::Pdf("missing %PDF- header".into()));
    }
    Err(DocumentError::UnsupportedFormat(source.to_owned()))
}

/// Load a document from raw bytes, enforcing the size limit and rejecting empty text.
///
/// # Errors
///
/// Returns an error if the document is too large, in an unknown format, unreadable,
/// or has no extractable text.
pub async fn load_document(
    source: &str,
    bytes: Vec<u8>,
    max_file_size: u64,
) -> Result<Document, DocumentError> {
    let size = bytes.len() as u64;
    if size > max_file_size {
        return Err(DocumentError::FileTooLarge(size));
    }
    let loader = loader_for(source, &bytes)?;
    let document = loader.load(source, bytes).await?;
    if document.content.trim().is_empty() {
        return Err(DocumentError::NoText);
    }
    Ok(document)
}

/// Read a file from disk for indexing. Returns the bytes and the file name.
///
/// # Errors
///
/// Returns an error if the file cannot be read or exceeds `max_file_size`.
pub async fn read_file(path: &Path, max_file_size: u64) -> Result<(Vec<u8>, String), DocumentError> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.len() > max_file_size {
        return Err(DocumentError::FileTooLarge(meta.len()));
    }
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or_else(|| path.display().to_string(), str::to_owned);
    Ok((bytes, name))
}
