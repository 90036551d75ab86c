use std::future::Future;
use std::pin::Pin;

use super::super::{Document, DocumentError, DocumentLoader, DocumentMetadata, fingerprint};

pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(
        &self,
        source: &str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Document, DocumentError>> + Send + '_>> {
        let source = source.to_owned();
        Box::pin(async move {
            let metadata = DocumentMetadata {
                fingerprint: fingerprint(&bytes),
                size: bytes.len() as u64,
                source,
                content_type: "application/pdf".to_owned(),
            };

            // pdf-extract may panic on malformed input; a panicked task surfaces as JoinError.
            let content = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| DocumentError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| DocumentError::Pdf(format!("PDF extraction aborted: {e}")))??;

            tracing::debug!(
                source = %metadata.source,
                chars = content.chars().count(),
                "extracted PDF text"
            );
            Ok(Document { content, metadata })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}
