use std::future::Future;
use std::pin::Pin;

use super::super::{Document, DocumentError, DocumentLoader, DocumentMetadata, extension, fingerprint};

pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(
        &self,
        source: &str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Document, DocumentError>> + Send + '_>> {
        let source = source.to_owned();
        Box::pin(async move {
            let content_type = match extension(&source).as_str() {
                "md" | "markdown" => "text/markdown",
                _ => "text/plain",
            };
            let metadata = DocumentMetadata {
                fingerprint: fingerprint(&bytes),
                size: bytes.len() as u64,
                source,
                content_type: content_type.to_owned(),
            };
            let content = String::from_utf8(bytes).map_err(|_| DocumentError::Encoding)?;
            Ok(Document { content, metadata })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}
