//! Document overview generation used to steer query routing.

use meridian_llm::{LlmProvider, Message};

use crate::document::{SplitterConfig, TextSplitter};
use crate::vector_store::BoxFuture;

const MAX_CHUNKS: usize = 10;
const MIN_CHUNK_CHARS: usize = 100;
const FALLBACK_CHARS: usize = 1000;

const CHUNK_PROMPT: &str = "You are an expert document analyzer. Summarize the following \
document section concisely but thoroughly. Cover the main topics, key concepts, important \
details and the purpose of the section in 150-200 words.";

const MERGE_PROMPT: &str = "Combine the following partial summaries into a single cohesive \
overview of the document (300-400 words). Describe what the document is about, its main \
themes, key concepts and who would use it.";

pub trait DocumentSummarizer: Send + Sync {
    /// Produce an overview of `text`, or `None` if nothing useful could be summarised.
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Option<String>>;
}

/// Map-reduce summariser: summarise leading sections, then merge the partials.
pub struct LlmSummarizer<P> {
    provider: P,
    splitter: TextSplitter,
}

impl<P: LlmProvider> LlmSummarizer<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            splitter: TextSplitter::new(SplitterConfig {
                chunk_size: 2000,
                chunk_overlap: 200,
            }),
        }
    }

    async fn run(&self, text: &str) -> Option<String> {
        let sections: Vec<String> = self
            .splitter
            .split_text(text)
            .into_iter()
            .take(MAX_CHUNKS)
            .filter(|s| s.chars().count() >= MIN_CHUNK_CHARS)
            .collect();

        let mut partials = Vec::with_capacity(sections.len());
        for (i, section) in sections.iter().enumerate() {
            let messages = [Message::system(CHUNK_PROMPT), Message::user(section.as_str())];
            match self.provider.chat(&messages).await {
                Ok(summary) => partials.push(summary.trim().to_owned()),
                Err(e) => tracing::warn!(section = i, "section summary failed: {e}"),
            }
        }

        if partials.is_empty() {
            return None;
        }
        let combined = partials.join("\n\n");

        let messages = [Message::system(MERGE_PROMPT), Message::user(combined.as_str())];
        match self.provider.chat(&messages).await {
            Ok(overview) if !overview.trim().is_empty() => Some(overview.trim().to_owned()),
            Ok(_) => Some(truncate_chars(&combined, FALLBACK_CHARS)),
            Err(e) => {
                tracing::warn!("summary merge failed, using partials: {e}");
                Some(truncate_chars(&combined, FALLBACK_CHARS))
            }
        }
    }
}

impl<P: LlmProvider> DocumentSummarizer for LlmSummarizer<P> {
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(self.run(text))
    }
}

#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
