use std::collections::VecDeque;

use super::types::{Chunk, Document};

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Window parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

/// Recursive character splitter.
///
/// Text is cut on the coarsest separator present (`"\n\n"`, then `"\n"`, then `" "`,
/// then between characters); pieces are greedily merged back into windows of at most
/// `chunk_size` characters, carrying up to `chunk_overlap` characters of trailing
/// pieces into the next window.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: config.chunk_overlap.min(chunk_size - 1),
        }
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                document: document.metadata.fingerprint.clone(),
                chunk_index: i,
            })
            .collect()
    }

    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &DEFAULT_SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, rest) = pick_separator(text, separators);
        let pieces = split_on(text, separator);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if rest.is_empty() {
                if let Some(c) = trimmed(piece) {
                    chunks.push(c);
                }
            } else {
                chunks.extend(self.split_recursive(piece, rest));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut out = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = |w: &VecDeque<&str>| if w.is_empty() { 0 } else { sep_len };

            if total + len + joiner(&window) > self.chunk_size && !window.is_empty() {
                if let Some(c) = join(&window, separator) {
                    out.push(c);
                }
                while total > self.chunk_overlap
                    || (total > 0 && total + len + joiner(&window) > self.chunk_size)
                {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(first) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + joiner(&window);
            window.push_back(piece);
        }

        if let Some(c) = join(&window, separator) {
            out.push(c);
        }
        out
    }
}

fn pick_separator<'a, 'b>(text: &str, separators: &'a [&'b str]) -> (&'b str, &'a [&'b str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_on<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    }
}

fn join(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    trimmed(&joined)
}

fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_owned())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::DocumentMetadata;

    fn make_doc(content: &str) -> Document {
        Document {
            content: content.to_owned(),
            metadata: DocumentMetadata {
                source: "test.txt".to_owned(),
                content_type: "text/plain".to_owned(),
                fingerprint: "abc".to_owned(),
                size: content.len() as u64,
            },
        }
    }

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    #[test]
    fn empty_document() {
        assert!(splitter(100, 10).split(&make_doc("")).is_empty());
        assert!(splitter(100, 10).split(&make_doc(" \n\n ")).is_empty());
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = splitter(1000, 150).split(&make_doc("The sky is blue."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "The sky is blue.");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].document, "abc");
    }

    #[test]
    fn paragraphs_split_before_lines() {
        let text = "alpha beta gamma\ndelta\n\nepsilon zeta eta";
        let chunks = splitter(20, 0).split_text(text);
        assert_eq!(chunks, vec!["alpha beta gamma", "delta", "epsilon zeta eta"]);
    }

    #[test]
    fn word_overlap_carried_forward() {
        let chunks = splitter(10, 4).split_text("aa bb cc dd ee ff");
        assert_eq!(chunks, vec!["aa bb cc", "cc dd ee", "ee ff"]);
    }

    #[test]
    fn long_word_falls_back_to_characters() {
        let chunks = splitter(4, 0).split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_characters_counted_as_chars() {
        let chunks = splitter(3, 0).split_text("日本語テキスト");
        assert_eq!(chunks, vec!["日本語", "テキス", "ト"]);
    }

    #[test]
    fn overlap_clamped_below_chunk_size() {
        let s = splitter(5, 50);
        assert_eq!(s.chunk_overlap, 4);
        assert!(!s.split_text("one two three four five six").is_empty());
    }

    #[test]
    fn same_input_same_chunks() {
        let text = "Lorem ipsum dolor sit amet.\n\nConsectetur adipiscing elit. ".repeat(40);
        let a = splitter(120, 30).split_text(&text);
        let b = splitter(120, 30).split_text(&text);
        assert_eq!(a, b);
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn split_never_panics(
                content in "\\PC{0,3000}",
                chunk_size in 1usize..1500,
                chunk_overlap in 0usize..400,
            ) {
                let _ = splitter(chunk_size, chunk_overlap).split(&make_doc(&content));
            }

            #[test]
            fn chunks_respect_size(
                content in "[a-z \n]{0,2000}",
                chunk_size in 1usize..300,
                chunk_overlap in 0usize..100,
            ) {
                for chunk in splitter(chunk_size, chunk_overlap).split_text(&content) {
                    prop_assert!(chunk.chars().count() <= chunk_size);
                    prop_assert!(!chunk.trim().is_empty());
                }
            }

            #[test]
            fn deterministic(
                content in "[a-zA-Z .\n]{0,1500}",
                chunk_size in 1usize..400,
                chunk_overlap in 0usize..100,
            ) {
                let s = splitter(chunk_size, chunk_overlap);
                prop_assert_eq!(s.split_text(&content), s.split_text(&content));
            }

            #[test]
            fn every_word_survives(
                words in proptest::collection::vec("[a-z]{1,8}", 1..200),
                chunk_size in 10usize..200,
            ) {
                let content = words.join(" ");
                let chunks = splitter(chunk_size, 0).split_text(&content);
                let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
                prop_assert_eq!(rebuilt, words.iter().map(String::as_str).collect::<Vec<_>>());
            }

            #[test]
            fn chunk_indices_sequential(
                content in "[a-z. ]{1,800}",
                chunk_size in 5usize..100,
            ) {
                let chunks = splitter(chunk_size, 0).split(&make_doc(&content));
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.chunk_index, i);
                }
            }
        }
    }
}
