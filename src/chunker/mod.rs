//! Text chunking - splits a document into bounded, ordered chunks
//!
//! Two interchangeable policies implement [`ChunkPolicy`]:
//! - [`CharWindow`]: character budget with overlap, cut at the best break point
//! - [`SentencePack`]: word budget, packs whole sentences and never splits one

mod sentences;
mod window;

pub use sentences::SentencePack;
pub use window::{CharWindow, Whitespace, normalize};

use std::ops::Range;

/// A slice of the document with a stable position in reading order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    /// Untrimmed char range of the normalized text this chunk was cut from
    pub span: Range<usize>,
}

/// Chunking strategy. Same input always yields the same chunks.
pub trait ChunkPolicy: Send + Sync {
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// Turn char spans into numbered chunks, dropping spans that trim to nothing
fn number(chars: &[char], spans: Vec<Range<usize>>) -> Vec<Chunk> {
    spans
        .into_iter()
        .filter_map(|span| {
            let text: String = chars[span.clone()].iter().collect();
            let text = text.trim();
            (!text.is_empty()).then(|| (text.to_string(), span))
        })
        .enumerate()
        .map(|(index, (text, span))| Chunk { index, text, span })
        .collect()
}
