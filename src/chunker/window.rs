use serde::Deserialize;

use super::{Chunk, ChunkPolicy, number};
use crate::error::ConfigError;

/// How whitespace is normalized before chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Whitespace {
    /// Every whitespace run becomes a single space
    Collapse,
    /// Keep single line breaks as paragraph boundaries, drop blank lines
    #[default]
    Paragraphs,
}

/// Normalize whitespace and trim
pub fn normalize(text: &str, mode: Whitespace) -> String {
    match mode {
        Whitespace::Collapse => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Whitespace::Paragraphs => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.replace('\t', "    "))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
    }
}

/// Character-budgeted chunking with overlap between neighbours
#[derive(Debug, Clone)]
pub struct CharWindow {
    size: usize,
    overlap: usize,
    whitespace: Whitespace,
}

impl CharWindow {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if overlap >= size {
            return Err(ConfigError::OverlapTooLarge {
                chunk_size: size,
                overlap,
            });
        }
        Ok(Self {
            size,
            overlap,
            whitespace: Whitespace::default(),
        })
    }

    pub fn with_whitespace(mut self, whitespace: Whitespace) -> Self {
        self.whitespace = whitespace;
        self
    }

    /// Char spans of each window, before trimming
    fn spans(&self, chars: &[char]) -> Vec<std::ops::Range<usize>> {
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }
        if len <= self.size {
            return vec![0..len];
        }

        let mut spans = Vec::new();
        let mut start = 0;
        let mut floor = 0;

        while start < len {
            let end = (start + self.size).min(len);
            if end == len {
                spans.push(start..len);
                break;
            }

            let cut = self.break_point(chars, start, end, floor);
            spans.push(start..cut);

            // Overlap may never pull the next window back to (or before) this one
            let next = cut.saturating_sub(self.overlap);
            start = if next > start { next } else { cut };
            floor = cut;
        }

        spans
    }

    /// Best cut inside `[start, end)`: paragraph, sentence end, space, raw end.
    /// A cut never lands at or before `floor`, the previous chunk's cut.
    fn break_point(&self, chars: &[char], start: usize, end: usize, floor: usize) -> usize {
        let mid = start + self.size / 2;
        let window = &chars[start..end];

        if let Some(pos) = window.iter().rposition(|&c| c == '\n') {
            let pos = start + pos;
            if pos > mid && pos + 1 > floor {
                return pos + 1;
            }
        }

        let sentence_end = (start..end.saturating_sub(1))
            .rev()
            .find(|&i| matches!(chars[i], '.' | '!' | '?') && chars[i + 1] == ' ');
        if let Some(pos) = sentence_end {
            if pos > mid && pos + 2 > floor {
                return pos + 2;
            }
        }

        if let Some(pos) = window.iter().rposition(|&c| c == ' ') {
            let pos = start + pos;
            if pos > start && pos + 1 > floor {
                return pos + 1;
            }
        }

        end
    }
}

impl ChunkPolicy for CharWindow {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let normalized = normalize(text, self.whitespace);
        let chars: Vec<char> = normalized.chars().collect();
        let spans = self.spans(&chars);
        number(&chars, spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    /// Rebuild the normalized text by dropping each chunk's overlap with the previous one
    fn reconstruct(normalized: &str, chunks: &[Chunk]) -> String {
        let chars: Vec<char> = normalized.chars().collect();
        let mut out = String::new();
        let mut covered = 0;
        for chunk in chunks {
            assert!(chunk.span.start <= covered, "gap before chunk {}", chunk.index);
            assert!(chunk.span.end > covered, "chunk {} adds nothing", chunk.index);
            out.extend(&chars[covered..chunk.span.end]);
            covered = chunk.span.end;
        }
        out
    }

    const PROSE: &str = "It was a dark and stormy night. The rain fell in torrents, \
        except at occasional intervals, when it was checked by a violent gust of wind.\n\n\
        The wind swept up the streets, rattling along the housetops. It fiercely agitated \
        the scanty flame of the lamps that struggled against the darkness!\n\
        Nobody was out. Nobody at all? Not a single soul walked the old town that night.";

    #[test]
    fn test_short_text_is_single_chunk() {
        let policy = CharWindow::new(100, 10).unwrap();
        let chunks = policy.chunk("  Hello\r\n\r\n world  ");
        assert_eq!(texts(&chunks), vec!["Hello\n world"]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let policy = CharWindow::new(100, 10).unwrap();
        assert!(policy.chunk("").is_empty());
        assert!(policy.chunk(" \n\t \r\n").is_empty());
    }

    #[test]
    fn test_sentence_breaks_small_window() {
        let policy = CharWindow::new(4, 1)
            .unwrap()
            .with_whitespace(Whitespace::Collapse);
        let chunks = policy.chunk("A. B. C.");
        assert_eq!(texts(&chunks), vec!["A.", "B.", "C."]);
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_prefers_sentence_end_past_midpoint() {
        let policy = CharWindow::new(40, 0)
            .unwrap()
            .with_whitespace(Whitespace::Collapse);
        let chunks = policy.chunk("One two three four five. Six seven eight nine ten eleven.");
        assert_eq!(chunks[0].text, "One two three four five.");
    }

    #[test]
    fn test_prefers_paragraph_past_midpoint() {
        let policy = CharWindow::new(30, 0).unwrap();
        let chunks = policy.chunk("First paragraph here ok.\nSecond. One more sentence");
        assert_eq!(chunks[0].text, "First paragraph here ok.");
    }

    #[test]
    fn test_chunks_are_bounded() {
        let policy = CharWindow::new(50, 12).unwrap();
        for chunk in policy.chunk(PROSE) {
            assert!(chunk.text.chars().count() <= 50, "{:?}", chunk.text);
            assert!(chunk.span.len() <= 50);
        }
    }

    #[test]
    fn test_overlap_removed_reconstructs_source() {
        for (size, overlap) in [(50, 12), (37, 0), (20, 19), (80, 40), (9, 8)] {
            for mode in [Whitespace::Collapse, Whitespace::Paragraphs] {
                let policy = CharWindow::new(size, overlap).unwrap().with_whitespace(mode);
                let normalized = normalize(PROSE, mode);
                let chunks = policy.chunk(PROSE);
                assert_eq!(reconstruct(&normalized, &chunks), normalized);
            }
        }
    }

    #[test]
    fn test_start_strictly_increases_with_large_overlap() {
        let text = "a ".repeat(500) + &"x".repeat(300);
        for overlap in [0, 1, 5, 9] {
            let policy = CharWindow::new(10, overlap).unwrap();
            let chars: Vec<char> = normalize(&text, Whitespace::Paragraphs).chars().collect();
            let spans = policy.spans(&chars);
            for pair in spans.windows(2) {
                assert!(pair[1].start > pair[0].start);
                assert!(pair[1].end > pair[0].end);
            }
            assert_eq!(spans.last().map(|s| s.end), Some(chars.len()));
        }
    }

    #[test]
    fn test_no_spaces_falls_back_to_window_end() {
        let policy = CharWindow::new(4, 1).unwrap();
        let chunks = policy.chunk("abcdefghij");
        assert_eq!(texts(&chunks), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_deterministic() {
        let policy = CharWindow::new(45, 7).unwrap();
        assert_eq!(policy.chunk(PROSE), policy.chunk(PROSE));
    }

    #[test]
    fn test_unicode_counts_chars_not_bytes() {
        let policy = CharWindow::new(6, 0)
            .unwrap()
            .with_whitespace(Whitespace::Collapse);
        let chunks = policy.chunk("héllo wörld ünïcode");
        assert_eq!(texts(&chunks), vec!["héllo", "wörld", "ünïcod", "e"]);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(CharWindow::new(0, 0), Err(ConfigError::ZeroChunkSize)));
        assert!(matches!(
            CharWindow::new(10, 10),
            Err(ConfigError::OverlapTooLarge { .. })
        ));
    }

    #[test]
    fn test_normalize_modes() {
        let raw = "one\r\n\r\n\ttwo   three\n\n\nfour ";
        assert_eq!(normalize(raw, Whitespace::Collapse), "one two three four");
        assert_eq!(normalize(raw, Whitespace::Paragraphs), "one\n    two   three\nfour");
    }
}
