use std::ops::Range;

use super::{Chunk, ChunkPolicy, number};
use crate::error::ConfigError;

/// Word-budgeted chunking: packs whole sentences up to `target_words`
#[derive(Debug, Clone)]
pub struct SentencePack {
    target_words: usize,
}

impl SentencePack {
    pub fn new(target_words: usize) -> Result<Self, ConfigError> {
        if target_words == 0 {
            return Err(ConfigError::ZeroTargetWords);
        }
        Ok(Self { target_words })
    }
}

impl ChunkPolicy for SentencePack {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let normalized = join_wrapped_lines(text);
        let chars: Vec<char> = normalized.chars().collect();

        let mut spans = Vec::new();
        for paragraph in paragraph_spans(&chars) {
            let mut current: Option<Range<usize>> = None;
            let mut words = 0;

            for sentence in sentence_spans(&chars, paragraph) {
                let count = word_count(&chars[sentence.clone()]);
                if let Some(span) = current.take_if(|_| words + count > self.target_words) {
                    spans.push(span);
                    words = 0;
                }
                current = Some(match current {
                    Some(span) => span.start..sentence.end,
                    None => sentence,
                });
                words += count;
            }

            spans.extend(current);
        }

        number(&chars, spans)
    }
}

/// Paragraphs are separated by blank lines. Single newlines are hard wraps
/// inside a paragraph and become spaces. Output has one `\n` between
/// paragraphs and single spaces within them.
fn join_wrapped_lines(text: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !words.is_empty() {
                paragraphs.push(words.join(" "));
                words.clear();
            }
        } else {
            words.extend(line.split_whitespace());
        }
    }
    if !words.is_empty() {
        paragraphs.push(words.join(" "));
    }
    paragraphs.join("\n")
}

fn paragraph_spans(chars: &[char]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, &c) in chars.iter().enumerate() {
        if c == '\n' {
            spans.push(start..i);
            start = i + 1;
        }
    }
    spans.push(start..chars.len());
    spans.retain(|span| !span.is_empty());
    spans
}

/// Sentences end at `.`, `!` or `?` (plus closing quotes or brackets)
/// followed by whitespace or the end of the paragraph
fn sentence_spans(chars: &[char], paragraph: Range<usize>) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = paragraph.start;
    let mut i = paragraph.start;

    while i < paragraph.end {
        if matches!(chars[i], '.' | '!' | '?') {
            let mut end = i + 1;
            while end < paragraph.end && is_closer(chars[end]) {
                end += 1;
            }
            if end == paragraph.end || chars[end].is_whitespace() {
                spans.push(start..end);
                while end < paragraph.end && chars[end].is_whitespace() {
                    end += 1;
                }
                start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }

    if start < paragraph.end {
        spans.push(start..paragraph.end);
    }
    spans
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn word_count(chars: &[char]) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in chars {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            count += 1;
        }
    }
    count
}
