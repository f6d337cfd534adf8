//! Wake phrase detection - the spoken trigger for lookup mode
//!
//! Exact detection is a substring match. Fuzzy detection additionally accepts
//! the phrase as the leading words of an utterance with ~30% edit tolerance per
//! word, which absorbs common transcription slips ("hey reeder").

/// Wake phrase matcher
#[derive(Debug, Clone)]
pub struct WakePhrase {
    phrase: String,
    words: Vec<String>,
    fuzzy: bool,
}

impl WakePhrase {
    pub fn new(phrase: &str, fuzzy: bool) -> Self {
        let phrase = phrase.trim().to_lowercase();
        Self {
            words: phrase.split_whitespace().map(clean_word).collect(),
            phrase,
            fuzzy,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Whether `text` contains the wake phrase
    pub fn matches(&self, text: &str) -> bool {
        self.detect(text).is_some()
    }

    /// Detect the wake phrase, returning whatever was said after it
    pub fn detect(&self, text: &str) -> Option<String> {
        if self.phrase.is_empty() {
            return None;
        }

        let lower = text.to_lowercase();
        if let Some(pos) = lower.find(&self.phrase) {
            let end = pos + self.phrase.len();
            let rest = match original_offset(text, end) {
                Some(offset) => &text[offset..],
                None => &lower[end..],
            };
            return Some(strip_lead(rest));
        }

        if self.fuzzy {
            return self.detect_fuzzy(text);
        }
        None
    }

    fn detect_fuzzy(&self, text: &str) -> Option<String> {
        let spoken: Vec<&str> = text.split_whitespace().collect();
        if spoken.len() < self.words.len() {
            return None;
        }

        let leading = spoken.iter().zip(&self.words);
        for (said, expected) in leading {
            if !fuzzy_match(expected, &clean_word(said)) {
                return None;
            }
        }

        Some(strip_lead(&spoken[self.words.len()..].join(" ")))
    }
}

/// Byte offset in `text` whose lowercased prefix is `lowered_end` bytes long.
/// `None` when that point falls inside the expansion of a single char.
fn original_offset(text: &str, lowered_end: usize) -> Option<usize> {
    let mut lowered = 0;
    for (i, c) in text.char_indices() {
        if lowered >= lowered_end {
            return (lowered == lowered_end).then_some(i);
        }
        lowered += c.to_lowercase().map(char::len_utf8).sum::<usize>();
    }
    (lowered == lowered_end).then_some(text.len())
}

fn strip_lead(rest: &str) -> String {
    rest.trim_start_matches([',', '!', '.', '?', ':', ';', ' '])
        .trim()
        .to_string()
}

fn clean_word(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Levenshtein match allowing roughly one edit per three characters
pub fn fuzzy_match(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }
    let max_dist = (expected.chars().count() / 3).max(1);
    levenshtein(expected, actual) <= max_dist
}

/// Edit distance over chars, single-row
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = if ca == *cb { 0 } else { 1 };
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_with_case_folding_that_changes_byte_lengths() {
        let wake = WakePhrase::new("hey reader", false);
        // 'İ' grows when lowercased and 'ẞ' shrinks, so total lengths agree
        assert_eq!(wake.detect("\u{130}hey reader\u{1E9E}"), Some("\u{1E9E}".to_string()));
        assert_eq!(
            wake.detect("\u{130}STANBUL hey reader, what is K\u{F6}FTE"),
            Some("what is K\u{F6}FTE".to_string())
        );
    }

    #[test]
    fn test_exact_detect_returns_rest() {
        let wake = WakePhrase::new("Hey Reader", false);
        assert_eq!(wake.detect("hey reader"), Some(String::new()));
        assert_eq!(
            wake.detect("Hey reader, what is Entropy?"),
            Some("what is Entropy?".to_string())
        );
        assert_eq!(
            wake.detect("okay hey reader define ennui"),
            Some("define ennui".to_string())
        );
    }

    #[test]
    fn test_exact_requires_phrase() {
        let wake = WakePhrase::new("hey reader", false);
        assert_eq!(wake.detect("hey reeder what is this"), None);
        assert!(!wake.matches("next please"));
    }

    #[test]
    fn test_fuzzy_leading_words() {
        let wake = WakePhrase::new("hey reader", true);
        assert_eq!(
            wake.detect("Hey, reeder: what is a gerund"),
            Some("what is a gerund".to_string())
        );
        assert_eq!(wake.detect("hay reader"), Some(String::new()));
        assert_eq!(wake.detect("go back"), None);
        assert_eq!(wake.detect("hey"), None);
    }

    #[test]
    fn test_empty_phrase_never_matches() {
        let wake = WakePhrase::new("  ", true);
        assert_eq!(wake.detect("anything"), None);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("reader", "reader"), 0);
        assert_eq!(levenshtein("reader", "reeder"), 1);
        assert_eq!(levenshtein("hey", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_fuzzy_match() {
        assert!(fuzzy_match("hey", "hay"));
        assert!(fuzzy_match("reader", "reeder"));
        assert!(!fuzzy_match("reader", "next"));
    }
}
