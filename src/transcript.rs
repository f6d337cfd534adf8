//! Transcript input - line-based events from a speech front end or a keyboard

use std::io::BufRead;
use std::thread;

use serde::Deserialize;

/// One transcription result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    #[serde(default = "default_is_final", alias = "isFinal")]
    pub is_final: bool,
}

fn default_is_final() -> bool {
    true
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Decode one input line.
///
/// - `{"text": "...", "is_final": false}` is taken as-is
/// - `~some words` is an interim transcript
/// - anything else is a final transcript
///
/// Blank lines yield nothing.
pub fn parse_line(line: &str) -> Option<TranscriptEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let trimmed = line.trim_start();
    if trimmed.starts_with('{') {
        match serde_json::from_str::<TranscriptEvent>(trimmed) {
            Ok(event) => return Some(event),
            Err(e) => tracing::debug!(error = %e, "line is not a transcript object, using as text"),
        }
    }

    if let Some(rest) = trimmed.strip_prefix('~') {
        return Some(TranscriptEvent::interim(rest.trim()));
    }
    Some(TranscriptEvent::final_text(trimmed.trim_end()))
}

/// Read transcripts from `input` on a dedicated thread. The receiver
/// disconnects when input reaches EOF.
pub fn spawn_reader<R>(input: R) -> flume::Receiver<TranscriptEvent>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = flume::unbounded();
    thread::spawn(move || {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "transcript input failed");
                    break;
                }
            };
            if let Some(event) = parse_line(&line)
                && tx.send(event).is_err()
            {
                break;
            }
        }
        tracing::debug!("transcript input closed");
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_plain_line_is_final() {
        assert_eq!(parse_line("next\n"), Some(TranscriptEvent::final_text("next")));
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_tilde_is_interim() {
        assert_eq!(
            parse_line("~hey rea"),
            Some(TranscriptEvent::interim("hey rea"))
        );
    }

    #[test]
    fn test_json_line() {
        assert_eq!(
            parse_line(r#"{"text": "slow down", "is_final": false}"#),
            Some(TranscriptEvent::interim("slow down"))
        );
        assert_eq!(
            parse_line(r#"{"text": "stop", "isFinal": true}"#),
            Some(TranscriptEvent::final_text("stop"))
        );
        assert_eq!(
            parse_line(r#"{"text": "pause"}"#),
            Some(TranscriptEvent::final_text("pause"))
        );
    }

    #[test]
    fn test_broken_json_is_text() {
        assert_eq!(
            parse_line("{not json"),
            Some(TranscriptEvent::final_text("{not json"))
        );
    }

    #[test]
    fn test_reader_thread() {
        let input = Cursor::new("next\n\n~prev\nstop\n");
        let rx = spawn_reader(input);
        let events: Vec<TranscriptEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                TranscriptEvent::final_text("next"),
                TranscriptEvent::interim("prev"),
                TranscriptEvent::final_text("stop"),
            ]
        );
    }
}
