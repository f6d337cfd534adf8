//! Display surface - what gets shown, and a terminal implementation

use std::io::{self, Write};

use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};
use unicode_width::UnicodeWidthStr;

use crate::chunker::Chunk;

/// How long and how faithfully content should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// `None` keeps the content until something replaces it
    pub duration_ms: Option<u64>,
    pub preserve_line_breaks: bool,
    pub preserve_whitespace: bool,
}

impl RenderOptions {
    pub fn chunk(duration_ms: u64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            preserve_line_breaks: true,
            preserve_whitespace: true,
        }
    }

    pub fn timed(duration_ms: u64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            preserve_line_breaks: false,
            preserve_whitespace: false,
        }
    }

    pub fn sticky() -> Self {
        Self {
            duration_ms: None,
            preserve_line_breaks: true,
            preserve_whitespace: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Chunk { index: usize },
    Notice,
    Caption,
}

/// One piece of content for the display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Render {
    pub content: String,
    pub options: RenderOptions,
    pub kind: RenderKind,
}

/// `[3/12]` progress line, a blank line, then the chunk text
pub fn chunk_content(chunk: &Chunk, total: usize) -> String {
    format!("[{}/{}]\n\n{}", chunk.index + 1, total, chunk.text)
}

/// Something that can show text to the reader
pub trait Surface: Send {
    fn render(&mut self, render: &Render) -> io::Result<()>;
}

/// Draws into a terminal. Chunks replace the screen; notices and captions
/// are appended below in their own colours.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    width: Option<usize>,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, width: None }
    }

    /// Fixed wrap width instead of the terminal's
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width.max(1));
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn width(&self) -> usize {
        self.width
            .or_else(|| terminal::size().ok().map(|(w, _)| w as usize))
            .unwrap_or(80)
            .max(1)
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn render(&mut self, render: &Render) -> io::Result<()> {
        let text = shape(&render.content, &render.options);
        let lines = wrap(&text, self.width());

        match render.kind {
            RenderKind::Chunk { .. } => {
                queue!(
                    self.out,
                    terminal::Clear(terminal::ClearType::All),
                    cursor::MoveTo(0, 0)
                )?;
                for line in lines {
                    write!(self.out, "{}\r\n", line)?;
                }
            }
            RenderKind::Notice => {
                for line in lines {
                    write!(self.out, "{}\r\n", line.yellow())?;
                }
            }
            RenderKind::Caption => {
                for line in lines {
                    write!(self.out, "{}\r\n", line.dark_grey())?;
                }
            }
        }
        self.out.flush()
    }
}

/// Apply the whitespace options to raw content
fn shape(content: &str, options: &RenderOptions) -> String {
    let joined = if options.preserve_line_breaks {
        content.to_string()
    } else {
        content.lines().map(str::trim).collect::<Vec<_>>().join(" ")
    };

    if options.preserve_whitespace {
        joined
    } else {
        joined
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Greedy word wrap by display width; words wider than a line are split
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();

    for line in text.split('\n') {
        if line.width() <= width {
            out.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split(' ') {
            let sep = usize::from(!current.is_empty());
            if current.width() + sep + word.width() <= width {
                if sep == 1 {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }

            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                let w = c.to_string().width();
                if current.width() + w > width && !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                current.push(c);
            }
        }
        out.push(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            span: 0..text.chars().count(),
        }
    }

    #[test]
    fn test_chunk_content_progress() {
        assert_eq!(chunk_content(&chunk(2, "Hello"), 5), "[3/5]\n\nHello");
    }

    #[test]
    fn test_shape_collapses_when_not_preserving() {
        let options = RenderOptions::timed(1000);
        assert_eq!(shape("a  b\n  c", &options), "a b c");
    }

    #[test]
    fn test_shape_preserves_for_chunks() {
        let options = RenderOptions::chunk(1000);
        assert_eq!(shape("a  b\n  c", &options), "a  b\n  c");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("short\n\nline", 20), vec!["short", "", "line"]);
    }

    #[test]
    fn test_wrap_wide_chars() {
        // Each CJK char is two columns wide
        assert_eq!(wrap("日本語テキスト", 6), vec!["日本語", "テキス", "ト"]);
    }

    #[test]
    fn test_terminal_surface_writes_content() {
        let mut surface = TerminalSurface::new(Vec::new()).with_width(40);
        let render = Render {
            content: chunk_content(&chunk(0, "Call me Ishmael."), 2),
            options: RenderOptions::chunk(5000),
            kind: RenderKind::Chunk { index: 0 },
        };
        surface.render(&render).unwrap();
        let notice = Render {
            content: "End of document reached.".to_string(),
            options: RenderOptions::timed(3000),
            kind: RenderKind::Notice,
        };
        surface.render(&notice).unwrap();

        let written = String::from_utf8(surface.into_inner()).unwrap();
        assert!(written.contains("[1/2]\r\n\r\nCall me Ishmael.\r\n"));
        assert!(written.contains("End of document reached."));
    }
}
