//! Plain-text rendering of terminal updates onto a line-oriented stream.
//!
//! Finalized lines are printed as they arrive. The pending tail (usually an
//! input prompt) is printed without a newline, and only the part not already
//! on screen is written when it grows or gets finalized.

use neudev_core::TerminalUpdate;
use neudev_types::{LineKind, TranscriptLine};
use std::io::{self, Write};

pub struct Renderer<W: Write> {
    out: W,
    /// Text of the current, unterminated screen line.
    shown: String,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
        }
    }

    pub fn render(&mut self, update: &TerminalUpdate) -> io::Result<()> {
        match update {
            TerminalUpdate::Cleared => self.break_line()?,
            TerminalUpdate::Lines(lines) => {
                for line in lines {
                    self.line(line)?;
                }
            }
            TerminalUpdate::Pending(tail) => self.pending(tail)?,
            _ => {}
        }
        self.out.flush()
    }

    fn line(&mut self, line: &TranscriptLine) -> io::Result<()> {
        if line.kind == LineKind::Marker {
            self.break_line()?;
            return writeln!(self.out, "\n{}", line.text);
        }
        match line.text.strip_prefix(self.shown.as_str()) {
            Some(rest) if !self.shown.is_empty() => writeln!(self.out, "{}", rest)?,
            _ => {
                self.break_line()?;
                writeln!(self.out, "{}", line.text)?;
            }
        }
        self.shown.clear();
        Ok(())
    }

    fn pending(&mut self, tail: &str) -> io::Result<()> {
        match tail.strip_prefix(self.shown.as_str()) {
            Some(rest) => write!(self.out, "{}", rest)?,
            None => {
                self.break_line()?;
                write!(self.out, "{}", tail)?;
            }
        }
        self.shown = tail.to_string();
        Ok(())
    }

    /// End a partially printed line so the next output starts clean.
    fn break_line(&mut self) -> io::Result<()> {
        if !self.shown.is_empty() {
            writeln!(self.out)?;
            self.shown.clear();
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
