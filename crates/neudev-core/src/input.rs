//! Composition buffer for interactive program input.

/// Text the user is composing for the running program's stdin.
///
/// Nothing is forwarded per keystroke; [`InputComposer::submit`] hands back
/// the whole line and clears the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputComposer {
    buffer: String,
}

impl InputComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append typed text.
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Replace the whole composition, as an editable region reports it.
    pub fn set(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Remove the last character, if any.
    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Take the composed line for sending. An empty line is still a line.
    pub fn submit(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    /// Take unsubmitted text left over when a run ends.
    pub fn take_orphan(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
