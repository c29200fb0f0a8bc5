//! Heuristic error detection for program output.
//!
//! The backend reports no exit status, so failures are recognized by where a
//! fragment arrived and by marker substrings in its text. This is best-effort
//! and deliberately errs toward flagging ambiguous output.

use neudev_types::BackendMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pluggable error predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassifier {
    /// Substrings that flag a single `stdout` fragment as an error signal.
    #[serde(default = "default_fragment_markers")]
    pub fragment_markers: Vec<String>,
    /// Substrings that flag the whole transcript as failed at termination.
    #[serde(default = "default_transcript_markers")]
    pub transcript_markers: Vec<String>,
    /// Whether anything on the `stderr` channel counts as an error signal.
    #[serde(default = "default_true")]
    pub error_channel_is_error: bool,
}

fn default_fragment_markers() -> Vec<String> {
    vec!["Traceback".to_string()]
}

fn default_transcript_markers() -> Vec<String> {
    vec!["Error:".to_string(), "Traceback".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            fragment_markers: default_fragment_markers(),
            transcript_markers: default_transcript_markers(),
            error_channel_is_error: default_true(),
        }
    }
}

impl ErrorClassifier {
    /// Whether an inbound message is an error signal.
    pub fn is_error_signal(&self, message: &BackendMessage) -> bool {
        match message {
            BackendMessage::Stderr { .. } => self.error_channel_is_error,
            BackendMessage::Stdout { data } => {
                let hit = contains_any(data, &self.fragment_markers);
                if hit {
                    debug!(target: "neudev::classifier", "Traceback marker in stdout fragment");
                }
                hit
            }
            BackendMessage::Exit => false,
        }
    }

    /// Whether the joined, trimmed transcript carries an error marker.
    pub fn transcript_has_error(&self, transcript: &str) -> bool {
        contains_any(transcript, &self.transcript_markers)
    }

    /// Final disposition of a run: true when it must be treated as failed.
    pub fn is_failed(&self, saw_error_signal: bool, transcript: &str) -> bool {
        saw_error_signal || self.transcript_has_error(transcript)
    }
}

fn contains_any(text: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
}
