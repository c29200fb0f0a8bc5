//! Terminal session status and transcript types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session status in the run lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No run in flight.
    #[default]
    Idle,
    /// Run requested, waiting for the channel to open.
    Connecting,
    /// `init` sent; output is streaming.
    Running,
    /// Run ended cleanly.
    Terminated,
    /// Run ended with an error signal, a transport fault or a cancellation.
    Errored,
}

impl SessionStatus {
    /// True while a run is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Running)
    }

    /// True once a run has ended and its transcript is final.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Terminated | Self::Errored)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Running => "running",
            Self::Terminated => "terminated",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Where a transcript line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Completed line of standard output.
    Output,
    /// Fragment from the backend's error channel.
    Error,
    /// Input typed by the user but never acknowledged by the backend.
    Input,
    /// Local notice, e.g. a transport fault.
    Notice,
    /// Termination marker. Rendered, never part of the expected output.
    Marker,
}

/// One finalized line of a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

impl TranscriptLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Whether this line contributes to the run's expected output.
    pub fn is_output(&self) -> bool {
        self.kind != LineKind::Marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_activity() {
        assert!(SessionStatus::Connecting.is_active());
        assert!(SessionStatus::Running.is_active());
        assert!(!SessionStatus::Idle.is_active());
        assert!(SessionStatus::Terminated.is_finished());
        assert!(SessionStatus::Errored.is_finished());
        assert!(!SessionStatus::Running.is_finished());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SessionStatus::Errored).unwrap();
        assert_eq!(json, r#""errored""#);
        assert_eq!(SessionStatus::Running.to_string(), "running");
    }

    #[test]
    fn test_marker_is_not_output() {
        assert!(!TranscriptLine::new(LineKind::Marker, ">>> done").is_output());
        assert!(TranscriptLine::new(LineKind::Error, "Error: boom").is_output());
    }
}
