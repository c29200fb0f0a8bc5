//! WebSocket message protocol between the terminal and the execution backend.

use serde::{Deserialize, Serialize};

/// Messages sent from the execution backend to the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendMessage {
    /// Raw fragment of standard output. May be a partial line or carry
    /// several embedded newlines.
    Stdout {
        #[serde(default)]
        data: String,
    },
    /// Raw fragment written to the program's error stream.
    Stderr {
        #[serde(default)]
        data: String,
    },
    /// The run has ended; no further output will arrive.
    Exit,
}

impl BackendMessage {
    /// Decode one text frame.
    ///
    /// Frames that are not JSON, or whose `type` is unknown, decode to
    /// `None` so that newer backends can add message kinds without breaking
    /// older terminals.
    pub fn decode(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// The text payload for output-bearing messages.
    pub fn data(&self) -> Option<&str> {
        match self {
            Self::Stdout { data } | Self::Stderr { data } => Some(data),
            Self::Exit => None,
        }
    }
}

/// Messages sent from the terminal to the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a run with the given source and initial stdin blob.
    Init {
        language: String,
        code: String,
        input: String,
    },
    /// One completed line of interactive input.
    Input { data: String },
    /// Request termination of the in-flight run.
    Kill,
}
