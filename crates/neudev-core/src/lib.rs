//! Core of the NEUDev execution terminal: line reassembly, error
//! classification, the run state machine and its async driver.

pub mod catalog;
mod classifier;
mod draft;
mod driver;
mod error;
mod input;
pub mod line_buffer;
mod session;
pub mod synthesizer;
pub mod transport;

pub use classifier::ErrorClassifier;
pub use draft::ItemDraft;
pub use driver::{TerminalCommand, TerminalDriver, TerminalHandle, TerminalUpdate};
pub use error::TerminalError;
pub use input::InputComposer;
pub use line_buffer::Feed;
pub use session::{
    RunOutcome, RunRequest, SessionConfig, TerminalSession, DEFAULT_TERMINATION_MARKER,
};
pub use transport::{TransportEvent, TransportHandle};

/// Result type for terminal operations.
pub type Result<T> = std::result::Result<T, TerminalError>;
