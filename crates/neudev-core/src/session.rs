//! Run lifecycle state machine for one terminal view.
//!
//! A [`TerminalSession`] is created once per terminal view and reused across
//! runs. It performs no I/O: every handler takes one inbound event or user
//! gesture, updates the transcript, and hands back the message (if any) that
//! must go out over the channel. The caller feeds events strictly in arrival
//! order.

use crate::classifier::ErrorClassifier;
use crate::input::InputComposer;
use crate::line_buffer;
use crate::synthesizer;
use crate::{Result, TerminalError};
use chrono::{DateTime, Utc};
use neudev_types::{
    BackendMessage, ClientMessage, LineKind, SessionStatus, TestCase, TranscriptLine,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default text of the line appended when a run ends.
pub const DEFAULT_TERMINATION_MARKER: &str = ">>> Program Terminated";

/// A request to execute code on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Compiler short code, e.g. `py`.
    pub language: String,
    pub code: String,
    /// Initial stdin blob sent with `init`.
    pub input: String,
}

impl RunRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            input: String::new(),
        }
    }

    fn to_init(&self) -> ClientMessage {
        ClientMessage::Init {
            language: self.language.clone(),
            code: self.code.clone(),
            input: self.input.clone(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Clean end. `None` when the program printed nothing.
    Passed { test_case: Option<TestCase> },
    /// Error signal seen; carries the trimmed transcript so the author can
    /// still accept it as a negative-path test case.
    Failed { output: String },
    /// The channel failed or closed mid-run.
    Faulted { reason: String },
    /// The user cancelled the run.
    Cancelled,
}

/// Construction options for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub classifier: ErrorClassifier,
    pub termination_marker: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            classifier: ErrorClassifier::default(),
            termination_marker: DEFAULT_TERMINATION_MARKER.to_string(),
        }
    }
}

/// One terminal view's execution session.
#[derive(Debug)]
pub struct TerminalSession {
    config: SessionConfig,
    run_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    status: SessionStatus,
    request: Option<RunRequest>,
    transcript: Vec<TranscriptLine>,
    pending_tail: String,
    saw_error_signal: bool,
    input: InputComposer,
    channel_open: bool,
    failed_output: Option<String>,
}

impl Default for TerminalSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl TerminalSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            run_id: None,
            started_at: None,
            status: SessionStatus::Idle,
            request: None,
            transcript: Vec::new(),
            pending_tail: String::new(),
            saw_error_signal: false,
            input: InputComposer::new(),
            channel_open: false,
            failed_output: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Compiler short code of the current run.
    pub fn language(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.language.as_str())
    }

    /// Source snapshot taken when the run was requested.
    pub fn source_code(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.code.as_str())
    }

    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    pub fn pending_tail(&self) -> &str {
        &self.pending_tail
    }

    pub fn saw_error_signal(&self) -> bool {
        self.saw_error_signal
    }

    pub fn is_channel_open(&self) -> bool {
        self.channel_open
    }

    /// The composition buffer, available only while a run is streaming.
    pub fn input(&self) -> Option<&InputComposer> {
        (self.status == SessionStatus::Running).then_some(&self.input)
    }

    pub fn input_mut(&mut self) -> Option<&mut InputComposer> {
        (self.status == SessionStatus::Running).then_some(&mut self.input)
    }

    /// Output-bearing transcript lines joined and trimmed.
    pub fn output_text(&self) -> String {
        synthesizer::expected_output(&self.transcript)
    }

    /// Start a new run.
    ///
    /// Rejected while another run is connecting or streaming. Otherwise all
    /// per-run state is cleared first. Returns the `init` message when the
    /// channel is already open; if not, it is returned by
    /// [`channel_opened`](Self::channel_opened).
    pub fn request_run(&mut self, request: RunRequest) -> Result<Option<ClientMessage>> {
        if self.status.is_active() {
            warn!(
                target: "neudev::session",
                "Rejecting run request: run {:?} is {}",
                self.run_id,
                self.status
            );
            return Err(TerminalError::RunInProgress(self.status));
        }

        self.reset();
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.started_at = Some(Utc::now());
        info!(
            target: "neudev::session",
            "Run {} requested (language: {}, {} bytes of code)",
            run_id,
            request.language,
            request.code.len()
        );
        self.request = Some(request);
        self.set_status(SessionStatus::Connecting);

        if self.channel_open {
            Ok(self.start_streaming())
        } else {
            Ok(None)
        }
    }

    /// The transport reports the channel is open.
    pub fn channel_opened(&mut self) -> Option<ClientMessage> {
        self.channel_open = true;
        debug!(target: "neudev::session", "Channel open");
        if self.status == SessionStatus::Connecting {
            self.start_streaming()
        } else {
            None
        }
    }

    /// The transport failed to open or closed. Ends an in-flight run as
    /// faulted.
    pub fn channel_closed(&mut self, reason: &str) -> Option<RunOutcome> {
        self.channel_open = false;
        if !self.status.is_active() {
            debug!(target: "neudev::session", "Channel closed while {}: {}", self.status, reason);
            return None;
        }

        warn!(
            target: "neudev::session",
            "Run {:?} lost its channel: {}",
            self.run_id,
            reason
        );
        self.flush_uncommitted();
        self.push_line(LineKind::Notice, format!("Error: {}", reason));
        self.saw_error_signal = true;
        self.set_status(SessionStatus::Errored);
        Some(RunOutcome::Faulted {
            reason: reason.to_string(),
        })
    }

    /// Process one inbound message. Returns the outcome when it ends the run.
    pub fn handle_message(&mut self, message: BackendMessage) -> Option<RunOutcome> {
        if self.status != SessionStatus::Running {
            debug!(
                target: "neudev::session",
                "Ignoring {:?} while {}",
                message,
                self.status
            );
            return None;
        }

        if self.config.classifier.is_error_signal(&message) && !self.saw_error_signal {
            debug!(target: "neudev::session", "Run {:?} saw an error signal", self.run_id);
            self.saw_error_signal = true;
        }

        match message {
            BackendMessage::Stdout { data } => {
                let fed = line_buffer::feed(&self.pending_tail, &data);
                for line in fed.completed {
                    self.push_line(LineKind::Output, line);
                }
                self.pending_tail = fed.pending;
                None
            }
            BackendMessage::Stderr { data } => {
                let text = data.trim_end_matches(['\r', '\n']);
                self.push_line(LineKind::Error, format!("Error: {}", text));
                None
            }
            BackendMessage::Exit => Some(self.finish()),
        }
    }

    /// Send the composed input line to the running program.
    ///
    /// The line is not echoed locally; programs that echo input will send it
    /// back through stdout.
    pub fn submit_input(&mut self) -> Result<ClientMessage> {
        if self.status != SessionStatus::Running {
            return Err(TerminalError::NotRunning);
        }
        let data = self.input.submit();
        debug!(target: "neudev::input", "Submitting {} bytes of input", data.len());
        Ok(ClientMessage::Input { data })
    }

    /// Cancel the in-flight run and return to Idle.
    ///
    /// Returns the `kill` message when the remote process may be running.
    /// The remote side is not guaranteed to stop; late output is ignored
    /// because the session is no longer Running.
    pub fn cancel(&mut self) -> Result<Option<ClientMessage>> {
        if !self.status.is_active() {
            return Err(TerminalError::NotRunning);
        }
        let kill = (self.status == SessionStatus::Running && self.channel_open)
            .then_some(ClientMessage::Kill);
        info!(target: "neudev::session", "Run {:?} cancelled", self.run_id);
        self.set_status(SessionStatus::Errored);
        self.reset();
        Ok(kill)
    }

    /// Close the terminal view: cancel anything in flight and clear state.
    pub fn dismiss(&mut self) -> Option<ClientMessage> {
        let kill = if self.status.is_active() {
            self.cancel().ok().flatten()
        } else {
            None
        };
        self.reset();
        kill
    }

    /// Accept the output of a failed run as a test case.
    ///
    /// Available once per failed run.
    pub fn accept_error_output(&mut self) -> Result<TestCase> {
        if self.status != SessionStatus::Errored {
            return Err(TerminalError::InvalidSessionState {
                expected: SessionStatus::Errored.to_string(),
                actual: self.status,
            });
        }
        self.failed_output
            .take()
            .and_then(|output| synthesizer::synthesize(&output))
            .ok_or_else(|| TerminalError::Validation("no error output to accept".to_string()))
    }

    /// Return to Idle with an empty transcript. The channel state survives.
    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.request = None;
        self.transcript.clear();
        self.pending_tail.clear();
        self.saw_error_signal = false;
        self.input.clear();
        self.failed_output = None;
        self.started_at = None;
    }

    fn start_streaming(&mut self) -> Option<ClientMessage> {
        let init = self.request.as_ref().map(RunRequest::to_init);
        if init.is_some() {
            self.set_status(SessionStatus::Running);
        }
        init
    }

    fn finish(&mut self) -> RunOutcome {
        self.flush_uncommitted();
        let marker = self.config.termination_marker.clone();
        self.push_line(LineKind::Marker, marker);

        let output = self.output_text();
        let elapsed_ms = self
            .started_at
            .map(|t| (Utc::now() - t).num_milliseconds())
            .unwrap_or_default();

        if self.config.classifier.is_failed(self.saw_error_signal, &output) {
            info!(
                target: "neudev::session",
                "Run {:?} ended with errors after {}ms",
                self.run_id,
                elapsed_ms
            );
            self.set_status(SessionStatus::Errored);
            self.failed_output = Some(output.clone());
            RunOutcome::Failed { output }
        } else {
            info!(
                target: "neudev::session",
                "Run {:?} ended cleanly after {}ms",
                self.run_id,
                elapsed_ms
            );
            self.set_status(SessionStatus::Terminated);
            RunOutcome::Passed {
                test_case: synthesizer::synthesize(&output),
            }
        }
    }

    /// Force-finalize the pending tail and unsubmitted input as one line.
    fn flush_uncommitted(&mut self) {
        let tail = std::mem::take(&mut self.pending_tail);
        let orphan = self.input.take_orphan();
        let kind = if tail.is_empty() && orphan.is_some() {
            LineKind::Input
        } else {
            LineKind::Output
        };
        let mut line = tail;
        if let Some(orphan) = orphan {
            line.push_str(&orphan);
        }
        if !line.is_empty() {
            self.push_line(kind, line);
        }
    }

    fn push_line(&mut self, kind: LineKind, text: impl Into<String>) {
        self.transcript.push(TranscriptLine::new(kind, text));
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            debug!(
                target: "neudev::session",
                "Run {:?}: {} -> {}",
                self.run_id,
                self.status,
                status
            );
            self.status = status;
        }
    }
}
