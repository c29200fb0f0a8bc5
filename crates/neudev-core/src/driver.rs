//! Async event loop binding a [`TerminalSession`] to a transport and a UI.
//!
//! The driver is the only owner of the session. Transport events and user
//! commands are processed one at a time in a single `select!` loop, so the
//! transcript needs no locking. Rendering layers subscribe to
//! [`TerminalUpdate`]s.

use crate::session::{RunOutcome, RunRequest, TerminalSession};
use crate::transport::TransportEvent;
use crate::{Result, TerminalError};
use neudev_types::{ClientMessage, SessionStatus, TestCase, TranscriptLine};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// User gestures directed at the terminal view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Run(RunRequest),
    /// Append typed text to the input composition.
    Type(String),
    /// Replace the input composition.
    SetInput(String),
    Backspace,
    /// Send the composed input line.
    Submit,
    Cancel,
    /// Take the failed run's output as a test case.
    AcceptErrorOutput,
    /// Close the terminal view; the session returns to Idle.
    Dismiss,
    /// Tear down the driver and release the channel.
    Shutdown,
}

/// Rendering updates published by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalUpdate {
    Status(SessionStatus),
    /// The transcript was cleared (new run or dismiss).
    Cleared,
    /// Newly finalized transcript lines.
    Lines(Vec<TranscriptLine>),
    /// The pending tail changed.
    Pending(String),
    /// The input composition changed.
    Input(String),
    Finished(RunOutcome),
    /// A test case is ready for the authoring form.
    TestCase(TestCase),
    /// A command could not be applied.
    Rejected(String),
}

/// Command side of a running driver.
#[derive(Clone)]
pub struct TerminalHandle {
    commands: mpsc::Sender<TerminalCommand>,
    updates: broadcast::Sender<TerminalUpdate>,
}

impl TerminalHandle {
    pub async fn send(&self, command: TerminalCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TerminalError::ChannelSendError)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TerminalUpdate> {
        self.updates.subscribe()
    }
}

/// What the UI last saw, used to publish only what changed.
struct Snapshot {
    run_id: Option<Uuid>,
    status: SessionStatus,
    lines: usize,
    pending: String,
    input: String,
}

pub struct TerminalDriver {
    session: TerminalSession,
    outbound: mpsc::Sender<ClientMessage>,
    events: mpsc::Receiver<TransportEvent>,
    commands: mpsc::Receiver<TerminalCommand>,
    updates: broadcast::Sender<TerminalUpdate>,
    transport_closed: bool,
}

impl TerminalDriver {
    pub fn new(
        session: TerminalSession,
        outbound: mpsc::Sender<ClientMessage>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> (Self, TerminalHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (update_tx, _) = broadcast::channel(1024);
        let driver = Self {
            session,
            outbound,
            events,
            commands: command_rx,
            updates: update_tx.clone(),
            transport_closed: false,
        };
        let handle = TerminalHandle {
            commands: command_tx,
            updates: update_tx,
        };
        (driver, handle)
    }

    /// Run until shutdown. Returns the session for inspection.
    pub async fn run(mut self) -> TerminalSession {
        loop {
            tokio::select! {
                event = self.events.recv(), if !self.transport_closed => {
                    let event = event.unwrap_or_else(|| TransportEvent::Closed {
                        reason: "WebSocket connection closed.".to_string(),
                    });
                    self.on_transport(event).await;
                }
                command = self.commands.recv() => {
                    match command {
                        Some(TerminalCommand::Shutdown) | None => break,
                        Some(command) => self.on_command(command).await,
                    }
                }
            }
        }

        let before = self.snapshot();
        if let Some(kill) = self.session.dismiss() {
            let _ = self.outbound.send(kill).await;
        }
        self.settle(before, None);
        info!(target: "neudev::session", "Terminal driver stopped");
        // Dropping `outbound` with the driver closes the channel.
        self.session
    }

    async fn on_transport(&mut self, event: TransportEvent) {
        let before = self.snapshot();
        let outcome = match event {
            TransportEvent::Opened => match self.session.channel_opened() {
                Some(init) => self.send(init).await,
                None => None,
            },
            TransportEvent::Message(message) => self.session.handle_message(message),
            TransportEvent::Closed { reason } => {
                self.transport_closed = true;
                self.session.channel_closed(&reason)
            }
        };
        self.settle(before, outcome);
    }

    async fn on_command(&mut self, command: TerminalCommand) {
        let before = self.snapshot();
        debug!(target: "neudev::input", "Command: {:?}", command);
        let outcome = match command {
            TerminalCommand::Run(request) => match self.session.request_run(request) {
                Ok(Some(init)) => self.send(init).await,
                // The channel is gone for good; fail the run right away.
                Ok(None) if self.transport_closed => {
                    self.session.channel_closed("WebSocket not connected.")
                }
                Ok(None) => None,
                Err(e) => self.reject(e),
            },
            TerminalCommand::Type(text) => match self.session.input_mut() {
                Some(input) => {
                    input.push_str(&text);
                    None
                }
                None => self.reject(TerminalError::NotRunning),
            },
            TerminalCommand::SetInput(text) => match self.session.input_mut() {
                Some(input) => {
                    input.set(text);
                    None
                }
                None => self.reject(TerminalError::NotRunning),
            },
            TerminalCommand::Backspace => {
                if let Some(input) = self.session.input_mut() {
                    input.backspace();
                }
                None
            }
            TerminalCommand::Submit => match self.session.submit_input() {
                Ok(msg) => self.send(msg).await,
                Err(e) => self.reject(e),
            },
            TerminalCommand::Cancel => match self.session.cancel() {
                Ok(kill) => {
                    if let Some(kill) = kill {
                        self.send(kill).await;
                    }
                    Some(RunOutcome::Cancelled)
                }
                Err(e) => self.reject(e),
            },
            TerminalCommand::AcceptErrorOutput => match self.session.accept_error_output() {
                Ok(test_case) => {
                    self.emit(TerminalUpdate::TestCase(test_case));
                    None
                }
                Err(e) => self.reject(e),
            },
            TerminalCommand::Dismiss => match self.session.dismiss() {
                Some(kill) => self.send(kill).await,
                None => None,
            },
            TerminalCommand::Shutdown => None,
        };
        self.settle(before, outcome);
    }

    /// Publish what changed since `before`, then the run's outcome if it ended.
    fn settle(&self, before: Snapshot, outcome: Option<RunOutcome>) {
        self.publish_changes(before);
        let Some(outcome) = outcome else {
            return;
        };
        if let RunOutcome::Passed {
            test_case: Some(test_case),
        } = &outcome
        {
            self.emit(TerminalUpdate::TestCase(test_case.clone()));
        }
        self.emit(TerminalUpdate::Finished(outcome));
    }

    /// Send a message; a dead channel faults the current run.
    async fn send(&mut self, msg: ClientMessage) -> Option<RunOutcome> {
        if self.outbound.send(msg).await.is_ok() {
            return None;
        }
        warn!(target: "neudev::transport", "Outbound channel closed");
        self.transport_closed = true;
        self.session.channel_closed("WebSocket connection closed.")
    }

    fn reject(&self, error: TerminalError) -> Option<RunOutcome> {
        debug!(target: "neudev::input", "Rejected: {}", error);
        self.emit(TerminalUpdate::Rejected(error.to_string()));
        None
    }

    fn emit(&self, update: TerminalUpdate) {
        let _ = self.updates.send(update);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            run_id: self.session.run_id(),
            status: self.session.status(),
            lines: self.session.transcript().len(),
            pending: self.session.pending_tail().to_string(),
            input: self
                .session
                .input()
                .map(|i| i.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    fn publish_changes(&self, before: Snapshot) {
        let status = self.session.status();
        if status != before.status {
            self.emit(TerminalUpdate::Status(status));
        }

        let transcript = self.session.transcript();
        let start = if before.run_id != self.session.run_id() || transcript.len() < before.lines {
            self.emit(TerminalUpdate::Cleared);
            0
        } else {
            before.lines
        };
        if transcript.len() > start {
            self.emit(TerminalUpdate::Lines(transcript[start..].to_vec()));
        }

        if self.session.pending_tail() != before.pending {
            self.emit(TerminalUpdate::Pending(self.session.pending_tail().to_string()));
        }

        let input = self.session.input().map(|i| i.as_str()).unwrap_or_default();
        if input != before.input {
            self.emit(TerminalUpdate::Input(input.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neudev_types::BackendMessage;
    use tokio::task::JoinHandle;

    struct Harness {
        handle: TerminalHandle,
        updates: broadcast::Receiver<TerminalUpdate>,
        outbound: mpsc::Receiver<ClientMessage>,
        events: mpsc::Sender<TransportEvent>,
        task: JoinHandle<TerminalSession>,
    }

    fn start() -> Harness {
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        let (driver, handle) = TerminalDriver::new(TerminalSession::default(), outbound_tx, event_rx);
        let updates = handle.subscribe();
        let task = tokio::spawn(driver.run());
        Harness {
            handle,
            updates,
            outbound: outbound_rx,
            events: event_tx,
            task,
        }
    }

    async fn stdout(h: &Harness, data: &str) {
        h.events
            .send(TransportEvent::Message(BackendMessage::Stdout {
                data: data.to_string(),
            }))
            .await
            .unwrap();
    }

    async fn wait_finished(updates: &mut broadcast::Receiver<TerminalUpdate>) -> Vec<TerminalUpdate> {
        let mut seen = Vec::new();
        loop {
            let update = updates.recv().await.unwrap();
            let done = matches!(update, TerminalUpdate::Finished(_));
            seen.push(update);
            if done {
                return seen;
            }
        }
    }

    async fn start_running() -> Harness {
        let mut h = start();
        h.events.send(TransportEvent::Opened).await.unwrap();
        h.handle
            .send(TerminalCommand::Run(RunRequest::new("py", "print('hi')")))
            .await
            .unwrap();
        let init = h.outbound.recv().await.unwrap();
        assert!(matches!(init, ClientMessage::Init { .. }));
        h
    }

    #[tokio::test]
    async fn test_clean_run_publishes_test_case() {
        let mut h = start_running().await;
        stdout(&h, "Hello, ").await;
        stdout(&h, "World\n").await;
        h.events
            .send(TransportEvent::Message(BackendMessage::Exit))
            .await
            .unwrap();

        let seen = wait_finished(&mut h.updates).await;
        assert!(seen.contains(&TerminalUpdate::Pending("Hello, ".to_string())));
        assert!(seen.contains(&TerminalUpdate::Status(SessionStatus::Terminated)));
        let test_case = seen
            .iter()
            .find_map(|u| match u {
                TerminalUpdate::TestCase(tc) => Some(tc.clone()),
                _ => None,
            })
            .expect("test case published");
        assert_eq!(test_case.expected_output, "Hello, World");

        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        let session = h.task.await.unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_submit_forwards_input() {
        let mut h = start_running().await;
        h.handle
            .send(TerminalCommand::Type("4".to_string()))
            .await
            .unwrap();
        h.handle
            .send(TerminalCommand::Type("2".to_string()))
            .await
            .unwrap();
        h.handle.send(TerminalCommand::Submit).await.unwrap();
        assert_eq!(
            h.outbound.recv().await.unwrap(),
            ClientMessage::Input {
                data: "42".to_string()
            }
        );
        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_sends_kill() {
        let mut h = start_running().await;
        h.handle.send(TerminalCommand::Cancel).await.unwrap();
        assert_eq!(h.outbound.recv().await.unwrap(), ClientMessage::Kill);
        let seen = wait_finished(&mut h.updates).await;
        assert_eq!(
            seen.last(),
            Some(&TerminalUpdate::Finished(RunOutcome::Cancelled))
        );
        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_kills_running_program() {
        let mut h = start_running().await;
        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        assert_eq!(h.outbound.recv().await.unwrap(), ClientMessage::Kill);
        let session = h.task.await.unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        // The driver dropped its sender, so the channel is released.
        assert!(h.outbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_after_transport_failure_is_faulted() {
        let mut h = start();
        h.events
            .send(TransportEvent::Closed {
                reason: "WebSocket not connected.".to_string(),
            })
            .await
            .unwrap();
        // Either order faults the run: a closed channel fails new runs, and a
        // close while connecting fails the pending one.
        h.handle
            .send(TerminalCommand::Run(RunRequest::new("py", "print(1)")))
            .await
            .unwrap();

        let seen = wait_finished(&mut h.updates).await;
        assert!(matches!(
            seen.last(),
            Some(TerminalUpdate::Finished(RunOutcome::Faulted { .. }))
        ));
        assert!(seen.iter().any(|u| matches!(
            u,
            TerminalUpdate::Lines(lines) if lines[0].text == "Error: WebSocket not connected."
        )));
        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_run_can_be_accepted() {
        let mut h = start_running().await;
        h.events
            .send(TransportEvent::Message(BackendMessage::Stderr {
                data: "ZeroDivisionError: division by zero".to_string(),
            }))
            .await
            .unwrap();
        h.events
            .send(TransportEvent::Message(BackendMessage::Exit))
            .await
            .unwrap();
        let seen = wait_finished(&mut h.updates).await;
        assert!(matches!(
            seen.last(),
            Some(TerminalUpdate::Finished(RunOutcome::Failed { .. }))
        ));
        assert!(!seen.iter().any(|u| matches!(u, TerminalUpdate::TestCase(_))));

        h.handle.send(TerminalCommand::AcceptErrorOutput).await.unwrap();
        let accepted = loop {
            if let TerminalUpdate::TestCase(tc) = h.updates.recv().await.unwrap() {
                break tc;
            }
        };
        assert_eq!(
            accepted.expected_output,
            "Error: ZeroDivisionError: division by zero"
        );
        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_rejected_while_running() {
        let mut h = start_running().await;
        h.handle
            .send(TerminalCommand::Run(RunRequest::new("py", "print(2)")))
            .await
            .unwrap();
        let rejected = loop {
            if let TerminalUpdate::Rejected(reason) = h.updates.recv().await.unwrap() {
                break reason;
            }
        };
        assert!(rejected.contains("already in progress"));
        h.handle.send(TerminalCommand::Shutdown).await.unwrap();
        h.task.await.unwrap();
    }
}
