//! # Connection Supervisor
//!
//! Owns one logical connection: opens the transport, pumps lines through the
//! decoder, and reconnects after transport faults.
//!
//! ```text
//! Idle → Connecting → Connected → Error ─(delay)→ Connecting → …
//!                                              stop() → Stopped
//! ```
//!
//! Exactly one acquisition task runs per supervisor. All blocking I/O
//! happens on that task; the owner only flips the cancellation token and
//! awaits the task on [`ConnectionSupervisor::stop`]. Frames, status
//! transitions and diagnostics reach the consumer through a bounded queue.
//!
//! Retry policy:
//! - A read fault after a successful open: report `Error`, close, wait the
//!   fixed reconnect delay, reopen with the same parameters.
//! - An open failure before the session ever connected: report `Error` and
//!   end the session. The caller restarts explicitly.
//! - An open failure after the session had connected: retried like a read fault.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::LinkError;
use crate::events::{ErrorMessage, LinkStatus, TelemetryEvent};
use crate::protocol;
use crate::transport::{ConnectionParameters, Transport, TransportFactory};

/// Default per-read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default delay before reconnecting after a fault
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default capacity of the event queue
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// Lifecycle of the supervised connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Error,
    Disconnected,
    /// Terminal; only reached through [`ConnectionSupervisor::stop`]
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Timing knobs for the acquisition loop
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Upper bound on one `read_line` call; also bounds how late `stop` takes effect
    pub read_timeout: Duration,

    /// Fixed delay before a reconnect attempt
    pub reconnect_delay: Duration,

    /// Events buffered before the acquisition task waits on the consumer
    pub event_queue_capacity: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

struct Session {
    params: ConnectionParameters,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Supervises one logical telemetry connection
pub struct ConnectionSupervisor {
    factory: Arc<dyn TransportFactory>,
    settings: SupervisorSettings,
    events: mpsc::Sender<TelemetryEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Option<Session>,
}

impl fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("settings", &self.settings)
            .field("state", &*self.state.borrow())
            .field("params", &self.parameters())
            .finish_non_exhaustive()
    }
}

impl ConnectionSupervisor {
    /// Create an idle supervisor and the receiving end of its event queue
    ///
    /// The queue holds `event_queue_capacity` events plus one slot kept for
    /// the final `Disconnected` status of each session.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use gotogo_link::supervisor::{ConnectionSupervisor, SupervisorSettings};
    /// use gotogo_link::transport::{ConnectionParameters, DefaultTransportFactory};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let (mut supervisor, mut events) = ConnectionSupervisor::new(
    ///         Arc::new(DefaultTransportFactory::default()),
    ///         SupervisorSettings::default(),
    ///     );
    ///     supervisor.start(ConnectionParameters::serial(None)).await;
    ///
    ///     if let Some(event) = events.recv().await {
    ///         println!("{:?}", event);
    ///     }
    ///     supervisor.stop().await;
    /// }
    /// ```
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        settings: SupervisorSettings,
    ) -> (Self, mpsc::Receiver<TelemetryEvent>) {
        let (events, receiver) = mpsc::channel(settings.event_queue_capacity.max(1) + 1);
        let (state, _) = watch::channel(ConnectionState::Idle);

        let supervisor = Self {
            factory,
            settings,
            events,
            state: Arc::new(state),
            session: None,
        };
        (supervisor, receiver)
    }

    /// Begin a session with `params`
    ///
    /// A live session is stopped and its transport closed first, so there is
    /// never more than one transport per supervisor.
    pub async fn start(&mut self, params: ConnectionParameters) {
        if self.session.is_some() {
            debug!("Replacing running session");
            self.shutdown().await;
        }

        info!("Starting telemetry session: {}", params);

        let cancel = CancellationToken::new();
        let worker = Worker {
            factory: Arc::clone(&self.factory),
            params: params.clone(),
            settings: self.settings.clone(),
            events: self.events.clone(),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
        };

        self.state.send_replace(ConnectionState::Connecting);
        let task = tokio::spawn(worker.run());

        self.session = Some(Session {
            params,
            cancel,
            task,
        });
    }

    /// Stop the session and wait for the acquisition task to exit
    ///
    /// Closes the active transport and cancels any pending reconnect. When
    /// this returns no task or transport of the session is left running.
    pub async fn stop(&mut self) {
        self.shutdown().await;
        self.state.send_replace(ConnectionState::Stopped);
    }

    /// Cancel the session and join its task without entering `Stopped`
    async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            if let Err(e) = session.task.await {
                error!("Acquisition task ended abnormally: {}", e);
            }
            info!("Telemetry session stopped: {}", session.params);
        }
    }

    /// True while the acquisition task is alive
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Parameters of the current session
    pub fn parameters(&self) -> Option<&ConnectionParameters> {
        self.session.as_ref().map(|session| &session.params)
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}

/// State moved into the acquisition task
struct Worker {
    factory: Arc<dyn TransportFactory>,
    params: ConnectionParameters,
    settings: SupervisorSettings,
    events: mpsc::Sender<TelemetryEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let kind = self.params.kind();
        let mut connected_once = false;

        // Slot for the closing status, so a full queue cannot swallow it
        let final_status = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.events.clone().reserve_owned() => permit.ok(),
        };

        loop {
            self.set_state(ConnectionState::Connecting);
            let mut transport = self.factory.create(&self.params);

            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = transport.open() => Some(result),
            };

            match opened {
                None => {
                    transport.close().await;
                    break;
                }
                Some(Ok(())) => {
                    connected_once = true;
                    info!("Telemetry link up: {}", self.params);
                    self.set_state(ConnectionState::Connected);
                    self.emit(TelemetryEvent::status(LinkStatus::Connected, kind))
                        .await;

                    let fault = self.pump(transport.as_mut()).await;
                    transport.close().await;

                    match fault {
                        None => break,
                        Some(e) => {
                            warn!("Telemetry link lost: {}", e);
                            self.report_fault(&e).await;
                        }
                    }
                }
                Some(Err(e)) => {
                    transport.close().await;
                    warn!("Could not open telemetry link: {}", e);
                    self.report_fault(&e).await;

                    if !connected_once {
                        info!("Link never came up this session; not retrying");
                        return;
                    }
                }
            }

            debug!("Reconnecting in {:?}", self.settings.reconnect_delay);
            let resumed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => false,
                _ = tokio::time::sleep(self.settings.reconnect_delay) => true,
            };
            if !resumed {
                debug!("Pending reconnect cancelled");
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        let status = TelemetryEvent::status(LinkStatus::Disconnected, kind);
        match final_status {
            Some(permit) => {
                permit.send(status);
            }
            None => {
                if self.events.try_send(status).is_err() {
                    debug!("Final disconnected status not delivered");
                }
            }
        }
    }

    /// Read and decode until cancelled (`None`) or the transport faults
    async fn pump(&self, transport: &mut dyn Transport) -> Option<LinkError> {
        let kind = transport.kind();
        let mut frames: u64 = 0;

        loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Acquisition cancelled after {} frames", frames);
                    return None;
                }
                result = transport.read_line(self.settings.read_timeout) => result,
            };

            let line = match read {
                Ok(line) => line,
                Err(e) => return Some(e),
            };

            match protocol::decode(Some(&line)) {
                Ok(Some(frame)) => {
                    frames += 1;
                    trace!("Frame {}: {:?}", frames, frame);
                    self.emit(TelemetryEvent::frame(frame)).await;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("{}", e);
                    self.emit(TelemetryEvent::Error(ErrorMessage::decode(kind, &e)))
                        .await;
                }
            }
        }
    }

    async fn report_fault(&self, error: &LinkError) {
        let kind = self.params.kind();
        self.set_state(ConnectionState::Error);
        self.emit(TelemetryEvent::Error(ErrorMessage::from_link_error(kind, error)))
            .await;
        self.emit(TelemetryEvent::status(LinkStatus::Error, kind))
            .await;
    }

    /// Queue an event, giving up if the session is cancelled while the queue is full
    async fn emit(&self, event: TelemetryEvent) {
        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = self.events.send(event) => result.is_ok(),
        };
        if !sent {
            trace!("Event dropped (session cancelled or consumer gone)");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}
