//! Streaming connector: runs the link state machine against real resources
//!
//! `StreamConnector::handle_event` is the single entry point. It maps an event
//! to a link input, runs the pure transition, and executes the resulting
//! actions against the repository, the channel factory and the reconnect
//! timer. `spawn` moves the connector onto one tokio task that drains its
//! inbox in order, so every transition happens on one logical thread.

use crate::backoff::ReconnectPolicy;
use crate::channel::{ChannelEvent, ChannelFactory, ChannelSink, EventChannel};
use crate::link::{transition, Action, Input, Link, LinkPhase};
use crate::repository::ConfigRepository;
use crate::timer::TimerHandle;
use std::sync::Arc;
use std::time::Duration;
use storelink_core::ConnectionState;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Everything the connector reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// Open (or re-open) the stream
    Connect,
    /// Close the stream and cancel pending timers
    Disconnect,
    /// Reconnect timer `timer` fired
    ReconnectDue { timer: u64 },
    /// Event from channel `generation`
    Channel { generation: u64, event: ChannelEvent },
    /// Disconnect and stop the driver task
    Shutdown,
}

/// Owns the current channel and reconnect timer
pub struct StreamConnector {
    link: Link,
    policy: ReconnectPolicy,
    repository: Arc<ConfigRepository>,
    factory: Arc<dyn ChannelFactory>,
    inbox: mpsc::UnboundedSender<ConnectorEvent>,
    channel: Option<Box<dyn EventChannel>>,
    generation: u64,
    reconnect: Option<(u64, TimerHandle)>,
    timer_seq: u64,
}

impl StreamConnector {
    /// Create an idle connector and the receiving end of its inbox
    pub fn new(
        policy: ReconnectPolicy,
        repository: Arc<ConfigRepository>,
        factory: Arc<dyn ChannelFactory>,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectorEvent>) {
        let (inbox, events) = mpsc::unbounded_channel();
        let connector = Self {
            link: Link::new(&policy),
            policy,
            repository,
            factory,
            inbox,
            channel: None,
            generation: 0,
            reconnect: None,
            timer_seq: 0,
        };
        (connector, events)
    }

    pub fn connect(&mut self) {
        self.handle_event(ConnectorEvent::Connect);
    }

    /// Idempotent; safe before any connect
    pub fn disconnect(&mut self) {
        self.handle_event(ConnectorEvent::Disconnect);
    }

    pub fn phase(&self) -> LinkPhase {
        self.link.phase
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.link.connection
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    /// A reconnect timer is armed and has not fired
    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect
            .as_ref()
            .is_some_and(|(_, timer)| !timer.is_finished())
    }

    /// Process one event
    pub fn handle_event(&mut self, event: ConnectorEvent) {
        let input = match event {
            ConnectorEvent::Connect => Input::Connect,
            ConnectorEvent::Disconnect | ConnectorEvent::Shutdown => Input::Disconnect,
            ConnectorEvent::ReconnectDue { timer } => {
                match self.reconnect.take() {
                    Some((id, _)) if id == timer => {}
                    other => {
                        tracing::debug!("Dropping stale reconnect timer {}", timer);
                        self.reconnect = other;
                        return;
                    }
                }
                tracing::info!("Attempting to reconnect...");
                Input::ReconnectDue
            }
            ConnectorEvent::Channel { generation, event } => {
                if generation != self.generation || self.channel.is_none() {
                    tracing::debug!("Dropping event from detached channel {}", generation);
                    return;
                }
                match event {
                    ChannelEvent::Open => {
                        tracing::info!("SSE connected");
                        Input::Opened
                    }
                    ChannelEvent::Message(payload) => Input::Message(payload),
                    ChannelEvent::Error(reason) => {
                        tracing::warn!("SSE error: {}", reason);
                        Input::Failed(reason)
                    }
                }
            }
        };

        self.apply(input);
    }

    fn apply(&mut self, input: Input) {
        let link = std::mem::replace(&mut self.link, Link::new(&self.policy));
        let (next, actions) = transition(link, input, &self.policy);
        self.link = next;

        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::CloseChannel => {
                if let Some(mut channel) = self.channel.take() {
                    channel.close();
                    tracing::debug!("Closed channel {}", self.generation);
                }
            }
            Action::OpenChannel => {
                self.generation += 1;
                let sink = ChannelSink::new(self.generation, self.inbox.clone());
                match self.factory.open(sink) {
                    Ok(channel) => self.channel = Some(channel),
                    Err(e) => {
                        tracing::warn!("Failed to connect to server: {}", e);
                        // OpenChannel is always the last action of a transition
                        self.apply(Input::Failed(e.to_string()));
                    }
                }
            }
            Action::CancelReconnect => {
                if let Some((id, timer)) = self.reconnect.take() {
                    timer.cancel();
                    tracing::debug!("Cancelled reconnect timer {}", id);
                }
            }
            Action::ScheduleReconnect { delay } => self.schedule_reconnect(delay),
            Action::Publish(config) => {
                tracing::debug!("Store config update: {}", config.status_line());
                self.repository.set(config);
            }
            Action::SetConnected(connected) => self.repository.set_connected(connected),
            Action::ReportStatus(status) => {
                if let Some(ref message) = status {
                    tracing::warn!("{}", message);
                }
                self.repository.set_error(status);
            }
        }
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.timer_seq += 1;
        let timer = self.timer_seq;
        let inbox = self.inbox.clone();

        let handle = TimerHandle::schedule(delay, move || {
            let _ = inbox.send(ConnectorEvent::ReconnectDue { timer });
        });
        self.reconnect = Some((timer, handle));
    }

    /// Move the connector onto its own task
    pub fn spawn(
        mut self,
        mut events: mpsc::UnboundedReceiver<ConnectorEvent>,
    ) -> ConnectorHandle {
        let inbox = self.inbox.clone();
        let (status_tx, status_rx) = watch::channel(self.link.clone());

        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let shutdown = event == ConnectorEvent::Shutdown;
                self.handle_event(event);
                status_tx.send_replace(self.link.clone());
                if shutdown {
                    break;
                }
            }
        });

        ConnectorHandle {
            inbox,
            status: status_rx,
            task: Some(task),
        }
    }
}

/// Control handle for a spawned connector
///
/// Dropping the handle shuts the connector down.
pub struct ConnectorHandle {
    inbox: mpsc::UnboundedSender<ConnectorEvent>,
    status: watch::Receiver<Link>,
    task: Option<JoinHandle<()>>,
}

impl ConnectorHandle {
    pub fn connect(&self) {
        self.send(ConnectorEvent::Connect);
    }

    pub fn disconnect(&self) {
        self.send(ConnectorEvent::Disconnect);
    }

    /// Phase and health after the last processed event
    pub fn status(&self) -> Link {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Link> {
        self.status.clone()
    }

    /// Cloneable sender for scheduling events from elsewhere
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<ConnectorEvent> {
        self.inbox.clone()
    }

    /// Disconnect and wait for the driver task to finish
    pub async fn shutdown(mut self) {
        self.send(ConnectorEvent::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, event: ConnectorEvent) {
        if self.inbox.send(event).is_err() {
            tracing::debug!("Connector already stopped");
        }
    }
}

impl Drop for ConnectorHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.inbox.send(ConnectorEvent::Shutdown);
        }
    }
}
