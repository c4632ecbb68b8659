//! Session lifecycle: connection bring-up, the poll loop, and status.
//!
//! [`SessionHandle::spawn`] owns the whole provider side: it builds the
//! v5 client from [`MqttConfig`], attaches the static handshake
//! metadata, and runs the event loop on a dedicated task. Incoming
//! packets are converted to [`SessionEvent`]s and handed to the
//! dispatcher one at a time; poll errors are reported as `Error` events
//! and followed by a delayed reconnect attempt. Reconnection policy
//! lives here, never in the dispatcher.

use std::time::Duration;

use chrono::Local;
use rumqttc::v5::mqttbytes::v5::ConnectProperties;
use rumqttc::v5::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use crate::config::ConfigError;
use crate::controller::dispatcher::EventDispatcher;
use crate::mqtt::config::MqttConfig;
use crate::mqtt::session::{MqttSession, SessionEvent, SessionFault};

/// Request queue capacity between client handle and event loop
const REQUEST_CAPACITY: usize = 100;

/// Session expiry requested from the broker; long enough to ride out a
/// reconnect, short enough that stale subscriptions are not resumed.
const SESSION_EXPIRY_SECS: u32 = 10;

/// Bound on retained error messages in [`SessionStatus`]
const MAX_ERROR_MESSAGES: usize = 8;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Last-value snapshot of the session, published over a watch channel.
#[derive(Clone, Debug, Default)]
pub struct SessionStatus {
    pub connection_state: ConnectionState,
    pub error_messages: Vec<String>,
    pub messages_received: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

impl SessionStatus {
    /// Folds a handled event into the snapshot.
    pub fn absorb(&mut self, event: &SessionEvent) {
        self.last_activity = Some(Local::now());
        match event {
            SessionEvent::Connected { .. } => self.connection_state = ConnectionState::Connected,
            SessionEvent::Disconnected => self.connection_state = ConnectionState::Disconnected,
            SessionEvent::Data(_) => self.messages_received += 1,
            _ => {}
        }
    }

    /// Records a poll failure and the pending reconnect.
    pub fn note_failure(&mut self, detail: String) {
        self.last_activity = Some(Local::now());
        self.connection_state = ConnectionState::Reconnecting;
        self.error_messages.push(detail);
        if self.error_messages.len() > MAX_ERROR_MESSAGES {
            self.error_messages.remove(0);
        }
    }
}

/// Handle to the running session task.
pub struct SessionHandle {
    cancel: CancellationToken,
    status: watch::Receiver<SessionStatus>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Builds the client and spawns the poll loop.
    ///
    /// Fails only on a malformed broker address; connectivity problems
    /// surface later as `Error` events followed by reconnect attempts.
    pub fn spawn(config: MqttConfig, dispatcher: EventDispatcher) -> Result<Self, ConfigError> {
        let (host, port) = config.broker_address()?;
        info!(host = %host, port, client_id = %config.client_id, "Configuring MQTT session");

        let mut options = MqttOptions::new(config.client_id.clone(), host, port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if !config.server.user.is_empty() {
            options.set_credentials(config.server.user.clone(), config.server.pw.clone());
        }
        options.set_connect_properties(connect_properties());

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            connection_state: ConnectionState::Connecting,
            ..SessionStatus::default()
        });

        let runner = SessionRunner {
            event_loop,
            session: MqttSession::new(client),
            dispatcher,
            status: status_tx,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
        };
        let task = tokio::spawn(runner.run(cancel.clone()));

        Ok(Self {
            cancel,
            status: status_rx,
            task,
        })
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Stops the poll loop and waits for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Session task did not shut down cleanly");
        }
    }
}

/// Static descriptive tags attached to the CONNECT handshake. The
/// broker does not parse them; they identify the device class and
/// project to anyone inspecting the session.
fn connect_properties() -> ConnectProperties {
    ConnectProperties {
        session_expiry_interval: Some(SESSION_EXPIRY_SECS),
        receive_maximum: None,
        max_packet_size: None,
        topic_alias_max: None,
        request_response_info: None,
        request_problem_info: None,
        user_properties: vec![
            ("board".to_string(), "raspberry-pi".to_string()),
            ("project".to_string(), "ledcontroller".to_string()),
        ],
        authentication_method: None,
        authentication_data: None,
    }
}

struct SessionRunner {
    event_loop: EventLoop,
    session: MqttSession,
    dispatcher: EventDispatcher,
    status: watch::Sender<SessionStatus>,
    reconnect_delay: Duration,
}

impl SessionRunner {
    async fn run(mut self, cancel: CancellationToken) {
        info!("Session task started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Session task stopping");
                    break;
                }
                polled = self.event_loop.poll() => self.step(polled).await,
            }
        }
    }

    async fn step(&mut self, polled: Result<Event, ConnectionError>) {
        match polled {
            Ok(Event::Incoming(packet)) => {
                if let Some(event) = SessionEvent::from_incoming(packet) {
                    self.status.send_modify(|status| status.absorb(&event));
                    self.dispatcher.handle(event, &mut self.session);
                }
            }
            Ok(Event::Outgoing(outgoing)) => trace!(?outgoing, "Outgoing packet"),
            Err(e) => {
                let fault = SessionFault::classify(&e);
                self.status
                    .send_modify(|status| status.note_failure(e.to_string()));
                self.dispatcher
                    .handle(SessionEvent::Error(fault), &mut self.session);
                tokio::time::sleep(self.reconnect_delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::session::InboundMessage;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn data_event() -> SessionEvent {
        SessionEvent::Data(InboundMessage {
            topic: Bytes::from_static(b"home/led/set"),
            payload: Bytes::from_static(b"1"),
            user_properties: Vec::new(),
            correlation_data: None,
        })
    }

    #[test]
    fn status_tracks_connection_lifecycle() {
        let mut status = SessionStatus::default();

        status.absorb(&SessionEvent::Connected {
            session_present: false,
            user_properties: Vec::new(),
        });
        assert_eq!(status.connection_state, ConnectionState::Connected);

        status.absorb(&SessionEvent::Disconnected);
        assert_eq!(status.connection_state, ConnectionState::Disconnected);
        assert!(status.last_activity.is_some());
    }

    #[test]
    fn status_counts_received_messages() {
        let mut status = SessionStatus::default();

        status.absorb(&data_event());
        status.absorb(&data_event());

        assert_eq!(status.messages_received, 2);
    }

    #[test]
    fn failure_marks_reconnecting_and_bounds_errors() {
        let mut status = SessionStatus::default();

        for i in 0..20 {
            status.note_failure(format!("failure {i}"));
        }

        assert_eq!(status.connection_state, ConnectionState::Reconnecting);
        assert_eq!(status.error_messages.len(), MAX_ERROR_MESSAGES);
        assert_eq!(status.error_messages.last().unwrap(), "failure 19");
    }

    #[test]
    fn handshake_metadata_identifies_device_and_project() {
        let properties = connect_properties();

        assert_eq!(
            properties.session_expiry_interval,
            Some(SESSION_EXPIRY_SECS)
        );
        assert_eq!(
            properties.user_properties,
            vec![
                ("board".to_string(), "raspberry-pi".to_string()),
                ("project".to_string(), "ledcontroller".to_string()),
            ]
        );
    }
}
