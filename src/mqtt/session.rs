//! Session event model and the subscribe capability.
//!
//! Converts the raw packet stream of the `rumqttc` v5 client into
//! [`SessionEvent`], the tagged representation the event dispatcher
//! consumes. Topic and payload stay length-delimited byte sequences
//! ([`bytes::Bytes`]); nothing here assumes UTF-8 or NUL termination.
//! The dispatcher reaches back into the session only through the
//! [`ControlSession`] trait, which tests replace with a recording mock.

use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::{Packet, Publish};
use rumqttc::v5::{AsyncClient, ConnectionError};

pub use rumqttc::v5::mqttbytes::QoS;

/// Session lifecycle and message events, one per provider callback.
///
/// Events are ephemeral: the dispatcher borrows them for a single call
/// and they are dropped afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Connected {
        session_present: bool,
        user_properties: Vec<(String, String)>,
    },
    Disconnected,
    Subscribed { pkid: u16 },
    Unsubscribed { pkid: u16 },
    Published { pkid: u16 },
    Data(InboundMessage),
    Error(SessionFault),
    /// Packet kind the dispatcher has no handler for; carries the MQTT
    /// control packet type number.
    Other { kind: u8 },
}

/// One inbound message on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Bytes,
    pub payload: Bytes,
    pub user_properties: Vec<(String, String)>,
    pub correlation_data: Option<Bytes>,
}

impl From<Publish> for InboundMessage {
    fn from(publish: Publish) -> Self {
        let (user_properties, correlation_data) = match publish.properties {
            Some(properties) => (properties.user_properties, properties.correlation_data),
            None => (Vec::new(), None),
        };
        InboundMessage {
            topic: publish.topic,
            payload: publish.payload,
            user_properties,
            correlation_data,
        }
    }
}

/// Session fault classification: transport-level failures carry nested
/// numeric codes, everything else is a protocol fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionFault {
    Transport(TransportDiagnostics),
    Protocol(String),
}

impl SessionFault {
    /// Classifies a poll error from the event loop. Socket errors keep
    /// their OS errno; TLS failures classify as transport without a
    /// numeric code.
    pub fn classify(error: &ConnectionError) -> Self {
        match error {
            ConnectionError::Io(io) => SessionFault::Transport(TransportDiagnostics {
                socket_errno: io.raw_os_error(),
                detail: io.to_string(),
                ..TransportDiagnostics::default()
            }),
            ConnectionError::Tls(tls) => SessionFault::Transport(TransportDiagnostics {
                detail: tls.to_string(),
                ..TransportDiagnostics::default()
            }),
            other => SessionFault::Protocol(other.to_string()),
        }
    }
}

/// Nested numeric codes attached to a transport-level fault, lowest
/// level last. Any of them may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportDiagnostics {
    pub secure_channel: Option<i32>,
    pub stack: Option<i32>,
    pub socket_errno: Option<i32>,
    pub detail: String,
}

impl TransportDiagnostics {
    /// Labelled nonzero codes, in reporting order.
    pub fn nonzero_codes(&self) -> Vec<(&'static str, i32)> {
        let mut codes = Vec::new();
        if let Some(code) = self.secure_channel.filter(|code| *code != 0) {
            codes.push(("secure channel error", code));
        }
        if let Some(code) = self.stack.filter(|code| *code != 0) {
            codes.push(("secure channel stack error", code));
        }
        if let Some(code) = self.socket_errno.filter(|code| *code != 0) {
            codes.push(("socket errno", code));
        }
        codes
    }

    /// OS description of the socket errno, the lowest-level code.
    pub fn errno_description(&self) -> Option<String> {
        self.socket_errno
            .map(|errno| std::io::Error::from_raw_os_error(errno).to_string())
    }
}

impl SessionEvent {
    /// Maps an incoming broker packet to a session event.
    ///
    /// Keepalive chatter (PINGREQ/PINGRESP) stays below the session
    /// abstraction and returns `None`; unhandled packet kinds surface
    /// as [`SessionEvent::Other`] with their packet type number.
    pub fn from_incoming(packet: Packet) -> Option<Self> {
        let event = match packet {
            Packet::ConnAck(ack) => SessionEvent::Connected {
                session_present: ack.session_present,
                user_properties: ack
                    .properties
                    .map(|properties| properties.user_properties)
                    .unwrap_or_default(),
            },
            Packet::Publish(publish) => SessionEvent::Data(InboundMessage::from(publish)),
            Packet::SubAck(ack) => SessionEvent::Subscribed { pkid: ack.pkid },
            Packet::UnsubAck(ack) => SessionEvent::Unsubscribed { pkid: ack.pkid },
            Packet::PubAck(ack) => SessionEvent::Published { pkid: ack.pkid },
            Packet::Disconnect(..) => SessionEvent::Disconnected,
            Packet::Connect(..) => SessionEvent::Other { kind: 1 },
            Packet::PubRec(..) => SessionEvent::Other { kind: 5 },
            Packet::PubRel(..) => SessionEvent::Other { kind: 6 },
            Packet::PubComp(..) => SessionEvent::Other { kind: 7 },
            Packet::Subscribe(..) => SessionEvent::Other { kind: 8 },
            Packet::Unsubscribe(..) => SessionEvent::Other { kind: 10 },
            _ => return None,
        };
        Some(event)
    }
}

/// Errors raised by session operations issued from the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to queue subscribe request: {0}")]
    Subscribe(String),
}

/// Subscribe capability handed to the dispatcher, borrowed per event.
///
/// Returns a locally assigned request correlation id linking the
/// request to its log line; the broker acknowledgment arrives later as
/// [`SessionEvent::Subscribed`] with the wire pkid.
pub trait ControlSession {
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<u32, SessionError>;
}

/// Live session backed by the `rumqttc` client.
///
/// Uses the non-blocking `try_subscribe` so the dispatcher never
/// suspends; the request is queued and flushed by the event loop.
pub struct MqttSession {
    client: AsyncClient,
    issued_requests: u32,
}

impl MqttSession {
    pub fn new(client: AsyncClient) -> Self {
        Self {
            client,
            issued_requests: 0,
        }
    }
}

impl ControlSession for MqttSession {
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<u32, SessionError> {
        self.client
            .try_subscribe(topic, qos)
            .map_err(|e| SessionError::Subscribe(e.to_string()))?;
        self.issued_requests += 1;
        Ok(self.issued_requests)
    }
}
