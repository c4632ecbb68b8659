//! Event dispatch over the session event stream.
//!
//! One handler per event case, invoked serially from the session task.
//! The dispatcher never fails and never terminates the process: faults
//! and unknown event kinds are logged and dropped, and the session is
//! reached only through the borrowed [`ControlSession`] capability.

use tracing::{debug, error, info};

use crate::controller::command::{CommandInterpreter, CONTROL_TOPIC};
use crate::diag;
use crate::hardware::LedState;
use crate::mqtt::session::{ControlSession, QoS, SessionEvent};

pub struct EventDispatcher {
    interpreter: CommandInterpreter,
}

impl EventDispatcher {
    pub fn new(interpreter: CommandInterpreter) -> Self {
        Self { interpreter }
    }

    /// Routes one session event. Side effects are confined to logging,
    /// a subscribe request on `Connected`, and the command interpreter
    /// on `Data`.
    pub fn handle(&mut self, event: SessionEvent, session: &mut dyn ControlSession) {
        match event {
            SessionEvent::Connected {
                session_present,
                user_properties,
            } => {
                info!(session_present, "Connected to broker");
                diag::report_user_properties(&user_properties);

                // Re-issued on every reconnect; the broker keeps no
                // usable subscription state across our short session
                // expiry.
                match session.subscribe(CONTROL_TOPIC, QoS::AtLeastOnce) {
                    Ok(request_id) => {
                        info!(topic = CONTROL_TOPIC, request_id, "Subscribe request issued");
                    }
                    Err(e) => error!(error = %e, "Subscribe request failed"),
                }
            }
            SessionEvent::Disconnected => info!("Disconnected from broker"),
            SessionEvent::Subscribed { pkid } => {
                info!(pkid, "Subscription acknowledged, awaiting messages");
            }
            SessionEvent::Unsubscribed { pkid } => info!(pkid, "Unsubscribe acknowledged"),
            SessionEvent::Published { pkid } => info!(pkid, "Publish acknowledged"),
            SessionEvent::Data(message) => {
                info!(
                    topic = %String::from_utf8_lossy(&message.topic),
                    payload = %String::from_utf8_lossy(&message.payload),
                    "Message received"
                );
                diag::report_user_properties(&message.user_properties);
                if let Some(correlation) = &message.correlation_data {
                    diag::report_correlation_data(correlation);
                }

                self.interpreter.dispatch(&message.topic, &message.payload);
            }
            SessionEvent::Error(fault) => diag::report_fault(&fault),
            SessionEvent::Other { kind } => debug!(kind, "Unhandled event kind"),
        }
    }

    /// Logical LED state after the last handled event.
    pub fn led_state(&self) -> LedState {
        self.interpreter.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::LedDriver;
    use crate::mqtt::session::{InboundMessage, SessionError, SessionFault, TransportDiagnostics};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingLed {
        applied: Arc<Mutex<Vec<LedState>>>,
    }

    impl LedDriver for RecordingLed {
        fn apply(&mut self, state: LedState) {
            self.applied.lock().unwrap().push(state);
        }
    }

    /// No-op session sink that records subscribe requests.
    #[derive(Default)]
    struct RecordingSession {
        requests: Vec<(String, QoS)>,
    }

    impl ControlSession for RecordingSession {
        fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<u32, SessionError> {
            self.requests.push((topic.to_string(), qos));
            Ok(self.requests.len() as u32)
        }
    }

    fn dispatcher() -> (EventDispatcher, Arc<Mutex<Vec<LedState>>>) {
        let led = RecordingLed::default();
        let applied = led.applied.clone();
        let interpreter = CommandInterpreter::new(Box::new(led));
        (EventDispatcher::new(interpreter), applied)
    }

    fn connected() -> SessionEvent {
        SessionEvent::Connected {
            session_present: false,
            user_properties: Vec::new(),
        }
    }

    fn data(topic: &'static [u8], payload: &'static [u8]) -> SessionEvent {
        SessionEvent::Data(InboundMessage {
            topic: Bytes::from_static(topic),
            payload: Bytes::from_static(payload),
            user_properties: Vec::new(),
            correlation_data: None,
        })
    }

    #[test]
    fn connected_subscribes_to_control_topic_once() {
        let (mut dispatcher, _applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(connected(), &mut session);

        assert_eq!(
            session.requests,
            vec![(CONTROL_TOPIC.to_string(), QoS::AtLeastOnce)]
        );
    }

    #[test]
    fn reconnect_subscribes_again() {
        let (mut dispatcher, _applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(connected(), &mut session);
        dispatcher.handle(SessionEvent::Disconnected, &mut session);
        dispatcher.handle(connected(), &mut session);

        assert_eq!(session.requests.len(), 2);
        assert_eq!(dispatcher.led_state(), LedState::Off);
    }

    #[test]
    fn control_payload_one_turns_led_on() {
        let (mut dispatcher, applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(data(b"home/led/set", b"1"), &mut session);

        assert_eq!(dispatcher.led_state(), LedState::On);
        assert_eq!(*applied.lock().unwrap(), vec![LedState::On]);
    }

    #[test]
    fn control_payload_zero_turns_led_off() {
        let (mut dispatcher, applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(data(b"home/led/set", b"1"), &mut session);
        dispatcher.handle(data(b"home/led/set", b"0"), &mut session);

        assert_eq!(dispatcher.led_state(), LedState::Off);
        assert_eq!(*applied.lock().unwrap(), vec![LedState::On, LedState::Off]);
    }

    #[test]
    fn unknown_payload_leaves_led_untouched() {
        let (mut dispatcher, applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(data(b"home/led/set", b"5"), &mut session);

        assert_eq!(dispatcher.led_state(), LedState::Off);
        assert!(applied.lock().unwrap().is_empty());
    }

    #[test]
    fn foreign_topic_leaves_led_untouched() {
        let (mut dispatcher, applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(data(b"/other/topic", b"1"), &mut session);

        assert_eq!(dispatcher.led_state(), LedState::Off);
        assert!(applied.lock().unwrap().is_empty());
    }

    #[test]
    fn lifecycle_events_do_not_touch_led_or_session() {
        let (mut dispatcher, applied) = dispatcher();
        let mut session = RecordingSession::default();

        dispatcher.handle(SessionEvent::Disconnected, &mut session);
        dispatcher.handle(SessionEvent::Subscribed { pkid: 3 }, &mut session);
        dispatcher.handle(SessionEvent::Unsubscribed { pkid: 4 }, &mut session);
        dispatcher.handle(SessionEvent::Published { pkid: 5 }, &mut session);
        dispatcher.handle(SessionEvent::Other { kind: 5 }, &mut session);
        dispatcher.handle(
            SessionEvent::Error(SessionFault::Transport(TransportDiagnostics {
                secure_channel: Some(0x8001),
                stack: Some(0x2700),
                socket_errno: Some(104),
                detail: "connection reset".to_string(),
            })),
            &mut session,
        );

        assert!(session.requests.is_empty());
        assert_eq!(dispatcher.led_state(), LedState::Off);
        assert!(applied.lock().unwrap().is_empty());
    }
}
