//! Payload decision procedure and LED state ownership.
//!
//! [`interpret`] is the pure decision table: exact topic match, then
//! exact payload match. [`CommandInterpreter`] applies a resolved
//! command to the hardware driver and keeps the logical [`LedState`]
//! in step with the last commanded level.

use tracing::{info, warn};

use crate::hardware::{LedDriver, LedState};

/// The single control topic of this process. Messages on any other
/// topic are ignored.
pub const CONTROL_TOPIC: &str = "home/led/set";

/// Hardware command resolved from a control payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    fn target_state(self) -> LedState {
        match self {
            LedCommand::On => LedState::On,
            LedCommand::Off => LedState::Off,
        }
    }
}

/// Decides whether a message is a control command.
///
/// Both comparisons are exact, full-length byte equality: a topic
/// sharing a prefix with [`CONTROL_TOPIC`] does not match, and neither
/// does a payload like `b"10"`. Payloads other than `b"1"`/`b"0"` on
/// the control topic are reported as unknown commands at warn level —
/// bad input, not a system fault.
pub fn interpret(topic: &[u8], payload: &[u8]) -> Option<LedCommand> {
    if topic != CONTROL_TOPIC.as_bytes() {
        return None;
    }

    match payload {
        b"1" => Some(LedCommand::On),
        b"0" => Some(LedCommand::Off),
        unknown => {
            warn!(
                payload = %String::from_utf8_lossy(unknown),
                "Unknown LED command"
            );
            None
        }
    }
}

/// Owns the LED driver and the logical LED state.
///
/// Single writer: only this type mutates the state or the pin, and it
/// is only invoked from the session task, one event at a time.
pub struct CommandInterpreter {
    driver: Box<dyn LedDriver>,
    state: LedState,
}

impl CommandInterpreter {
    pub fn new(driver: Box<dyn LedDriver>) -> Self {
        Self {
            driver,
            state: LedState::Off,
        }
    }

    /// Applies the command carried by a message, if any.
    ///
    /// The driver call is fire-and-forget; the state update follows it
    /// unconditionally so logical and physical level cannot diverge.
    pub fn dispatch(&mut self, topic: &[u8], payload: &[u8]) {
        if let Some(command) = interpret(topic, payload) {
            let target = command.target_state();
            self.driver.apply(target);
            self.state = target;
            info!(state = ?self.state, "LED state updated");
        }
    }

    pub fn state(&self) -> LedState {
        self.state
    }
}
