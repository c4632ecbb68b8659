//! # MQTT Session Module
//!
//! Provides the single broker session behind the LED controller: one
//! connection, one control-topic subscription, and the event stream the
//! controller core consumes.
//!
//! ## Module Architecture
//!
//! The MQTT system is organized into three focused submodules:
//!
//! ```text
//! mqtt/
//! ├── config.rs        - Broker endpoint and session settings
//! ├── session.rs       - Event model, fault taxonomy, subscribe capability
//! └── mqtt_handler.rs  - Client bring-up, poll loop, status reporting
//! ```
//!
//! ## Design Notes
//!
//! - The controller core never touches `rumqttc` types directly; the
//!   session module converts the raw packet stream into
//!   [`session::SessionEvent`] and exposes subscribing through the
//!   [`session::ControlSession`] trait.
//! - Events are delivered serially from a single task, so the core needs
//!   no locking around the LED state or the pin.
//! - Reconnection is handled entirely inside [`mqtt_handler`]; a
//!   reconnect replays the `Connected` event and the core re-subscribes.

pub mod config;
pub mod mqtt_handler;
pub mod session;
