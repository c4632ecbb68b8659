pub mod config;
pub mod controller;
pub mod diag;
pub mod hardware;
pub mod mqtt;

use crate::config::Config;
use crate::controller::command::CommandInterpreter;
use crate::controller::dispatcher::EventDispatcher;
use crate::hardware::GpioLed;
use crate::mqtt::mqtt_handler::SessionHandle;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    info!("Loading configuration");
    let config =
        Config::load_or_init().map_err(|e| eyre!("Failed to load configuration: {}", e))?;

    // Pin acquisition is the only fatal hardware path; a claimed output
    // is always writable afterwards.
    info!(pin = config.led.pin, "Claiming LED output pin");
    let led = GpioLed::open(config.led.pin).map_err(|e| eyre!("Failed to claim LED pin: {}", e))?;

    let interpreter = CommandInterpreter::new(Box::new(led));
    let dispatcher = EventDispatcher::new(interpreter);

    info!(server = %config.mqtt.server, "Starting MQTT session");
    let session = SessionHandle::spawn(config.mqtt, dispatcher)
        .map_err(|e| eyre!("Failed to start MQTT session: {}", e))?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for shutdown signal: {}", e))?;
    info!("Shutdown requested");

    let status = session.status().borrow().clone();
    info!(
        messages = status.messages_received,
        state = ?status.connection_state,
        "Final session status"
    );
    session.shutdown().await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
