//! LED output hardware access.
//!
//! The LED is a single digital output on a BCM-numbered GPIO pin, driven
//! through [`rppal`]. Claiming the pin can fail (missing `/dev/gpiomem`,
//! pin already exported) and is therefore only attempted once at startup;
//! a claimed output pin is always writable, so level changes carry no
//! error path. The [`LedDriver`] trait is the seam between the command
//! interpreter and the physical pin.

use rppal::gpio::{Gpio, OutputPin};
use tracing::debug;

/// Logical LED state. Starts [`LedState::Off`]: the pin is configured low
/// at boot, before any broker session exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LedState {
    On,
    #[default]
    Off,
}

/// Errors while claiming the LED pin during startup
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Failed to access GPIO peripheral: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Capability to drive the LED to a logical state.
///
/// Infallible: implementations own an already-configured output and a
/// level write cannot fail.
pub trait LedDriver: Send {
    fn apply(&mut self, state: LedState);
}

/// LED on a GPIO output pin, low = off, high = on.
pub struct GpioLed {
    pin: OutputPin,
}

impl GpioLed {
    /// Claims `bcm_pin` as an output and drives it low.
    pub fn open(bcm_pin: u8) -> Result<Self, HardwareError> {
        let gpio = Gpio::new()?;
        let pin = gpio.get(bcm_pin)?.into_output_low();
        debug!(bcm_pin, "LED pin configured as output, initially low");
        Ok(Self { pin })
    }
}

impl LedDriver for GpioLed {
    fn apply(&mut self, state: LedState) {
        match state {
            LedState::On => self.pin.set_high(),
            LedState::Off => self.pin.set_low(),
        }
    }
}
