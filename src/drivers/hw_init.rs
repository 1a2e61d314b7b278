//! One-shot GPIO output initialisation.
//!
//! Configures the relay pins as push-pull outputs using raw ESP-IDF sys
//! calls and hands each one out as an [`embedded_hal`] [`OutputPin`].
//! Called once from `main()` before the control loop starts.
//!
//! On host targets [`GpioOutput`] only remembers its level, which is
//! enough for the relay driver tests.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

// ── Error type ────────────────────────────────────────────────

/// A GPIO call returned a non-OK ESP-IDF status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub i32);

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GPIO call failed (rc={})", self.0)
    }
}

impl std::error::Error for GpioError {}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

// ── GPIO output pin ───────────────────────────────────────────

/// A configured output line.
#[derive(Debug)]
pub struct GpioOutput {
    #[cfg(target_os = "espidf")]
    gpio: i32,
    high: bool,
}

impl GpioOutput {
    /// Configure `gpio` as an output, driven to `initial_high`.
    #[cfg(target_os = "espidf")]
    pub fn configure(gpio: i32, initial_high: bool) -> Result<Self, GpioError> {
        let pin = gpio;
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: plain configuration call on a pin number validated by
        // SystemConfig::validate(); main task only.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(GpioError(ret));
        }
        let mut out = Self { gpio: pin, high: !initial_high };
        out.write(initial_high)?;
        info!("hw_init: GPIO{} configured as output", gpio);
        Ok(out)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn configure(_gpio: i32, initial_high: bool) -> Result<Self, GpioError> {
        Ok(Self { high: initial_high })
    }

    /// Last level written.
    pub fn is_high(&self) -> bool {
        self.high
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        // SAFETY: gpio_set_level writes to a pin configured in configure().
        let ret = unsafe { gpio_set_level(self.gpio, u32::from(high)) };
        if ret != ESP_OK as i32 {
            return Err(GpioError(ret));
        }
        self.high = high;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        self.high = high;
        Ok(())
    }
}

impl ErrorType for GpioOutput {
    type Error = GpioError;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
