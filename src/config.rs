//! Radio configuration and validation.
//!
//! Mirrors the wiring constraints of the two supported chips: the CC1101
//! exposes two GPIO status lines and resets over SPI, the SX1276 exposes a
//! hardware reset line and one interrupt line.

use crate::error::RadioError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FREQUENCY_MHZ: f32 = 868.95;
pub const MIN_FREQUENCY_MHZ: f32 = 300.0;
pub const MAX_FREQUENCY_MHZ: f32 = 928.0;
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 2;

/// Supported transceiver chips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RadioModel {
    Cc1101,
    Sx1276,
}

impl RadioModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioModel::Cc1101 => "CC1101",
            RadioModel::Sx1276 => "SX1276",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioConfig {
    pub model: RadioModel,
    /// SPI bus index (0 = SPI0 on Raspberry Pi)
    #[serde(default)]
    pub spi_bus: u8,
    /// FIFO-threshold status line (CC1101 only), BCM numbering
    #[serde(default)]
    pub gdo0_pin: Option<u8>,
    /// Sync-detect status line (CC1101 only), BCM numbering
    #[serde(default)]
    pub gdo2_pin: Option<u8>,
    /// Interrupt line (SX1276 only), BCM numbering
    #[serde(default)]
    pub irq_pin: Option<u8>,
    /// Hardware reset line (SX1276 only), BCM numbering
    #[serde(default)]
    pub reset_pin: Option<u8>,
    /// Carrier frequency override in MHz
    #[serde(default = "default_frequency")]
    pub frequency_mhz: f32,
    /// Polling cadence for the CC1101 state machine
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

fn default_frequency() -> f32 {
    DEFAULT_FREQUENCY_MHZ
}

fn default_polling_interval_ms() -> u64 {
    DEFAULT_POLLING_INTERVAL_MS
}

impl RadioConfig {
    /// Check pin assignments against the selected chip and the frequency
    /// against the synthesizer range.
    pub fn validate(&self) -> Result<(), RadioError> {
        match self.model {
            RadioModel::Cc1101 => {
                if self.gdo0_pin.is_none() {
                    return Err(RadioError::InvalidConfig(
                        "CC1101 requires 'gdo0_pin' to be specified".into(),
                    ));
                }
                if self.gdo2_pin.is_none() {
                    return Err(RadioError::InvalidConfig(
                        "CC1101 requires 'gdo2_pin' to be specified".into(),
                    ));
                }
                if self.reset_pin.is_some() {
                    return Err(RadioError::InvalidConfig(
                        "CC1101 does not have a hardware reset pin (uses software reset), remove 'reset_pin'".into(),
                    ));
                }
                if self.irq_pin.is_some() {
                    return Err(RadioError::InvalidConfig(
                        "CC1101 does not use 'irq_pin', use 'gdo0_pin' and 'gdo2_pin' instead"
                            .into(),
                    ));
                }
            }
            RadioModel::Sx1276 => {
                if self.reset_pin.is_none() {
                    return Err(RadioError::InvalidConfig(
                        "SX1276 requires 'reset_pin' to be specified".into(),
                    ));
                }
                if self.irq_pin.is_none() {
                    return Err(RadioError::InvalidConfig(
                        "SX1276 requires 'irq_pin' to be specified".into(),
                    ));
                }
                if self.gdo0_pin.is_some() || self.gdo2_pin.is_some() {
                    return Err(RadioError::InvalidConfig(
                        "SX1276 does not use GDO pins, use 'irq_pin' instead".into(),
                    ));
                }
            }
        }

        if !(MIN_FREQUENCY_MHZ..=MAX_FREQUENCY_MHZ).contains(&self.frequency_mhz) {
            return Err(RadioError::InvalidConfig(format!(
                "frequency {} MHz out of range ({}-{} MHz)",
                self.frequency_mhz, MIN_FREQUENCY_MHZ, MAX_FREQUENCY_MHZ
            )));
        }
        if self.polling_interval_ms == 0 {
            return Err(RadioError::InvalidConfig(
                "polling_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
