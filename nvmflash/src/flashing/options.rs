use std::time::Duration;

use nvmflash_target::FlashProperties;
use serde::Deserialize;

/// Per-page erase timeout used when the target description does not give one.
const DEFAULT_ERASE_TIMEOUT: Duration = Duration::from_millis(500);

/// Per-halfword program timeout used when the target description does not give one.
const DEFAULT_PROGRAM_TIMEOUT: Duration = Duration::from_millis(10);

/// Options for erasing and programming flash.
///
/// Timeouts default to the values of the flash region in the target
/// description. The options can be embedded in a larger configuration file:
///
/// ```
/// # use nvmflash::flashing::FlashOptions;
/// let options: FlashOptions = serde_yaml::from_str("erase_timeout_ms: 1000").unwrap();
/// assert!(options.wait_for_write);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlashOptions {
    /// Overrides the time a single page erase may take, in milliseconds.
    pub erase_timeout_ms: Option<u64>,
    /// Overrides the time a single halfword write may take, in milliseconds.
    pub program_timeout_ms: Option<u64>,
    /// Pause between two reads of the status register, in milliseconds.
    pub poll_interval_ms: u64,
    /// Wait for the write busy bit to clear after every halfword.
    pub wait_for_write: bool,
}

impl Default for FlashOptions {
    fn default() -> Self {
        Self {
            erase_timeout_ms: None,
            program_timeout_ms: None,
            poll_interval_ms: 1,
            wait_for_write: true,
        }
    }
}

impl FlashOptions {
    /// Timeout for erasing one page of a region with the given properties.
    pub fn erase_timeout(&self, properties: &FlashProperties) -> Duration {
        timeout(
            self.erase_timeout_ms,
            properties.erase_sector_timeout,
            DEFAULT_ERASE_TIMEOUT,
        )
    }

    /// Timeout for programming one halfword of a region with the given properties.
    pub fn program_timeout(&self, properties: &FlashProperties) -> Duration {
        timeout(
            self.program_timeout_ms,
            properties.program_page_timeout,
            DEFAULT_PROGRAM_TIMEOUT,
        )
    }

    /// Pause between two status reads.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn timeout(overridden: Option<u64>, described: u32, default: Duration) -> Duration {
    match overridden {
        Some(ms) => Duration::from_millis(ms),
        None if described > 0 => Duration::from_millis(described as u64),
        None => default,
    }
}
