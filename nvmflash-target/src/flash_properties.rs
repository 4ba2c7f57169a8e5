use crate::serialize::hex_u_int;
use serde::{Deserialize, Serialize};

/// Erase and program geometry of a flash region.
///
/// These values are read from the YAML target description files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct FlashProperties {
    /// Size of the smallest erasable unit (a page) in bytes.
    #[serde(serialize_with = "hex_u_int")]
    pub page_size: u32,
    /// Minimum program granularity in bytes. Destination addresses and data
    /// lengths must both be multiples of this.
    #[serde(default = "default_write_align")]
    pub write_align: u32,
    /// The value of a byte in flash that was just erased.
    #[serde(serialize_with = "hex_u_int")]
    pub erased_byte_value: u8,
    /// Upper bound in milliseconds for erasing a single page. Zero leaves the choice to the flasher.
    #[serde(default)]
    pub erase_sector_timeout: u32,
    /// Upper bound in milliseconds for the controller to accept one programmed unit.
    #[serde(default)]
    pub program_page_timeout: u32,
}

fn default_write_align() -> u32 {
    2
}

impl Default for FlashProperties {
    fn default() -> Self {
        FlashProperties {
            page_size: 0,
            write_align: default_write_align(),
            erased_byte_value: 0xff,
            erase_sector_timeout: 0,
            program_page_timeout: 0,
        }
    }
}
