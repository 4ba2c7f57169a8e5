use crate::serialize::hex_u_int;
use serde::{Deserialize, Serialize};

/// Register map of a memory mapped flash controller.
///
/// All addresses are absolute addresses in the target address space, and all
/// values are written as 32 bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlashControllerRegisters {
    /// Write protection gate. Writing `unlock_value` opens it, `lock_value` closes it.
    #[serde(serialize_with = "hex_u_int")]
    pub lock_register: u64,
    /// Value which allows flash writes.
    #[serde(serialize_with = "hex_u_int")]
    pub unlock_value: u32,
    /// Value which forbids flash writes.
    #[serde(serialize_with = "hex_u_int")]
    pub lock_value: u32,
    /// Status register. Reads as zero when the controller is idle.
    #[serde(serialize_with = "hex_u_int")]
    pub status_register: u64,
    /// Status bit set while a program operation is in progress.
    #[serde(serialize_with = "hex_u_int")]
    pub status_write_busy: u32,
    /// Status bit set while a page erase is in progress.
    #[serde(serialize_with = "hex_u_int")]
    pub status_erase_busy: u32,
    /// Selects the page index the next erase command operates on.
    #[serde(serialize_with = "hex_u_int")]
    pub page_register: u64,
    /// Writing `erase_start_value` here erases the selected page.
    #[serde(serialize_with = "hex_u_int")]
    pub page_erase_register: u64,
    /// One-shot command value which starts a page erase.
    #[serde(serialize_with = "hex_u_int")]
    pub erase_start_value: u32,
    /// Page size used to compute the page index written to `page_register`.
    #[serde(serialize_with = "hex_u_int")]
    pub page_size: u32,
}

impl FlashControllerRegisters {
    /// Returns the page index for an absolute flash address.
    pub fn page_index(&self, address: u64) -> u32 {
        (address / self.page_size as u64) as u32
    }
}
