use crate::MemoryRegion;
use serde::{Deserialize, Serialize};

/// A single chip variant.
///
/// This describes an exact chip variant, including the memory map its flash
/// regions are programmed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chip {
    /// This is the name of the chip in base form.
    /// E.g. `PAC5223`.
    pub name: String,
    /// The memory regions available on the chip.
    pub memory_map: Vec<MemoryRegion>,
}
