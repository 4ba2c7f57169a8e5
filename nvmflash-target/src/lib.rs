//! Target description schema
//!
//! To detect and program a chip, called *target* in nvmflash, some target
//! specific configuration is required: how the chip identifies itself, the
//! register map of its flash controller, and its memory map, which gives the
//! geometry of every flash region.
//!
//! This crate contains the schema structs for the YAML target description files.
//!
#![warn(missing_docs)]

mod chip;
pub mod chip_detection;
mod chip_family;
mod flash_controller;
mod flash_properties;
mod memory;
pub(crate) mod serialize;

pub use chip::Chip;
pub use chip_family::{ChipFamily, TargetDescriptionSource};
pub use flash_controller::FlashControllerRegisters;
pub use flash_properties::FlashProperties;
pub use memory::{MemoryRange, MemoryRegion, NvmRegion, PageInfo, RamRegion};
