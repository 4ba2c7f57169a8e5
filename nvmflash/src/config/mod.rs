//! Target specific configuration
//!
//! The target descriptions known to nvmflash are kept in a [`Registry`].
//! It is filled with the descriptions built into the library, and further
//! descriptions can be loaded from YAML files at runtime.

mod registry;
mod target;

pub use registry::{Registry, RegistryError};
pub use target::Target;

pub use nvmflash_target::{
    Chip, ChipFamily, FlashControllerRegisters, FlashProperties, MemoryRange, MemoryRegion,
    NvmRegion, PageInfo, RamRegion, TargetDescriptionSource,
};
