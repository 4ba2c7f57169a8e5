use nvmflash_target::{
    Chip, ChipFamily, FlashControllerRegisters, MemoryRegion, NvmRegion, RamRegion,
    TargetDescriptionSource,
};

/// This describes a complete target with a fixed chip model and variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// The name of the target.
    pub name: String,
    /// The name of the family the target belongs to.
    pub family: String,
    /// The memory map of the target.
    pub memory_map: Vec<MemoryRegion>,
    /// The flash controller of the family, if it has one.
    pub flash_controller: Option<FlashControllerRegisters>,
    /// Source of the target description. Used for diagnostics.
    pub source: TargetDescriptionSource,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Target {
    /// Create a new target for the given details.
    ///
    /// The family has to be validated before calling this.
    pub(crate) fn new(family: &ChipFamily, chip: &Chip) -> Target {
        Target {
            name: chip.name.clone(),
            family: family.name.clone(),
            memory_map: chip.memory_map.clone(),
            flash_controller: family.flash_controller,
            source: family.source.clone(),
        }
    }

    /// Returns the RAM regions of the target.
    pub fn ram_regions(&self) -> impl Iterator<Item = &RamRegion> {
        self.memory_map
            .iter()
            .filter_map(MemoryRegion::as_ram_region)
    }

    /// Returns the flash regions of the target, in memory map order.
    pub fn nvm_regions(&self) -> impl Iterator<Item = &NvmRegion> {
        self.memory_map
            .iter()
            .filter_map(MemoryRegion::as_nvm_region)
    }

    /// Returns the index and the flash region which contains `address`.
    pub fn nvm_region_containing(&self, address: u64) -> Option<(usize, &NvmRegion)> {
        self.nvm_regions()
            .enumerate()
            .find(|(_, region)| region.range.contains(&address))
    }
}
