use super::chip::Chip;
use crate::{chip_detection::ChipDetectionMethod, FlashControllerRegisters, MemoryRange};
use serde::{Deserialize, Serialize};

/// Source of a target description.
///
/// This is used for diagnostics, when
/// an error related to a target description occurs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetDescriptionSource {
    /// The target description is a built-in target description,
    /// which was included into nvmflash at compile time.
    BuiltIn,
    /// The target description was from an external source
    /// during runtime.
    External,
}

/// This describes a chip family with all its variants.
///
/// All variants of a family share one flash controller and one way of
/// telling them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChipFamily {
    /// This is the name of the chip family in base form.
    /// E.g. `PAC52xx`.
    pub name: String,
    /// The name of the manufacturer.
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Methods that can be used to detect chips of this family.
    #[serde(default)]
    pub chip_detection: Vec<ChipDetectionMethod>,
    /// The flash controller used to erase and program the non-volatile regions.
    #[serde(default)]
    pub flash_controller: Option<FlashControllerRegisters>,
    /// This vector holds all the variants of the family.
    pub variants: Vec<Chip>,
    /// Source of the target description, used for diagnostics
    #[serde(skip, default = "default_source")]
    pub source: TargetDescriptionSource,
}

fn default_source() -> TargetDescriptionSource {
    TargetDescriptionSource::External
}

impl ChipFamily {
    /// Validates the [`ChipFamily`] such that the flashing code can make assumptions about
    /// the correctness without validating thereafter.
    ///
    /// This method should be called right after the [`ChipFamily`] is created!
    pub fn validate(&self) -> Result<(), String> {
        self.reject_duplicate_target_names()?;
        self.ensure_detected_variants_exist()?;
        self.validate_memory_regions()?;
        self.validate_flash_controller()?;

        Ok(())
    }

    /// Rejects target descriptions with duplicate target names. Only one of these targets can
    /// be selected, so having multiple is probably a mistake.
    fn reject_duplicate_target_names(&self) -> Result<(), String> {
        use std::collections::HashSet;

        let mut seen = HashSet::new();

        for chip in &self.variants {
            if !seen.insert(&chip.name) {
                return Err(format!(
                    "Target {} appears multiple times in {}",
                    chip.name, self.name,
                ));
            }
        }

        Ok(())
    }

    /// Every signature has to point at a variant of this family (basically a check for typos).
    fn ensure_detected_variants_exist(&self) -> Result<(), String> {
        let detected = self
            .chip_detection
            .iter()
            .filter_map(ChipDetectionMethod::as_id_register)
            .flat_map(|detection| detection.variants.iter());

        for variant in detected {
            if self.get_chip(&variant.target).is_none() {
                return Err(format!(
                    "signature {:#010x}/{:#010x} refers to unknown variant `{}`",
                    variant.id_value, variant.id_mask, variant.target
                ));
            }
        }

        Ok(())
    }

    fn validate_memory_regions(&self) -> Result<(), String> {
        for variant in &self.variants {
            for (index, region) in variant.memory_map.iter().enumerate() {
                let range = region.address_range();

                if range.is_empty() {
                    return Err(format!(
                        "Variant {}, memory region {:?} is empty",
                        variant.name, region
                    ));
                }

                if let Some(other) = variant.memory_map[index + 1..]
                    .iter()
                    .find(|other| other.address_range().intersects_range(&range))
                {
                    return Err(format!(
                        "Variant {}, memory region {:?} overlaps with {:?}",
                        variant.name, region, other
                    ));
                }

                let Some(nvm) = region.as_nvm_region() else {
                    continue;
                };

                let properties = &nvm.flash;
                if properties.page_size == 0 || properties.write_align == 0 {
                    return Err(format!(
                        "Variant {}, flash region {:#010x?} has a zero page size or write alignment",
                        variant.name, nvm.range
                    ));
                }

                if nvm.range.start % properties.page_size as u64 != 0
                    || nvm.len() % properties.page_size as u64 != 0
                {
                    return Err(format!(
                        "Variant {}, flash region {:#010x?} is not a whole number of {:#x} byte pages",
                        variant.name, nvm.range, properties.page_size
                    ));
                }

                if properties.page_size % properties.write_align != 0 {
                    return Err(format!(
                        "Variant {}, flash page size {:#x} is not a multiple of the write alignment {}",
                        variant.name, properties.page_size, properties.write_align
                    ));
                }
            }
        }

        Ok(())
    }

    /// Programming through the flash controller only works if its page size
    /// agrees with the geometry of every flash region.
    fn validate_flash_controller(&self) -> Result<(), String> {
        let Some(controller) = &self.flash_controller else {
            return Ok(());
        };

        if controller.page_size == 0 {
            return Err(format!(
                "Family {} has a flash controller with a zero page size",
                self.name
            ));
        }

        for variant in &self.variants {
            for nvm in variant
                .memory_map
                .iter()
                .filter_map(|region| region.as_nvm_region())
            {
                if nvm.flash.page_size != controller.page_size {
                    return Err(format!(
                        "Variant {}, flash region {:#010x?} uses {:#x} byte pages but the controller erases {:#x} byte pages",
                        variant.name, nvm.range, nvm.flash.page_size, controller.page_size
                    ));
                }

                // The controller programs halfwords.
                if nvm.flash.write_align % 2 != 0 {
                    return Err(format!(
                        "Variant {}, flash region {:#010x?} has write alignment {} which is not a whole number of halfwords",
                        variant.name, nvm.range, nvm.flash.write_align
                    ));
                }
            }
        }

        Ok(())
    }
}

impl ChipFamily {
    /// Get the different [Chip]s which are part of this
    /// family.
    pub fn variants(&self) -> &[Chip] {
        &self.variants
    }

    /// Get a [Chip] by its exact name, ignoring case.
    pub fn get_chip(&self, name: &str) -> Option<&Chip> {
        self.variants
            .iter()
            .find(|chip| chip.name.eq_ignore_ascii_case(name))
    }

    /// Get the source of the family description.
    pub fn source(&self) -> &TargetDescriptionSource {
        &self.source
    }
}
