//! Internal target registry

use nvmflash_target::{ChipFamily, TargetDescriptionSource};
use once_cell::sync::Lazy;
use std::fs::File;
use std::path::Path;

use super::target::Target;

/// Target descriptions embedded at compile time, as `(file name, contents)`.
#[cfg(feature = "builtin-targets")]
const BUILTIN_TARGETS: &[(&str, &str)] = &[(
    "PAC52xx.yaml",
    include_str!("../../targets/PAC52xx.yaml"),
)];

#[cfg(not(feature = "builtin-targets"))]
const BUILTIN_TARGETS: &[(&str, &str)] = &[];

static BUILTIN_FAMILIES: Lazy<Vec<ChipFamily>> = Lazy::new(|| {
    let mut families = Vec::with_capacity(BUILTIN_TARGETS.len());

    for (file, yaml) in BUILTIN_TARGETS {
        match parse_family(yaml) {
            Ok(mut family) => {
                family.source = TargetDescriptionSource::BuiltIn;
                families.push(family);
            }
            Err(error) => {
                tracing::error!("Skipping built-in target description {}: {}", file, error);
            }
        }
    }

    families
});

fn parse_family(yaml: &str) -> Result<ChipFamily, RegistryError> {
    let family: ChipFamily = serde_yaml::from_str(yaml)?;
    family
        .validate()
        .map_err(|error| RegistryError::InvalidChipFamilyDefinition(family.name.clone(), error))?;
    Ok(family)
}

/// Error type for all errors which occur when working
/// with the internal registry of targets.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum RegistryError {
    /// The requested chip '{0}' was not found in the list of known targets.
    ChipNotFound(String),
    /// Found multiple chips matching '{0}', unable to select a single chip.
    ChipNotUnique(String),
    /// An IO error occurred when trying to read a target description file.
    Io(#[from] std::io::Error),
    /// An error occurred while deserializing a YAML target description file.
    Yaml(#[from] serde_yaml::Error),
    /// Invalid chip family definition ({0}): {1}
    InvalidChipFamilyDefinition(String, String),
}

/// Registry of all available targets.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// All the available chips.
    families: Vec<ChipFamily>,
}

impl Registry {
    /// Creates a registry containing the target descriptions built into the library.
    pub fn from_builtin_families() -> Self {
        Self {
            families: BUILTIN_FAMILIES.clone(),
        }
    }

    /// Returns all known chip families.
    pub fn families(&self) -> &[ChipFamily] {
        &self.families
    }

    /// Returns the family with the given name, ignoring case.
    pub fn get_family(&self, name: &str) -> Option<&ChipFamily> {
        self.families
            .iter()
            .find(|family| family.name.eq_ignore_ascii_case(name))
    }

    /// Get a target from the internal registry based on its name.
    ///
    /// An exact match (ignoring case) wins. Otherwise the name may be a unique
    /// prefix of a chip name.
    pub fn get_target_by_name(&self, name: impl AsRef<str>) -> Result<Target, RegistryError> {
        let name = name.as_ref();
        tracing::debug!("Searching registry for chip with name {}", name);

        let exact = self.families.iter().find_map(|family| {
            family
                .variants()
                .iter()
                .find(|chip| chip.name.eq_ignore_ascii_case(name))
                .map(|chip| (family, chip))
        });

        if let Some((family, chip)) = exact {
            return Ok(Target::new(family, chip));
        }

        let lowercase = name.to_ascii_lowercase();
        let mut partial = self.families.iter().flat_map(|family| {
            family
                .variants()
                .iter()
                .filter(|chip| chip.name.to_ascii_lowercase().starts_with(&lowercase))
                .map(move |chip| (family, chip))
        });

        match (partial.next(), partial.next()) {
            (Some((family, chip)), None) => {
                tracing::warn!(
                    "Found chip {} which matches given partial name {}. Consider specifying its full name.",
                    chip.name,
                    name,
                );
                Ok(Target::new(family, chip))
            }
            (Some(_), Some(_)) => Err(RegistryError::ChipNotUnique(name.to_string())),
            (None, _) => Err(RegistryError::ChipNotFound(name.to_string())),
        }
    }

    /// Adds a validated chip family, replacing an existing family of the same name.
    ///
    /// Returns the name of the added family.
    pub fn add_target_family(&mut self, family: ChipFamily) -> Result<String, RegistryError> {
        family
            .validate()
            .map_err(|error| RegistryError::InvalidChipFamilyDefinition(family.name.clone(), error))?;

        let name = family.name.clone();
        if let Some(index) = self.families.iter().position(|old| old.name == family.name) {
            tracing::debug!("Replacing target family {}", name);
            self.families.remove(index);
        }
        self.families.push(family);

        Ok(name)
    }

    /// Parses a chip family from a YAML string and adds it to the registry.
    pub fn add_target_family_from_yaml(&mut self, yaml: &str) -> Result<String, RegistryError> {
        let family: ChipFamily = serde_yaml::from_str(yaml)?;
        self.add_target_family(family)
    }

    /// Reads a chip family from a YAML file and adds it to the registry.
    pub fn add_target_from_yaml(&mut self, path_to_yaml: &Path) -> Result<String, RegistryError> {
        let file = File::open(path_to_yaml)?;
        let family: ChipFamily = serde_yaml::from_reader(file)?;
        self.add_target_family(family)
    }
}
