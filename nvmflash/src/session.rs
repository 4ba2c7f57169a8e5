use crate::config::{Registry, Target};
use crate::flashing::{FlashController, FlashError, FlashOptions, FlashRegionHandle};
use crate::{vendor, Error, MemoryInterface};

/// The `Session` struct represents an active connection to a target.
///
/// It owns the transport and, once a chip was detected or selected, the
/// description of that chip. Flash is accessed through handles borrowed from
/// the session, see [`Session::flash`].
pub struct Session {
    memory: Box<dyn MemoryInterface>,
    target: Option<Target>,
    flash_options: FlashOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("flash_options", &self.flash_options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens a session on the given transport. No target is attached yet.
    pub fn new(memory: impl MemoryInterface + 'static) -> Self {
        Self {
            memory: Box::new(memory),
            target: None,
            flash_options: FlashOptions::default(),
        }
    }

    /// Opens a session on the given transport for a known target, skipping detection.
    pub fn with_target(memory: impl MemoryInterface + 'static, target: Target) -> Self {
        let mut session = Self::new(memory);
        session.attach_target(target);
        session
    }

    /// Opens a session for the chip with the given name from the registry.
    pub fn attach(
        memory: impl MemoryInterface + 'static,
        registry: &Registry,
        chip: &str,
    ) -> Result<Self, Error> {
        let target = registry.get_target_by_name(chip)?;
        Ok(Self::with_target(memory, target))
    }

    /// Tries to identify the connected chip by reading its identification register.
    ///
    /// Returns `Ok(true)` and attaches the detected target if a known signature
    /// matched, and `Ok(false)` without touching the session otherwise. An error
    /// means the target could not be accessed.
    pub fn auto_detect(&mut self, registry: &Registry) -> Result<bool, Error> {
        match vendor::auto_determine_target(registry, &mut *self.memory)? {
            Some(target) => {
                tracing::info!("Found target {}", target.name);
                self.attach_target(target);
                Ok(true)
            }
            None => {
                tracing::debug!("No known chip signature matched");
                Ok(false)
            }
        }
    }

    /// Attaches `target`, replacing any previously attached target.
    pub fn attach_target(&mut self, target: Target) {
        self.target = Some(target);
    }

    /// The attached target, if any.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Direct access to the transport.
    pub fn memory(&mut self) -> &mut dyn MemoryInterface {
        &mut *self.memory
    }

    /// Options used for all following flash operations.
    pub fn flash_options(&self) -> &FlashOptions {
        &self.flash_options
    }

    /// Replaces the options used for all following flash operations.
    pub fn set_flash_options(&mut self, options: FlashOptions) {
        self.flash_options = options;
    }

    /// Returns a handle to the flash region with the given index.
    ///
    /// Indices count the flash regions of the memory map only, in order.
    pub fn flash(&mut self, index: usize) -> Result<FlashRegionHandle<'_>, FlashError> {
        let target = self.target.as_ref().ok_or(FlashError::NoTargetAttached)?;
        let region = target
            .nvm_regions()
            .nth(index)
            .ok_or(FlashError::NoSuchRegion { index })?;

        let registers = target
            .flash_controller
            .ok_or_else(|| FlashError::NoFlashController {
                target: target.name.clone(),
            })?;

        FlashController::check_region(&registers, region).map_err(|reason| {
            FlashError::IncompatibleRegion {
                target: target.name.clone(),
                region: region.range.clone(),
                reason,
            }
        })?;

        let controller = FlashController::new(
            &mut *self.memory,
            registers,
            self.flash_options.poll_interval(),
        );

        Ok(FlashRegionHandle::new(
            controller,
            region,
            &self.flash_options,
        ))
    }

    /// Returns a handle to the flash region containing `address`.
    pub fn flash_at(&mut self, address: u64) -> Result<FlashRegionHandle<'_>, FlashError> {
        let index = self
            .target
            .as_ref()
            .ok_or(FlashError::NoTargetAttached)?
            .nvm_region_containing(address)
            .map(|(index, _)| index)
            .ok_or(FlashError::NoSuitableFlash { address })?;

        self.flash(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryRegion;
    use crate::FakeTarget;
    use test_case::test_case;

    fn pac5223() -> (Registry, FakeTarget) {
        let registry = Registry::from_builtin_families();
        let family = registry.get_family("PAC52xx").unwrap();
        let fake = FakeTarget::from_family(family, "PAC5223").unwrap();
        (registry, fake)
    }

    #[test]
    fn flash_requires_a_target() {
        let (_, fake) = pac5223();
        let mut session = Session::new(fake);

        assert!(matches!(
            session.flash(0),
            Err(FlashError::NoTargetAttached)
        ));
    }

    #[test]
    fn detection_attaches_the_memory_map() {
        let (registry, fake) = pac5223();
        let mut session = Session::new(fake);

        assert!(session.auto_detect(&registry).unwrap());

        let target = session.target().unwrap();
        assert_eq!(target.name, "PAC5223");
        assert_eq!(target.ram_regions().next().unwrap().range, 0x2000_0000..0x2000_2000);

        let flash = target.nvm_regions().next().unwrap();
        assert_eq!(flash.range, 0..0x8_0000);
        assert_eq!(flash.flash.page_size, 0x400);
        assert_eq!(flash.flash.write_align, 2);
        assert_eq!(flash.flash.erased_byte_value, 0xff);
    }

    #[test]
    fn failed_detection_keeps_the_session() {
        let (registry, fake) = pac5223();
        let mut session = Session::with_target(
            fake.with_id_value(0xff00_5224),
            registry.get_target_by_name("PAC5223").unwrap(),
        );

        assert!(!session.auto_detect(&registry).unwrap());
        assert_eq!(session.target().unwrap().name, "PAC5223");
    }

    #[test]
    fn flash_at_selects_region_by_address() {
        let (registry, fake) = pac5223();
        let mut session = Session::attach(fake, &registry, "PAC5223").unwrap();

        assert_eq!(session.flash_at(0x7_fffe).unwrap().region().range, 0..0x8_0000);
        assert!(matches!(
            session.flash_at(0x2000_0000),
            Err(FlashError::NoSuitableFlash {
                address: 0x2000_0000
            })
        ));
        assert!(matches!(
            session.flash(1),
            Err(FlashError::NoSuchRegion { index: 1 })
        ));
    }

    #[test]
    fn target_without_flash_controller() {
        let (registry, fake) = pac5223();
        let mut target = registry.get_target_by_name("PAC5223").unwrap();
        target.flash_controller = None;
        let mut session = Session::with_target(fake, target);

        assert!(matches!(
            session.flash(0),
            Err(FlashError::NoFlashController { .. })
        ));
    }

    fn with_flash_geometry(page_size: u32, write_align: u32) -> Target {
        let (registry, _) = pac5223();
        let mut target = registry.get_target_by_name("PAC5223").unwrap();
        for region in &mut target.memory_map {
            if let MemoryRegion::Nvm(nvm) = region {
                nvm.flash.page_size = page_size;
                nvm.flash.write_align = write_align;
            }
        }
        target
    }

    #[test_case(0, 2; "zero page size")]
    #[test_case(0x800, 2; "page size differs from the controller")]
    #[test_case(0x400, 1; "byte alignment")]
    #[test_case(0x400, 0; "zero alignment")]
    fn hand_made_target_with_bad_geometry(page_size: u32, write_align: u32) {
        let (_, fake) = pac5223();
        let mut session =
            Session::with_target(fake.clone(), with_flash_geometry(page_size, write_align));

        assert!(matches!(
            session.flash(0),
            Err(FlashError::IncompatibleRegion { .. })
        ));
        assert!(session.flash_at(0).is_err());
        assert!(fake.operations().is_empty());
    }

    #[test]
    fn hand_made_target_with_matching_geometry_erases() {
        let (_, fake) = pac5223();
        let mut session = Session::with_target(fake.clone(), with_flash_geometry(0x400, 4));

        session.flash(0).unwrap().erase(0, 0x800).unwrap();

        assert_eq!(fake.peek(0, 0x800), Some(vec![0xff; 0x800]));
    }

    #[test]
    fn attach_unknown_chip() {
        let (registry, fake) = pac5223();

        assert!(matches!(
            Session::attach(fake, &registry, "PAC9999"),
            Err(Error::ChipNotFound(_))
        ));
    }
}
