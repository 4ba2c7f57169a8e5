use std::ops::Range;
use std::time::Instant;

use nvmflash_target::{FlashProperties, MemoryRange, NvmRegion};

use super::controller::FlashController;
use super::{FlashError, FlashOperation, FlashOptions, FlashProgress};

/// Erases, programs and reads one flash region of the attached target.
///
/// Obtained from [`Session::flash`](crate::Session::flash) or
/// [`Session::flash_at`](crate::Session::flash_at). The handle borrows the
/// session mutably, so only one operation can run on a target at a time.
pub struct FlashRegionHandle<'s> {
    controller: FlashController<'s>,
    region: &'s NvmRegion,
    options: &'s FlashOptions,
    progress: Option<&'s FlashProgress>,
}

impl<'s> FlashRegionHandle<'s> {
    pub(crate) fn new(
        controller: FlashController<'s>,
        region: &'s NvmRegion,
        options: &'s FlashOptions,
    ) -> Self {
        Self {
            controller,
            region,
            options,
            progress: None,
        }
    }

    /// Reports erase and program progress to `progress`.
    pub fn with_progress(mut self, progress: &'s FlashProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The flash region this handle operates on.
    pub fn region(&self) -> &NvmRegion {
        self.region
    }

    /// Geometry of the flash region.
    pub fn properties(&self) -> &FlashProperties {
        &self.region.flash
    }

    fn check_range(&self, address: u64, length: u64) -> Result<(), FlashError> {
        let range = &self.region.range;
        let inside = address
            .checked_add(length)
            .is_some_and(|end| address >= range.start && end <= range.end);

        if inside {
            Ok(())
        } else {
            Err(FlashError::AddressNotInRegion {
                address,
                length,
                region: range.clone(),
            })
        }
    }

    /// Erases `length` bytes starting at `address`, one page at a time.
    ///
    /// Both `address` and `length` have to be multiples of the page size.
    /// Erasing zero bytes does nothing. Afterwards every byte of the range
    /// reads as the erased value of the region.
    pub fn erase(&mut self, address: u64, length: u64) -> Result<(), FlashError> {
        let page_size = self.region.flash.page_size as u64;
        if address % page_size != 0 || length % page_size != 0 {
            return Err(FlashError::NotAligned {
                operation: FlashOperation::Erase,
                address,
                length,
                alignment: page_size,
            });
        }

        if length == 0 {
            return Ok(());
        }

        self.check_range(address, length)?;

        let pages = length / page_size;
        tracing::debug!(
            "Erasing {} pages from {:#010x} in {}",
            pages,
            address,
            self.region.name.as_deref().unwrap_or("flash")
        );

        if let Some(progress) = self.progress {
            progress.started_erasing(pages as usize);
        }

        let result = self.erase_pages(address..address + length);

        if let Some(progress) = self.progress {
            if result.is_ok() {
                progress.finished_erasing();
            } else {
                progress.failed_erasing();
            }
        }

        result
    }

    fn erase_pages(&mut self, range: Range<u64>) -> Result<(), FlashError> {
        let region = self.region;
        let timeout = self.options.erase_timeout(&region.flash);

        let pages = region
            .iter_pages()
            .filter(|page| range.contains_range(&page.address_range()));

        for page in pages {
            let t = Instant::now();

            self.controller.erase_page(page.base_address, timeout)?;

            if let Some(progress) = self.progress {
                progress.sector_erased(page.base_address, page.size, t.elapsed());
            }
        }

        Ok(())
    }

    /// Erases the whole region.
    pub fn erase_all(&mut self) -> Result<(), FlashError> {
        self.erase(self.region.start(), self.region.len())
    }

    /// Programs `data` starting at `address`.
    ///
    /// The target range has to be erased beforehand, programming can only
    /// clear bits. `address` and the length of `data` have to be multiples of
    /// the write alignment of the region. Flash is locked again when this
    /// returns, whether programming succeeded or not.
    pub fn program(&mut self, address: u64, data: &[u8]) -> Result<(), FlashError> {
        let length = data.len() as u64;
        let alignment = self.region.flash.write_align as u64;
        if address % alignment != 0 || length % alignment != 0 {
            return Err(FlashError::NotAligned {
                operation: FlashOperation::Program,
                address,
                length,
                alignment,
            });
        }

        if data.is_empty() {
            return Ok(());
        }

        self.check_range(address, length)?;

        tracing::debug!("Programming {} bytes at {:#010x}", data.len(), address);

        let wait = self
            .options
            .wait_for_write
            .then(|| self.options.program_timeout(&self.region.flash));

        if let Some(progress) = self.progress {
            progress.started_programming(data.len());
        }

        let t = Instant::now();
        let result = self.controller.program(address, data, wait);

        if let Some(progress) = self.progress {
            match result {
                Ok(()) => {
                    progress.data_programmed(address, data.len(), t.elapsed());
                    progress.finished_programming();
                }
                Err(_) => progress.failed_programming(),
            }
        }

        result
    }

    /// Reads flash contents starting at `address` into `data`.
    pub fn read(&mut self, address: u64, data: &mut [u8]) -> Result<(), FlashError> {
        if data.is_empty() {
            return Ok(());
        }

        self.check_range(address, data.len() as u64)?;
        self.controller.read(address, data)
    }
}
