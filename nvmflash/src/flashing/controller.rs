use std::time::{Duration, Instant};

use nvmflash_target::{FlashControllerRegisters, NvmRegion};

use super::{FlashError, FlashOperation};
use crate::MemoryInterface;

/// Register level driver of a memory mapped flash controller.
///
/// The controller is parameterised by the register table of the chip family,
/// so no addresses or command values are hard coded here.
pub(crate) struct FlashController<'s> {
    memory: &'s mut dyn MemoryInterface,
    registers: FlashControllerRegisters,
    poll_interval: Duration,
}

impl<'s> FlashController<'s> {
    pub(crate) fn new(
        memory: &'s mut dyn MemoryInterface,
        registers: FlashControllerRegisters,
        poll_interval: Duration,
    ) -> Self {
        Self {
            memory,
            registers,
            poll_interval,
        }
    }

    /// Checks that a flash region can be erased and programmed through these registers.
    ///
    /// Target descriptions from the registry are validated already, this
    /// covers targets which were put together by hand.
    pub(crate) fn check_region(
        registers: &FlashControllerRegisters,
        region: &NvmRegion,
    ) -> Result<(), &'static str> {
        let flash = &region.flash;

        if flash.page_size == 0 {
            return Err("the page size is zero");
        }
        if flash.page_size != registers.page_size {
            return Err("the page size differs from the page size of the controller");
        }
        if flash.write_align == 0 || flash.write_align % 2 != 0 {
            return Err("the write alignment is not a whole number of halfwords");
        }
        if region.range.start % flash.page_size as u64 != 0
            || region.len() % flash.page_size as u64 != 0
        {
            return Err("the region is not a whole number of pages");
        }

        Ok(())
    }

    fn write_register(
        &mut self,
        operation: FlashOperation,
        address: u64,
        register: u64,
        value: u32,
    ) -> Result<(), FlashError> {
        self.memory
            .write_word_32(register, value)
            .map_err(|source| FlashError::Memory {
                operation,
                address,
                source,
            })
    }

    /// Polls the status register until `status & mask` is zero.
    ///
    /// The register is read at least once, even if `timeout` is zero.
    fn wait_for_status(
        &mut self,
        operation: FlashOperation,
        address: u64,
        mask: u32,
        timeout: Duration,
    ) -> Result<(), FlashError> {
        let start = Instant::now();

        loop {
            let status = self
                .memory
                .read_word_32(self.registers.status_register)
                .map_err(|source| FlashError::Memory {
                    operation,
                    address,
                    source,
                })?;

            if status & mask == 0 {
                return Ok(());
            }

            if start.elapsed() > timeout {
                tracing::debug!(
                    "Flash status {:#010x} did not clear within {:?}",
                    status,
                    timeout
                );
                return Err(FlashError::Timeout {
                    operation,
                    address,
                    status,
                    timeout,
                });
            }

            std::thread::sleep(self.poll_interval);
        }
    }

    /// Erases the page containing `address` and waits until the controller is idle.
    pub(crate) fn erase_page(&mut self, address: u64, timeout: Duration) -> Result<(), FlashError> {
        let page = self.registers.page_index(address);
        tracing::debug!("Erasing page {} at {:#010x}", page, address);

        self.write_register(
            FlashOperation::Erase,
            address,
            self.registers.page_register,
            page,
        )?;
        self.write_register(
            FlashOperation::Erase,
            address,
            self.registers.page_erase_register,
            self.registers.erase_start_value,
        )?;

        // Any set bit means busy, not only the erase bit.
        self.wait_for_status(FlashOperation::Erase, address, u32::MAX, timeout)
    }

    /// Opens the write protection.
    ///
    /// The returned guard closes it again when dropped, so flash is locked on
    /// every exit path. Use [`UnlockedFlash::lock`] to get the result of the
    /// final lock write.
    pub(crate) fn unlock(&mut self) -> Result<UnlockedFlash<'_, 's>, FlashError> {
        let lock_register = self.registers.lock_register;
        let unlock_value = self.registers.unlock_value;

        // Created before the write, so a failed unlock still locks.
        let mut guard = UnlockedFlash {
            controller: self,
            locked: false,
        };
        guard.controller.write_register(
            FlashOperation::Unlock,
            lock_register,
            lock_register,
            unlock_value,
        )?;

        Ok(guard)
    }

    fn write_lock(&mut self) -> Result<(), FlashError> {
        let lock_register = self.registers.lock_register;
        self.write_register(
            FlashOperation::Lock,
            lock_register,
            lock_register,
            self.registers.lock_value,
        )?;

        self.memory.flush().map_err(|source| FlashError::Memory {
            operation: FlashOperation::Lock,
            address: lock_register,
            source,
        })
    }

    /// Programs `data` as little endian halfwords starting at `address`.
    ///
    /// With `wait` set, the write busy bit has to clear within that time after
    /// every halfword. An error while streaming takes precedence over an error
    /// while locking.
    pub(crate) fn program(
        &mut self,
        address: u64,
        data: &[u8],
        wait: Option<Duration>,
    ) -> Result<(), FlashError> {
        if address % 2 != 0 || data.len() % 2 != 0 {
            return Err(FlashError::NotAligned {
                operation: FlashOperation::Program,
                address,
                length: data.len() as u64,
                alignment: 2,
            });
        }

        let mut flash = self.unlock()?;

        for (index, chunk) in data.chunks_exact(2).enumerate() {
            let halfword_address = address + index as u64 * 2;
            let value = u16::from_le_bytes([chunk[0], chunk[1]]);

            flash.write_halfword(halfword_address, value)?;
            if let Some(timeout) = wait {
                flash.wait_for_write(halfword_address, timeout)?;
            }
        }

        flash.lock()
    }

    /// Reads flash contents through the transport.
    pub(crate) fn read(&mut self, address: u64, data: &mut [u8]) -> Result<(), FlashError> {
        self.memory
            .read(address, data)
            .map_err(|source| FlashError::Memory {
                operation: FlashOperation::Read,
                address,
                source,
            })
    }
}

/// Flash with open write protection.
pub(crate) struct UnlockedFlash<'c, 's> {
    controller: &'c mut FlashController<'s>,
    locked: bool,
}

impl UnlockedFlash<'_, '_> {
    fn write_halfword(&mut self, address: u64, value: u16) -> Result<(), FlashError> {
        self.controller
            .memory
            .write_word_16(address, value)
            .map_err(|source| FlashError::Memory {
                operation: FlashOperation::Program,
                address,
                source,
            })
    }

    fn wait_for_write(&mut self, address: u64, timeout: Duration) -> Result<(), FlashError> {
        let mask = self.controller.registers.status_write_busy;
        self.controller
            .wait_for_status(FlashOperation::Program, address, mask, timeout)
    }

    /// Closes the write protection and reports whether that worked.
    pub(crate) fn lock(mut self) -> Result<(), FlashError> {
        self.locked = true;
        self.controller.write_lock()
    }
}

impl Drop for UnlockedFlash<'_, '_> {
    fn drop(&mut self) {
        if self.locked {
            return;
        }

        if let Err(error) = self.controller.write_lock() {
            tracing::warn!("Failed to lock flash after an aborted write: {}", error);
        }
    }
}
