#![allow(missing_docs)] // Don't require docs for test code
use std::{ops::Range, sync::Arc};

use nvmflash_target::{ChipFamily, FlashControllerRegisters, MemoryRegion};
use parking_lot::Mutex;

use crate::{memory::MemoryNotAlignedError, probe::DebugProbeError, Error, MemoryInterface};

/// A single memory access seen by the [`FakeTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read32 { address: u64, value: u32 },
    Read8 { address: u64, length: usize },
    Write32 { address: u64, value: u32 },
    Write16 { address: u64, value: u16 },
}

impl Operation {
    /// Returns `true` for writes.
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Write32 { .. } | Operation::Write16 { .. })
    }
}

/// This is a simulated target with a memory mapped flash controller which can be used
/// for mocking things in tests or for dry runs.
///
/// The simulation follows the register protocol described by a
/// [`FlashControllerRegisters`] table: flash writes are only accepted while the
/// controller is unlocked and can only clear bits, page erases set the whole
/// page to the erased value and keep the status register busy for a
/// configurable number of reads.
///
/// Clones share the same simulated target, so a test can keep one clone to
/// inspect the recorded [`Operation`]s after handing the other to a
/// [`Session`](crate::Session).
#[derive(Clone)]
pub struct FakeTarget {
    state: Arc<Mutex<FakeTargetState>>,
}

struct FakeMemory {
    range: Range<u64>,
    data: Vec<u8>,
    is_flash: bool,
}

impl FakeMemory {
    fn offset(&self, address: u64, length: usize) -> Option<usize> {
        let end = address.checked_add(length as u64)?;
        if address >= self.range.start && end <= self.range.end {
            Some((address - self.range.start) as usize)
        } else {
            None
        }
    }
}

struct FakeTargetState {
    id_register: Option<(u64, u32)>,
    registers: FlashControllerRegisters,
    erased_byte_value: u8,
    memories: Vec<FakeMemory>,

    unlocked: bool,
    selected_page: u32,
    busy_status: u32,
    busy_reads_left: u32,

    erase_busy_reads: u32,
    write_busy_reads: u32,
    stuck_busy: bool,
    fail_halfword_write: Option<usize>,
    halfword_writes: usize,
    disconnected: bool,

    operations: Vec<Operation>,
}

impl FakeTarget {
    /// Creates a target with the given flash controller and no memory.
    pub fn new(registers: FlashControllerRegisters) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeTargetState {
                id_register: None,
                registers,
                erased_byte_value: 0xff,
                memories: Vec::new(),
                unlocked: false,
                selected_page: 0,
                busy_status: 0,
                busy_reads_left: 0,
                erase_busy_reads: 0,
                write_busy_reads: 0,
                stuck_busy: false,
                fail_halfword_write: None,
                halfword_writes: 0,
                disconnected: false,
                operations: Vec::new(),
            })),
        }
    }

    /// Creates a target which looks like the `variant` of `family`.
    ///
    /// The identification register answers with the first signature listed for
    /// the variant, and every memory region of the variant is backed by
    /// simulated memory. Flash starts out fully programmed to zero, so erases
    /// are observable.
    pub fn from_family(family: &ChipFamily, variant: &str) -> Option<Self> {
        let registers = family.flash_controller?;
        let chip = family.get_chip(variant)?;

        let target = Self::new(registers);

        let id = family
            .chip_detection
            .iter()
            .filter_map(|method| method.as_id_register())
            .find_map(|detection| {
                detection
                    .variants
                    .iter()
                    .find(|v| v.target.eq_ignore_ascii_case(&chip.name))
                    .map(|v| (detection.register, v.id_value))
            });
        if let Some((register, value)) = id {
            target.state.lock().id_register = Some((register, value));
        }

        for region in &chip.memory_map {
            match region {
                MemoryRegion::Ram(ram) => target.add_ram(ram.range.clone()),
                MemoryRegion::Nvm(nvm) => {
                    target.state.lock().erased_byte_value = nvm.flash.erased_byte_value;
                    target.add_flash(nvm.range.clone(), 0x00);
                }
            }
        }

        Some(target)
    }

    /// Sets the identification register to answer `value` at `address`.
    pub fn with_id_register(self, address: u64, value: u32) -> Self {
        self.state.lock().id_register = Some((address, value));
        self
    }

    /// Changes the value of the identification register, keeping its address.
    pub fn with_id_value(self, value: u32) -> Self {
        if let Some((_, id)) = self.state.lock().id_register.as_mut() {
            *id = value;
        }
        self
    }

    /// The status register reports the erase as busy for `reads` reads after each erase command.
    pub fn with_erase_busy_reads(self, reads: u32) -> Self {
        self.state.lock().erase_busy_reads = reads;
        self
    }

    /// The status register reports a write as busy for `reads` reads after each flash write.
    pub fn with_write_busy_reads(self, reads: u32) -> Self {
        self.state.lock().write_busy_reads = reads;
        self
    }

    /// The status register never clears after a command, like a faulty or unpowered flash.
    pub fn with_stuck_busy(self) -> Self {
        self.state.lock().stuck_busy = true;
        self
    }

    /// The `index`-th halfword write (counting from zero) is not acknowledged.
    pub fn fail_halfword_write(self, index: usize) -> Self {
        self.state.lock().fail_halfword_write = Some(index);
        self
    }

    /// Adds simulated RAM.
    pub fn add_ram(&self, range: Range<u64>) {
        let data = vec![0; (range.end - range.start) as usize];
        self.state.lock().memories.push(FakeMemory {
            range,
            data,
            is_flash: false,
        });
    }

    /// Adds simulated flash, initially filled with `fill`.
    pub fn add_flash(&self, range: Range<u64>, fill: u8) {
        let data = vec![fill; (range.end - range.start) as usize];
        self.state.lock().memories.push(FakeMemory {
            range,
            data,
            is_flash: true,
        });
    }

    /// Simulates losing the connection to the target. Every following access fails.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    /// Returns all accesses seen so far, oldest first.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().operations.clone()
    }

    /// Returns only the writes seen so far, oldest first.
    pub fn writes(&self) -> Vec<Operation> {
        self.operations()
            .into_iter()
            .filter(Operation::is_write)
            .collect()
    }

    /// Forgets all recorded accesses.
    pub fn clear_operations(&self) {
        self.state.lock().operations.clear();
    }

    /// Returns `true` if flash writes are currently accepted.
    pub fn is_unlocked(&self) -> bool {
        self.state.lock().unlocked
    }

    /// Reads simulated memory directly, bypassing the transport.
    pub fn peek(&self, address: u64, length: usize) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state.memories.iter().find_map(|memory| {
            memory
                .offset(address, length)
                .map(|offset| memory.data[offset..offset + length].to_vec())
        })
    }
}

impl FakeTargetState {
    fn check_connected(&self) -> Result<(), Error> {
        if self.disconnected {
            Err(DebugProbeError::NotAttached.into())
        } else {
            Ok(())
        }
    }

    fn memory_mut(&mut self, address: u64, length: usize) -> Option<(&mut FakeMemory, usize)> {
        self.memories.iter_mut().find_map(|memory| {
            memory
                .offset(address, length)
                .map(move |offset| (memory, offset))
        })
    }

    fn read_status(&mut self) -> u32 {
        if self.stuck_busy {
            return self.busy_status | self.registers.status_erase_busy;
        }

        if self.busy_reads_left > 0 {
            self.busy_reads_left -= 1;
            self.busy_status
        } else {
            self.busy_status = 0;
            0
        }
    }

    fn read_word(&mut self, address: u64) -> Result<u32, Error> {
        let registers = self.registers;

        let value = if Some(address) == self.id_register.map(|(register, _)| register) {
            self.id_register.map(|(_, id)| id).unwrap_or_default()
        } else if address == registers.status_register {
            self.read_status()
        } else if address == registers.lock_register {
            if self.unlocked {
                registers.unlock_value
            } else {
                registers.lock_value
            }
        } else if address == registers.page_register {
            self.selected_page
        } else {
            let (memory, offset) =
                self.memory_mut(address, 4)
                    .ok_or(DebugProbeError::TransferFailed {
                        access: "read_32",
                        address,
                    })?;
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&memory.data[offset..offset + 4]);
            u32::from_le_bytes(bytes)
        };

        tracing::trace!("[read_32] {:#010x} = {:#010x}", address, value);
        self.operations.push(Operation::Read32 { address, value });

        Ok(value)
    }

    fn write_word(&mut self, address: u64, value: u32) -> Result<(), Error> {
        let registers = self.registers;
        tracing::trace!("[write_32] {:#010x} = {:#010x}", address, value);

        if address == registers.lock_register {
            self.unlocked = value == registers.unlock_value;
        } else if address == registers.page_register {
            self.selected_page = value;
        } else if address == registers.page_erase_register {
            if value == registers.erase_start_value {
                self.erase_selected_page();
            } else {
                tracing::warn!("Ignoring erase command with wrong key {:#010x}", value);
            }
        } else {
            let (memory, offset) =
                self.memory_mut(address, 4)
                    .ok_or(DebugProbeError::TransferFailed {
                        access: "write_32",
                        address,
                    })?;
            if memory.is_flash {
                // Flash is only writable through the halfword program path.
                tracing::warn!("Ignoring word write to flash at {:#010x}", address);
            } else {
                memory.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
        }

        self.operations.push(Operation::Write32 { address, value });
        Ok(())
    }

    fn erase_selected_page(&mut self) {
        let page = self.selected_page;
        let page_size = self.registers.page_size as u64;
        let page_start = page as u64 * page_size;
        let erased = self.erased_byte_value;

        match self.memory_mut(page_start, page_size as usize) {
            Some((memory, offset)) if memory.is_flash => {
                memory.data[offset..offset + page_size as usize].fill(erased);
            }
            _ => {
                tracing::warn!("Erase of page {} hits no flash", page);
            }
        }

        self.busy_status = self.registers.status_erase_busy;
        self.busy_reads_left = self.erase_busy_reads;
    }

    fn write_halfword(&mut self, address: u64, value: u16) -> Result<(), Error> {
        MemoryNotAlignedError::check(address, 2)?;

        let index = self.halfword_writes;
        self.halfword_writes += 1;
        if self.fail_halfword_write == Some(index) {
            return Err(DebugProbeError::TransferFailed {
                access: "write_16",
                address,
            }
            .into());
        }

        let unlocked = self.unlocked;
        let (memory, offset) =
            self.memory_mut(address, 2)
                .ok_or(DebugProbeError::TransferFailed {
                    access: "write_16",
                    address,
                })?;

        let bytes = value.to_le_bytes();
        if !memory.is_flash {
            memory.data[offset..offset + 2].copy_from_slice(&bytes);
        } else if unlocked {
            // Programming can only clear bits.
            memory.data[offset] &= bytes[0];
            memory.data[offset + 1] &= bytes[1];
            self.busy_status = self.registers.status_write_busy;
            self.busy_reads_left = self.write_busy_reads;
        } else {
            tracing::warn!("Ignoring write to locked flash at {:#010x}", address);
        }

        tracing::trace!("[write_16] {:#010x} = {:#06x}", address, value);
        self.operations.push(Operation::Write16 { address, value });

        Ok(())
    }
}

impl MemoryInterface for FakeTarget {
    fn read_32(&mut self, address: u64, data: &mut [u32]) -> Result<(), Error> {
        MemoryNotAlignedError::check(address, 4)?;

        let mut state = self.state.lock();
        state.check_connected()?;

        for (i, word) in data.iter_mut().enumerate() {
            *word = state.read_word(address + i as u64 * 4)?;
        }

        Ok(())
    }

    fn read_8(&mut self, address: u64, data: &mut [u8]) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.check_connected()?;

        let (memory, offset) =
            state
                .memory_mut(address, data.len())
                .ok_or(DebugProbeError::TransferFailed {
                    access: "read_8",
                    address,
                })?;
        data.copy_from_slice(&memory.data[offset..offset + data.len()]);

        state.operations.push(Operation::Read8 {
            address,
            length: data.len(),
        });

        Ok(())
    }

    fn write_32(&mut self, address: u64, data: &[u32]) -> Result<(), Error> {
        MemoryNotAlignedError::check(address, 4)?;

        let mut state = self.state.lock();
        state.check_connected()?;

        for (i, word) in data.iter().enumerate() {
            state.write_word(address + i as u64 * 4, *word)?;
        }

        Ok(())
    }

    fn write_16(&mut self, address: u64, data: &[u16]) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.check_connected()?;

        for (i, halfword) in data.iter().enumerate() {
            state.write_halfword(address + i as u64 * 2, *halfword)?;
        }

        Ok(())
    }
}
