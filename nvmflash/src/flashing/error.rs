use std::ops::Range;
use std::time::Duration;

use crate::error::Error;

/// The step of a flash operation an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum FlashOperation {
    /// erase
    Erase,
    /// program
    Program,
    /// unlock
    Unlock,
    /// lock
    Lock,
    /// read
    Read,
}

/// Describes any error that happened during erasing, programming or reading flash.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum FlashError {
    /// No target is attached to the session. Run detection or attach a target first.
    NoTargetAttached,

    /// Target {target} has no flash controller description.
    NoFlashController {
        /// Name of the attached target.
        target: String,
    },

    /// Flash region {region:#010x?} of {target} cannot be driven by its flash controller: {reason}
    IncompatibleRegion {
        /// Name of the attached target.
        target: String,
        /// Address range of the flash region.
        region: Range<u64>,
        /// What is wrong with the region geometry.
        reason: &'static str,
    },

    /// The target has no flash region with index {index}.
    NoSuchRegion {
        /// Requested region index.
        index: usize,
    },

    /// No flash region contains address {address:#010x}.
    NoSuitableFlash {
        /// Requested address.
        address: u64,
    },

    /// The range {address:#010x} + {length:#x} is not contained in the flash region {region:#010x?}.
    AddressNotInRegion {
        /// Start of the requested range.
        address: u64,
        /// Length of the requested range in bytes.
        length: u64,
        /// Address range of the flash region.
        region: Range<u64>,
    },

    /// The {operation} of {length:#x} bytes at {address:#010x} is not aligned to {alignment:#x} bytes.
    NotAligned {
        /// The operation that was requested.
        operation: FlashOperation,
        /// Start of the requested range.
        address: u64,
        /// Length of the requested range in bytes.
        length: u64,
        /// Required alignment of address and length.
        alignment: u64,
    },

    /// Timed out after {timeout:?} waiting for the {operation} at {address:#010x} to finish, the status register still reads {status:#010x}.
    Timeout {
        /// The operation that did not finish.
        operation: FlashOperation,
        /// The address the operation was working on.
        address: u64,
        /// Last value read from the status register.
        status: u32,
        /// The timeout that expired.
        timeout: Duration,
    },

    /// Memory access failed during the {operation} at {address:#010x}.
    Memory {
        /// The operation that was running.
        operation: FlashOperation,
        /// The address the operation was working on.
        address: u64,
        /// The error raised by the transport.
        #[source]
        source: Error,
    },
}

impl FlashError {
    /// Returns `true` if the target could not be reached, as opposed to the
    /// target misbehaving or the request being invalid.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, FlashError::Memory { source, .. } if source.is_transport_error())
    }

    /// Returns the address the failed operation was working on, if any.
    pub fn address(&self) -> Option<u64> {
        match self {
            FlashError::NoSuitableFlash { address }
            | FlashError::AddressNotInRegion { address, .. }
            | FlashError::NotAligned { address, .. }
            | FlashError::Timeout { address, .. }
            | FlashError::Memory { address, .. } => Some(*address),
            FlashError::NoTargetAttached
            | FlashError::NoFlashController { .. }
            | FlashError::IncompatibleRegion { .. }
            | FlashError::NoSuchRegion { .. } => None,
        }
    }
}
