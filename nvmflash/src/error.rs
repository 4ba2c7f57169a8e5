use crate::config::RegistryError;
use crate::memory::{InvalidDataLengthError, MemoryNotAlignedError};
use crate::probe::DebugProbeError;

/// The overarching error type which contains all possible errors as variants.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// An error with the usage of the probe occurred
    Probe(#[from] DebugProbeError),
    /// {0}
    MemoryNotAligned(#[from] MemoryNotAlignedError),
    /// {0}
    InvalidDataLength(#[from] InvalidDataLengthError),
    /// Unable to load the description of the chip
    ChipNotFound(#[from] RegistryError),
    /// An error occurred: {0}
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Returns `true` if the error was raised by the transport to the target,
    /// e.g. because the probe was disconnected.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Probe(_))
    }
}
