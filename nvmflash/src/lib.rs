//! # Flash programming for memory mapped flash controllers
//!
//! nvmflash identifies a microcontroller through a debug transport and
//! programs its flash by driving the flash controller registers directly,
//! without running any code on the target.
//!
//! # Examples
//!
//! ## Detecting and programming a chip
//!
//! ```
//! use nvmflash::{config::Registry, FakeTarget, Session};
//!
//! let registry = Registry::from_builtin_families();
//!
//! // A simulated PAC5223, any `MemoryInterface` works here.
//! let fake = FakeTarget::from_family(registry.get_family("PAC52xx").unwrap(), "PAC5223").unwrap();
//!
//! let mut session = Session::new(fake);
//! if session.auto_detect(&registry)? {
//!     let mut flash = session.flash_at(0x0)?;
//!     flash.erase(0x0, 0x400)?;
//!     flash.program(0x0, &[0x00, 0x20, 0x00, 0x20])?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! nvmflash is built around 3 main interfaces: the [MemoryInterface] trait,
//! the [Target] description and the [Session] struct.

pub mod config;
mod error;
#[warn(missing_docs)]
pub mod flashing;
mod memory;
mod probe;
mod session;
pub mod vendor;

pub use crate::config::Target;
pub use crate::error::Error;
pub use crate::memory::{InvalidDataLengthError, MemoryInterface, MemoryNotAlignedError};
pub use crate::probe::fake_target::{FakeTarget, Operation};
pub use crate::probe::DebugProbeError;
pub use crate::session::Session;
