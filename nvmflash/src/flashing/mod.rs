//! Erasing and programming of memory mapped flash.
//!
//! Flash is accessed through a [`FlashRegionHandle`], which is obtained from a
//! [`Session`](crate::Session) with an attached target:
//!
//! ```
//! use nvmflash::{config::Registry, FakeTarget, Session};
//!
//! let registry = Registry::from_builtin_families();
//! let family = registry.get_family("PAC52xx").unwrap();
//! let fake = FakeTarget::from_family(family, "PAC5223").unwrap();
//!
//! let mut session = Session::new(fake);
//! assert!(session.auto_detect(&registry)?);
//!
//! let mut flash = session.flash(0)?;
//! flash.erase(0, 0x400)?;
//! flash.program(0x100, &[0xde, 0xad, 0xbe, 0xef])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod controller;
mod error;
mod options;
mod progress;
mod region;

pub(crate) use controller::FlashController;
pub use error::{FlashError, FlashOperation};
pub use options::FlashOptions;
pub use progress::{FlashProgress, ProgressEvent};
pub use region::FlashRegionHandle;
