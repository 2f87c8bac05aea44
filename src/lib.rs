//! A library for reading the Sage2 boiler controller via Modbus.
//!
//! The controller publishes its state as a fixed bank of holding registers.
//! This crate fetches them in bulk, caches the dump for a short time and
//! decodes the raw words into temperatures, percentages, states and counters.
//!
//! ## Layers
//!
//! 1.  **Transport**: anything implementing [`cache::Transport`]. The
//!     [`tokio_sync`] module implements it for a synchronous `tokio-modbus`
//!     context over TCP or RTU.
//! 2.  **Register cache**: [`cache::RegisterCache`] turns individual reads into
//!     one bulk dump that is valid for 10 seconds.
//! 3.  **Readings**: [`reading::ReadingKind`] decodes a register value, the
//!     [`registry::REGISTRY`] names every reading of the device.
//! 4.  **Facade**: [`boiler::Boiler`] binds the registry to a cache and renders
//!     samples and tables.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sage2_lib::{boiler::Boiler, tokio_sync};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_sync::connect_tcp("192.168.1.100", 1, Duration::from_secs(1))?;
//!     let boiler = Boiler::new(ctx);
//!
//!     for reading in boiler.summary_readings() {
//!         println!("{}", reading.format()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod boiler;
pub mod cache;
pub mod error;
pub mod protocol;
pub mod reading;
pub mod registry;

#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
#[cfg(feature = "serde")]
pub mod config;

#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_common;

#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync")))
)]
#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_sync;

pub use error::{Error, Result, TransportError};
