//! Error types shared by the register cache, the decoders and the transports.

/// A failure to fetch registers from the controller.
///
/// None of these are retried by the library. A failed bulk dump leaves the
/// previous cache entry in place and the next access performs a fresh dump.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Wraps `std::io::Error` (connection refused, timeout, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wraps `tokio_modbus::Error`.
    #[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
    #[error(transparent)]
    Modbus(#[from] tokio_modbus::Error),

    /// Wraps `tokio_modbus::ExceptionCode`.
    #[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
    #[error("Modbus exception: {0}")]
    Exception(#[from] tokio_modbus::ExceptionCode),

    /// The device answered with a different number of registers than requested.
    #[error("Expected {expected} registers starting at {address}, device returned {actual}")]
    ResponseLength {
        address: u16,
        expected: u16,
        actual: usize,
    },

    /// A single holding register read is limited to 1..=125 registers.
    #[error("Cannot read {0} registers in one request, the limit is 1 to 125")]
    Quantity(u16),
}

/// Represents all errors surfaced by [`crate::boiler::Boiler`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The address lies in the gap 177..=192 or beyond 193. The register map
    /// itself is wrong when this happens.
    #[error("Register {0} is not mapped on this device")]
    UnmappedRegister(u16),

    /// Only one or two words can be assembled into a value.
    #[error("Cannot assemble {0} words, a value spans 1 or 2 registers")]
    WordCount(usize),

    #[error("No reading named '{0}'")]
    NameNotFound(String),
}

/// The result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
