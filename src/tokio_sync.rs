//! Synchronous `tokio-modbus` transport for the Sage2 controller.
//!
//! [`Transport`] is implemented for `tokio_modbus::client::sync::Context`, so a
//! connected context can be handed straight to [`crate::boiler::Boiler`]. Every
//! call blocks the current thread until the device answers or the context's
//! timeout elapses.
//!
//! # Examples
//!
//! ## TCP Example
//!
//! ```no_run
//! use sage2_lib::{boiler::Boiler, tokio_sync};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A missing port defaults to 502
//!     let ctx = tokio_sync::connect_tcp("boiler.local", 1, Duration::from_secs(1))?;
//!     let boiler = Boiler::new(ctx);
//!     println!("{}", boiler.tabulate(true)?);
//!     Ok(())
//! }
//! ```
//!
//! ## RTU Example
//!
//! ```no_run
//! use sage2_lib::{boiler::Boiler, tokio_sync};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_sync::connect_rtu("/dev/ttyUSB0", 1, Duration::from_secs(1))?;
//!     let boiler = Boiler::new(ctx);
//!     println!("{}", boiler.by_name("Burner State")?.sample()?);
//!     Ok(())
//! }
//! ```

use crate::{cache::Transport, error::TransportError, protocol as proto};
use std::time::Duration;
use tokio_modbus::{client::sync::Context, prelude::SyncReader};

/// Helper function to map tokio result to our result.
fn map_tokio_result<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
    match result {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.into()), // Modbus exception
        Err(err) => Err(err.into()),     // IO error
    }
}

impl Transport for Context {
    fn read_words(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>, TransportError> {
        if !(1..=proto::MAX_READ_QUANTITY).contains(&quantity) {
            return Err(TransportError::Quantity(quantity));
        }
        let words = map_tokio_result(self.read_holding_registers(address, quantity))?;
        if words.len() != quantity as usize {
            return Err(TransportError::ResponseLength {
                address,
                expected: quantity,
                actual: words.len(),
            });
        }
        Ok(words)
    }
}

/// Resolves `host` or `host:port`, defaulting to port 502.
#[cfg(feature = "tokio-tcp-sync")]
pub fn resolve_tcp_address(address: &str) -> Result<std::net::SocketAddr, TransportError> {
    use std::net::ToSocketAddrs;

    let mut candidates = match address.to_socket_addrs() {
        Ok(candidates) => candidates,
        Err(_) => (address, proto::DEFAULT_TCP_PORT).to_socket_addrs()?,
    };
    candidates.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Cannot resolve address '{address}'"),
        )
        .into()
    })
}

/// Connects to the controller via Modbus TCP.
///
/// # Arguments
///
/// * `address` - `host` or `host:port` of the controller or gateway.
/// * `slave` - The Modbus unit identifier.
/// * `timeout` - The duration before a request times out.
#[cfg(feature = "tokio-tcp-sync")]
pub fn connect_tcp(address: &str, slave: u8, timeout: Duration) -> Result<Context, TransportError> {
    let socket_addr = resolve_tcp_address(address)?;
    log::info!("Connecting via TCP to {socket_addr} (slave {slave})");
    let mut ctx =
        tokio_modbus::client::sync::tcp::connect_slave(socket_addr, tokio_modbus::Slave(slave))?;
    ctx.set_timeout(timeout);
    Ok(ctx)
}

/// Connects to the controller via Modbus RTU at 38400 baud.
///
/// # Arguments
///
/// * `device` - The serial port device (e.g., `/dev/ttyUSB0`).
/// * `slave` - The Modbus unit identifier.
/// * `timeout` - The duration before a request times out.
#[cfg(feature = "tokio-rtu-sync")]
pub fn connect_rtu(device: &str, slave: u8, timeout: Duration) -> Result<Context, TransportError> {
    log::info!(
        "Connecting via RTU to {device} at {} baud (slave {slave})",
        proto::SERIAL_BAUD_RATE
    );
    let mut ctx = tokio_modbus::client::sync::rtu::connect_slave(
        &crate::tokio_common::serial_port_builder(device),
        tokio_modbus::Slave(slave),
    )?;
    ctx.set_timeout(timeout);
    Ok(ctx)
}

#[cfg(all(test, feature = "tokio-tcp-sync"))]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_and_without_port() {
        assert_eq!(
            resolve_tcp_address("127.0.0.1:1502").unwrap(),
            "127.0.0.1:1502".parse().unwrap()
        );
        assert_eq!(
            resolve_tcp_address("127.0.0.1").unwrap(),
            "127.0.0.1:502".parse().unwrap()
        );
    }
}
