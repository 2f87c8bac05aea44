//! Serial line settings shared by the `tokio` based transports.
//!
//! The Sage2 controller's Modbus RTU interface runs at a fixed 38400 baud, 8N1.
use crate::protocol as proto;

/// The parity used for serial communication.
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Creates a `tokio_serial::SerialPortBuilder` for the controller.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
pub fn serial_port_builder(device: &str) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, proto::SERIAL_BAUD_RATE)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}
