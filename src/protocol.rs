//! Register layout of the Sage2 boiler controller.
//!
//! The controller exposes its status as holding registers 0..=193. Only the
//! blocks listed in [`DUMP_BLOCKS`] are fetched; everything in between is
//! treated as unmapped.

use crate::error::{Error, Result};

/// Register address of one 16-bit word.
pub type RegisterAddress = u16;

/// Default Modbus unit identifier of the controller.
pub const DEFAULT_SLAVE: u8 = 1;
/// Default Modbus TCP port.
pub const DEFAULT_TCP_PORT: u16 = 502;
/// The controller's RS-485 interface is fixed to 38400 baud.
pub const SERIAL_BAUD_RATE: u32 = 38400;

/// Upper bound on registers in one "read holding registers" request.
pub const MAX_READ_QUANTITY: u16 = 125;

/// Number of slots in a bulk dump, covering addresses 0..=193.
pub const REGISTER_COUNT: usize = 194;

/// Register holding the maximum modulation rate, used to scale firing rates.
pub const MAX_RATE_ADDRESS: RegisterAddress = 193;

/// The `(address, quantity)` requests that make up one bulk dump.
///
/// Addresses 177..=192 fall between the blocks and are never fetched.
pub const DUMP_BLOCKS: [(RegisterAddress, u16); 3] = [(0, 100), (100, 77), (193, 1)];

/// Returns `true` if `address` is covered by one of the [`DUMP_BLOCKS`].
pub fn is_mapped(address: RegisterAddress) -> bool {
    DUMP_BLOCKS
        .iter()
        .any(|&(start, quantity)| (start..start + quantity).contains(&address))
}

/// Assembles one or two register words into an unsigned 32-bit value.
///
/// A single word is padded with a zero high word. Two words are taken as
/// big-endian `(high, low)` halves.
pub fn assemble(words: &[u16]) -> Result<u32> {
    match *words {
        [low] => Ok(u32::from(low)),
        [high, low] => Ok(u32::from(high) << 16 | u32::from(low)),
        _ => Err(Error::WordCount(words.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn assemble_single_word() {
        assert_eq!(assemble(&[0]).unwrap(), 0);
        assert_eq!(assemble(&[0x1234]).unwrap(), 0x1234);
        assert_eq!(assemble(&[0xFFFF]).unwrap(), 0xFFFF);
    }

    #[test]
    fn assemble_two_words() {
        assert_eq!(assemble(&[0x0001, 0x0002]).unwrap(), 65538);
        assert_eq!(assemble(&[0x8000, 0x01F4]).unwrap(), 2_147_484_148);
        assert_eq!(assemble(&[0, 1234]).unwrap(), 1234);
    }

    #[test]
    fn assemble_rejects_other_lengths() {
        assert_matches!(assemble(&[]), Err(Error::WordCount(0)));
        assert_matches!(assemble(&[1, 2, 3]), Err(Error::WordCount(3)));
    }

    #[test]
    fn dump_blocks_fit_register_space() {
        let total: usize = DUMP_BLOCKS.iter().map(|(_, q)| *q as usize).sum();
        assert_eq!(total, 178);
        for (start, quantity) in DUMP_BLOCKS {
            assert!((1..=MAX_READ_QUANTITY).contains(&quantity));
            assert!((start + quantity) as usize <= REGISTER_COUNT);
        }
    }

    #[test]
    fn mapped_addresses() {
        assert!(is_mapped(0));
        assert!(is_mapped(99));
        assert!(is_mapped(100));
        assert!(is_mapped(176));
        assert!(!is_mapped(177));
        assert!(!is_mapped(185));
        assert!(!is_mapped(192));
        assert!(is_mapped(MAX_RATE_ADDRESS));
        assert!(!is_mapped(194));
    }
}
