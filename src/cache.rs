//! Time-bounded cache of the controller's register space.
//!
//! Round trips over the serial link dominate the cost of reading the boiler, so
//! every miss fetches the complete register space in the three requests of
//! [`proto::DUMP_BLOCKS`]. All reads served by one [`CacheEntry`] reflect the
//! same instant.

use crate::{
    error::{Error, Result, TransportError},
    protocol::{self as proto, RegisterAddress},
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// How long a bulk dump is served before it is fetched again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Reads a block of holding registers (function code 3) from the device.
///
/// Implementations must return exactly `quantity` words or fail. Retrying is
/// left to the caller.
pub trait Transport {
    fn read_words(
        &mut self,
        address: RegisterAddress,
        quantity: u16,
    ) -> std::result::Result<Vec<u16>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_words(
        &mut self,
        address: RegisterAddress,
        quantity: u16,
    ) -> std::result::Result<Vec<u16>, TransportError> {
        (**self).read_words(address, quantity)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_words(
        &mut self,
        address: RegisterAddress,
        quantity: u16,
    ) -> std::result::Result<Vec<u16>, TransportError> {
        (**self).read_words(address, quantity)
    }
}

/// One complete bulk dump and the moment it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    words: Vec<Option<u16>>,
    fetched_at: Instant,
}

impl CacheEntry {
    /// Performs a bulk dump through `transport`.
    ///
    /// Either every block is read or the dump fails as a whole.
    pub fn fetch<T: Transport + ?Sized>(transport: &mut T) -> Result<Self> {
        let mut words = vec![None; proto::REGISTER_COUNT];
        for (address, quantity) in proto::DUMP_BLOCKS {
            let block = transport.read_words(address, quantity)?;
            if block.len() != quantity as usize {
                return Err(TransportError::ResponseLength {
                    address,
                    expected: quantity,
                    actual: block.len(),
                }
                .into());
            }
            let start = address as usize;
            for (slot, word) in words[start..start + block.len()].iter_mut().zip(block) {
                *slot = Some(word);
            }
        }
        Ok(Self {
            words,
            fetched_at: Instant::now(),
        })
    }

    /// Returns `count` consecutive words starting at `address`.
    pub fn words_at(&self, address: RegisterAddress, count: usize) -> Result<Vec<u16>> {
        (0..count)
            .map(|offset| {
                let current = address as usize + offset;
                self.words
                    .get(current)
                    .copied()
                    .flatten()
                    .ok_or(Error::UnmappedRegister(current as RegisterAddress))
            })
            .collect()
    }

    /// The word at `address`, if the address was part of the dump.
    pub fn word(&self, address: RegisterAddress) -> Option<u16> {
        self.words.get(address as usize).copied().flatten()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

/// Serves register reads from a [`CacheEntry`], refreshing it through the
/// owned [`Transport`] once it is older than the TTL.
///
/// The entry is replaced wholesale on refresh and never patched. A failed
/// refresh keeps the previous entry installed.
#[derive(Debug)]
pub struct RegisterCache<T> {
    transport: T,
    ttl: Duration,
    entry: Option<Arc<CacheEntry>>,
}

impl<T: Transport> RegisterCache<T> {
    /// Creates an empty cache with the given time-to-live.
    pub fn new(transport: T, ttl: Duration) -> Self {
        Self {
            transport,
            ttl,
            entry: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The installed entry, whether or not it has expired.
    pub fn entry(&self) -> Option<Arc<CacheEntry>> {
        self.entry.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the cache, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Drops the installed entry so the next read performs a bulk dump.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Performs a bulk dump unconditionally and installs the result.
    pub fn refresh(&mut self) -> Result<Arc<CacheEntry>> {
        let started = Instant::now();
        match CacheEntry::fetch(&mut self.transport) {
            Ok(entry) => {
                log::debug!("Register dump completed in {:?}", started.elapsed());
                let entry = Arc::new(entry);
                self.entry = Some(entry.clone());
                Ok(entry)
            }
            Err(error) => {
                log::warn!("Register dump failed, keeping previous entry: {error}");
                Err(error)
            }
        }
    }

    /// Returns the current entry, refreshing it first if it is missing or expired.
    pub fn current(&mut self) -> Result<Arc<CacheEntry>> {
        match &self.entry {
            Some(entry) if !entry.is_expired(self.ttl) => {
                log::trace!("Serving registers from dump aged {:?}", entry.age());
                Ok(entry.clone())
            }
            _ => self.refresh(),
        }
    }

    /// Returns `count` consecutive words starting at `address`.
    pub fn words_at(&mut self, address: RegisterAddress, count: usize) -> Result<Vec<u16>> {
        self.current()?.words_at(address, count)
    }
}
