//! High-level access to the Sage2 boiler controller.
//!
//! A [`Boiler`] owns the [`Transport`] and the [`RegisterCache`] in front of it.
//! Readings are looked up in the static [`REGISTRY`] and bound to the boiler on
//! access; every value they return is served from the current bulk dump.
//!
//! ## Example
//!
//! ```no_run
//! use sage2_lib::{boiler::Boiler, tokio_sync};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_sync::connect_tcp("192.168.1.100:502", 1, Duration::from_secs(1))?;
//!     let boiler = Boiler::new(ctx);
//!
//!     println!("{}", boiler.by_name("Supply Sensor")?.sample()?);
//!     println!("{}", boiler.tabulate(true)?);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    cache::{self, CacheEntry, RegisterCache, Transport},
    error::{Error, Result},
    protocol::{self as proto, RegisterAddress},
    reading::{self, ReadingKind, Sample, Value},
    registry::{self, RegisterEntry, REGISTRY},
};
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// One boiler controller behind a caching transport.
///
/// The transport and the cache share one lock, so at most one bulk dump is in
/// flight and concurrent readers wait for it instead of issuing their own.
/// Share the boiler between threads with an `Arc`.
#[derive(Debug)]
pub struct Boiler<T> {
    cache: Mutex<RegisterCache<T>>,
}

impl<T: Transport> Boiler<T> {
    /// Creates a boiler with the default cache TTL of 10 seconds.
    pub fn new(transport: T) -> Self {
        Self::with_cache_ttl(transport, cache::DEFAULT_TTL)
    }

    pub fn with_cache_ttl(transport: T, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(RegisterCache::new(transport, ttl)),
        }
    }

    /// Consumes the boiler, returning the transport.
    pub fn into_transport(self) -> T {
        self.cache
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_transport()
    }

    /// The cache is only ever replaced wholesale, so a poisoned lock still
    /// guards a consistent state.
    fn lock(&self) -> MutexGuard<'_, RegisterCache<T>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the transport.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(self.lock().transport_mut())
    }

    /// Reads one or two registers and assembles them into a 32-bit value.
    pub fn read(&self, address: RegisterAddress, count: usize) -> Result<u32> {
        if !(1..=2).contains(&count) {
            return Err(Error::WordCount(count));
        }
        proto::assemble(&self.lock().words_at(address, count)?)
    }

    /// Forces a bulk dump, regardless of the age of the current one.
    pub fn refresh(&self) -> Result<Arc<CacheEntry>> {
        self.lock().refresh()
    }

    /// The installed dump, refreshed first when it is missing or expired.
    fn current(&self) -> Result<Arc<CacheEntry>> {
        self.lock().current()
    }

    /// The installed dump, if any, without refreshing it.
    pub fn cache_entry(&self) -> Option<Arc<CacheEntry>> {
        self.lock().entry()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.lock().ttl()
    }

    /// Binds a register map entry to this boiler.
    pub fn reading(&self, entry: &'static RegisterEntry) -> Reading<'_, T> {
        Reading { boiler: self, entry }
    }

    /// Looks up a reading by its key (`supply_sensor`) or title (`Supply Sensor`).
    pub fn by_name(&self, name: &str) -> Result<Reading<'_, T>> {
        registry::find(name)
            .map(|entry| self.reading(entry))
            .ok_or_else(|| Error::NameNotFound(name.to_string()))
    }

    /// Every reading of the register map, in declaration order.
    pub fn all_readings(&self) -> Vec<Reading<'_, T>> {
        REGISTRY.iter().map(|entry| self.reading(entry)).collect()
    }

    /// The summary readings, in declaration order.
    pub fn summary_readings(&self) -> Vec<Reading<'_, T>> {
        registry::summary().map(|entry| self.reading(entry)).collect()
    }

    /// Evaluates all (or only the summary) readings.
    ///
    /// Every sample is taken from the same dump. The first failure aborts the
    /// snapshot, there are no partial results.
    pub fn snapshot(&self, summary_only: bool) -> Result<Vec<Sample>> {
        let readings = if summary_only {
            self.summary_readings()
        } else {
            self.all_readings()
        };
        let dump = self.current()?;
        readings
            .iter()
            .map(|reading| reading.sample_in(&dump))
            .collect()
    }

    /// Renders the readings as a table with the columns Title, Raw, Value and Units.
    pub fn tabulate(&self, summary_only: bool) -> Result<String> {
        Ok(reading::tabulate(&self.snapshot(summary_only)?))
    }
}

/// A named reading bound to a [`Boiler`].
///
/// Holds no state of its own: every access goes through the boiler's cache.
pub struct Reading<'a, T> {
    boiler: &'a Boiler<T>,
    entry: &'static RegisterEntry,
}

impl<T> fmt::Debug for Reading<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reading")
            .field("entry", self.entry)
            .finish_non_exhaustive()
    }
}

impl<T> Clone for Reading<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Reading<'_, T> {}

impl<T: Transport> Reading<'_, T> {
    pub fn entry(&self) -> &'static RegisterEntry {
        self.entry
    }

    pub fn name(&self) -> &'static str {
        self.entry.name
    }

    pub fn title(&self) -> &'static str {
        self.entry.title
    }

    pub fn unit(&self) -> Option<&'static str> {
        self.entry.unit()
    }

    pub fn address(&self) -> RegisterAddress {
        self.entry.address
    }

    pub fn kind(&self) -> ReadingKind {
        self.entry.kind
    }

    pub fn is_summary(&self) -> bool {
        self.entry.summary
    }

    /// The assembled register value.
    pub fn register_value(&self) -> Result<u32> {
        self.boiler
            .read(self.entry.address, self.entry.kind.word_count())
    }

    /// See [`ReadingKind::raw`].
    pub fn raw_value(&self) -> Result<i64> {
        Ok(self.entry.kind.raw(self.register_value()?))
    }

    /// The decoded value.
    ///
    /// A firing rate and the maximum rate it refers to come from the same dump.
    pub fn value(&self) -> Result<Value> {
        let dump = self.boiler.current()?;
        self.decode(&dump, self.register_in(&dump)?)
    }

    fn register_in(&self, dump: &CacheEntry) -> Result<u32> {
        proto::assemble(&dump.words_at(self.entry.address, self.entry.kind.word_count())?)
    }

    fn decode(&self, dump: &CacheEntry, register: u32) -> Result<Value> {
        self.entry.kind.decode(register, || {
            dump.words_at(proto::MAX_RATE_ADDRESS, 1)
                .and_then(|words| proto::assemble(&words))
        })
    }

    /// Evaluates the reading into a [`Sample`].
    pub fn sample(&self) -> Result<Sample> {
        let dump = self.boiler.current()?;
        self.sample_in(&dump)
    }

    fn sample_in(&self, dump: &CacheEntry) -> Result<Sample> {
        let register_value = self.register_in(dump)?;
        Ok(Sample {
            name: self.entry.name,
            address: self.entry.address,
            title: self.entry.title,
            unit: self.unit(),
            summary: self.entry.summary,
            register_value,
            raw_value: self.entry.kind.raw(register_value),
            value: self.decode(dump, register_value)?,
        })
    }

    /// Formats the reading as `<title>: <value> <unit>`.
    pub fn format(&self) -> Result<String> {
        Ok(self.sample()?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use assert_matches::assert_matches;

    /// Serves a fixed register image.
    struct Image {
        registers: Vec<u16>,
        dumps: usize,
    }

    impl Image {
        fn new(values: &[(u16, u16)]) -> Self {
            let mut registers = vec![0; proto::REGISTER_COUNT];
            for &(address, value) in values {
                registers[address as usize] = value;
            }
            Self { registers, dumps: 0 }
        }
    }

    impl Transport for Image {
        fn read_words(
            &mut self,
            address: u16,
            quantity: u16,
        ) -> std::result::Result<Vec<u16>, TransportError> {
            if address == 0 {
                self.dumps += 1;
            }
            let start = address as usize;
            Ok(self.registers[start..start + quantity as usize].to_vec())
        }
    }

    #[test]
    fn read_assembles_words() {
        let boiler = Boiler::new(Image::new(&[(128, 1), (129, 2), (7, 651)]));
        assert_eq!(boiler.read(7, 1).unwrap(), 651);
        assert_eq!(boiler.read(128, 2).unwrap(), 65538);
        assert_matches!(boiler.read(7, 3), Err(Error::WordCount(3)));
        assert_matches!(boiler.read(7, 0), Err(Error::WordCount(0)));
        assert_matches!(boiler.read(180, 1), Err(Error::UnmappedRegister(180)));
        assert_eq!(boiler.with_transport(|image| image.dumps), 1);
    }

    #[test]
    fn by_name() {
        let boiler = Boiler::new(Image::new(&[(33, 12)]));
        let reading = boiler.by_name("Burner State").unwrap();
        assert_eq!(reading.address(), 33);
        assert_eq!(reading.value().unwrap(), Value::Label("Run"));
        assert_eq!(reading.format().unwrap(), "Burner State: Run");
        assert_eq!(boiler.by_name("burner_state").unwrap().raw_value().unwrap(), 12);
        assert_matches!(
            boiler.by_name("Nothing"),
            Err(Error::NameNotFound(name)) if name == "Nothing"
        );
    }

    #[test]
    fn firing_rate_uses_max_rate_register() {
        let boiler = Boiler::new(Image::new(&[(8, 50), (193, 100)]));
        let reading = boiler.by_name("firing_rate_requested").unwrap();
        assert_eq!(reading.value().unwrap(), Value::Integer(50));
        assert_eq!(reading.format().unwrap(), "Firing Rate (Requested): 50 %");
    }

    #[test]
    fn reading_sets() {
        let boiler = Boiler::new(Image::new(&[]));
        assert_eq!(boiler.all_readings().len(), REGISTRY.len());
        let summary = boiler.summary_readings();
        assert_eq!(summary.len(), 23);
        assert!(summary.iter().all(Reading::is_summary));
        assert_eq!(boiler.with_transport(|image| image.dumps), 0);
    }

    #[test]
    fn snapshot_shares_one_dump() {
        let boiler = Boiler::new(Image::new(&[]));
        let samples = boiler.snapshot(false).unwrap();
        assert_eq!(samples.len(), REGISTRY.len());
        assert_eq!(boiler.with_transport(|image| image.dumps), 1);
        assert!(boiler.cache_entry().is_some());
    }

    #[test]
    fn snapshot_never_mixes_dumps() {
        // every access is past the TTL
        let boiler = Boiler::with_cache_ttl(Image::new(&[(8, 50), (193, 100)]), Duration::ZERO);
        let samples = boiler.snapshot(false).unwrap();
        assert_eq!(samples.len(), REGISTRY.len());
        assert_eq!(boiler.with_transport(|image| image.dumps), 1);

        let firing_rate = boiler.by_name("firing_rate_requested").unwrap();
        assert_eq!(firing_rate.value().unwrap(), Value::Integer(50));
        assert_eq!(boiler.with_transport(|image| image.dumps), 2);
        assert_eq!(firing_rate.sample().unwrap().value, Value::Integer(50));
        assert_eq!(boiler.with_transport(|image| image.dumps), 3);
    }

    #[test]
    fn debug_does_not_need_debug_transport() {
        let boiler = Boiler::new(Image::new(&[]));
        let reading = boiler.by_name("supply_sensor").unwrap();
        assert!(format!("{reading:?}").contains("supply_sensor"));
        assert_eq!(boiler.with_transport(|image| image.dumps), 0);
    }

    #[test]
    fn refresh_replaces_entry() {
        let boiler = Boiler::new(Image::new(&[(7, 1)]));
        let first = boiler.refresh().unwrap();
        boiler.with_transport(|image| image.registers[7] = 2);
        assert_eq!(boiler.read(7, 1).unwrap(), 1);
        let second = boiler.refresh().unwrap();
        assert_eq!(first.word(7), Some(1));
        assert_eq!(second.word(7), Some(2));
        assert_eq!(boiler.read(7, 1).unwrap(), 2);
    }
}
