//! Decoding of raw register values into physical readings.
//!
//! Every reading of the controller is one of a closed set of [`ReadingKind`]s.
//! A kind is a pure function from the assembled register value to a [`Value`].

use std::fmt;

/// A linear transform `raw * multiplier + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub multiplier: f64,
    pub offset: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale {
        multiplier: 1.0,
        offset: 0.0,
    };
    /// Tenths of a degree Celsius to degrees Fahrenheit.
    pub const FAHRENHEIT: Scale = Scale {
        multiplier: 0.18,
        offset: 32.0,
    };
    /// Hundredths of a micro-ampere.
    pub const MICRO_AMPERE: Scale = Scale {
        multiplier: 0.01,
        offset: 0.0,
    };

    /// Applies the transform.
    ///
    /// The result is an integer when the transform is exact, otherwise it is
    /// rounded to one decimal, see [`round_tenths`].
    pub fn apply(&self, raw: i64) -> Value {
        let value = raw as f64 * self.multiplier + self.offset;
        if value.trunc() == value {
            Value::Integer(value as i64)
        } else {
            Value::Decimal(round_tenths(value))
        }
    }
}

/// Rounds the exact binary value of `value` to the nearest tenth, ties away
/// from zero.
///
/// `0.15` is stored as `0.1499999...` and therefore rounds to `0.1`, while the
/// exactly representable `0.25` rounds to `0.3`.
pub fn round_tenths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let bits = value.abs().to_bits();
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    // value = mantissa / 2^shift
    let (mantissa, shift) = if biased_exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1 << 52), 1075 - biased_exponent)
    };
    if shift <= 0 {
        return value;
    }
    // 10 * mantissa stays below 2^57
    let scaled = 10 * mantissa;
    let tenths = if shift > 57 {
        0
    } else {
        let half = 1u64 << (shift - 1);
        let remainder = scaled & ((1u64 << shift) - 1);
        (scaled >> shift) + u64::from(remainder >= half)
    };
    (tenths as f64 / 10.0).copysign(value)
}

/// Decoded, display oriented projection of a register value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Integer(i64),
    /// Always carries at most one decimal.
    Decimal(f64),
    Label(&'static str),
    /// The register value has no meaning, e.g. an enumeration without a match.
    Unknown,
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(value) => Some(value as f64),
            Value::Decimal(value) => Some(value),
            Value::Label(_) | Value::Unknown => None,
        }
    }

    pub fn as_label(&self) -> Option<&'static str> {
        match *self {
            Value::Label(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::Decimal(value) => write!(f, "{value:.1}"),
            Value::Label(label) => f.write_str(label),
            Value::Unknown => f.write_str("unknown"),
        }
    }
}

/// A static, ascending table of `threshold -> label`.
#[derive(Debug, PartialEq, Eq)]
pub struct Enumeration {
    pub name: &'static str,
    pub entries: &'static [(u32, &'static str)],
}

impl Enumeration {
    /// Resolves `raw` to the largest key that is `<= raw`.
    ///
    /// Returns `None` when `raw` is below the smallest key.
    pub fn floor(&self, raw: u32) -> Option<(u32, &'static str)> {
        let index = self.entries.partition_point(|&(key, _)| key <= raw);
        index.checked_sub(1).map(|index| self.entries[index])
    }

    /// Exact lookup of a label.
    pub fn label(&self, key: u32) -> Option<&'static str> {
        self.entries
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|index| self.entries[index].1)
    }
}

/// Decode strategy of a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingKind {
    /// `raw * multiplier + offset`.
    Plain(Scale),
    /// Signed tenths of a degree Celsius, shown in Fahrenheit.
    Temperature,
    /// Percentage, either direct in tenths (top bit set) or relative to the
    /// maximum rate in [`crate::protocol::MAX_RATE_ADDRESS`].
    FiringRate,
    /// Flame signal in micro-amperes.
    FlameSignal,
    Enumerated(&'static Enumeration),
    /// Unscaled 32-bit value spanning two registers.
    Counter,
}

impl ReadingKind {
    /// Top bit of a firing rate flagging a direct percentage.
    pub const FIRING_RATE_DIRECT: u32 = 1 << 31;

    /// Number of registers the reading spans.
    pub fn word_count(&self) -> usize {
        match self {
            ReadingKind::Counter => 2,
            _ => 1,
        }
    }

    /// Unit used when the register map does not name one.
    pub fn default_unit(&self) -> Option<&'static str> {
        match self {
            ReadingKind::Temperature => Some("°F"),
            ReadingKind::FiringRate => Some("%"),
            ReadingKind::FlameSignal => Some("µA"),
            _ => None,
        }
    }

    /// Kind specific raw integer.
    ///
    /// Temperatures are reinterpreted as signed, enumerations resolve to their
    /// floor-matched key. Everything else is returned unchanged.
    pub fn raw(&self, register: u32) -> i64 {
        match self {
            ReadingKind::Temperature => signed_temperature(register),
            ReadingKind::Enumerated(enumeration) => enumeration
                .floor(register)
                .map_or(i64::from(register), |(key, _)| i64::from(key)),
            _ => i64::from(register),
        }
    }

    /// Decodes the assembled register value.
    ///
    /// `max_rate` is only invoked for firing rates without the direct flag.
    pub fn decode<F, E>(&self, register: u32, max_rate: F) -> std::result::Result<Value, E>
    where
        F: FnOnce() -> std::result::Result<u32, E>,
    {
        Ok(match self {
            ReadingKind::Plain(scale) => scale.apply(self.raw(register)),
            ReadingKind::Temperature => Scale::FAHRENHEIT.apply(self.raw(register)),
            ReadingKind::FlameSignal => Scale::MICRO_AMPERE.apply(self.raw(register)),
            ReadingKind::FiringRate => {
                if register & Self::FIRING_RATE_DIRECT != 0 {
                    firing_rate_direct(register)
                } else {
                    firing_rate_relative(register, max_rate()?)
                }
            }
            ReadingKind::Enumerated(enumeration) => enumeration
                .floor(register)
                .map_or(Value::Unknown, |(_, label)| Value::Label(label)),
            ReadingKind::Counter => Value::Integer(i64::from(register)),
        })
    }
}

/// Registers above 0x8000 hold negative temperatures.
fn signed_temperature(register: u32) -> i64 {
    let register = i64::from(register);
    if register > 1 << 15 {
        register - (1 << 16)
    } else {
        register
    }
}

fn firing_rate_direct(register: u32) -> Value {
    let tenths = register & !ReadingKind::FIRING_RATE_DIRECT;
    Value::Integer((f64::from(tenths) / 10.0) as i64)
}

fn firing_rate_relative(register: u32, max_rate: u32) -> Value {
    if max_rate == 0 {
        return Value::Unknown;
    }
    Value::Integer((100.0 * f64::from(register) / f64::from(max_rate)) as i64)
}

/// A fully evaluated reading, detached from the boiler it was read from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Sample {
    pub name: &'static str,
    pub address: u16,
    pub title: &'static str,
    pub unit: Option<&'static str>,
    pub summary: bool,
    /// Assembled register value.
    pub register_value: u32,
    /// Kind specific raw value, see [`ReadingKind::raw`].
    pub raw_value: i64,
    pub value: Value,
}

impl Sample {
    /// The decoded value when it is numeric, the raw value otherwise.
    pub fn numeric_value(&self) -> f64 {
        self.value.as_f64().unwrap_or(self.raw_value as f64)
    }
}

/// Renders `<title>: <value> <unit>`, or `<title>: <value>` without a unit.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{}: {} {}", self.title, self.value, unit),
            None => write!(f, "{}: {}", self.title, self.value),
        }
    }
}

/// Renders samples as a table with the columns Title, Raw, Value and Units.
pub fn tabulate(samples: &[Sample]) -> String {
    let mut builder = tabled::builder::Builder::default();
    builder.push_record(vec![
        String::from("Title"),
        String::from("Raw"),
        String::from("Value"),
        String::from("Units"),
    ]);
    for sample in samples {
        builder.push_record(vec![
            sample.title.to_string(),
            sample.raw_value.to_string(),
            sample.value.to_string(),
            sample.unit.unwrap_or_default().to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(tabled::settings::Style::psql());
    table.to_string()
}

pub const BURNER_STATE: Enumeration = Enumeration {
    name: "burner state",
    entries: &[
        (0, "Initiate"),
        (1, "Standby Delay"),
        (2, "Standby"),
        (3, "Safe Startup"),
        (4, "Prepurge - Drive to Purge Rate"),
        (5, "Prepurge - Measured Purge Time"),
        (6, "Prepurge - Drive to Lightoff Rate"),
        (7, "Preigition Test"),
        (8, "Preigition Time"),
        (9, "Pilot Flame Establishing Period"),
        (10, "Main Flame Establishing Period"),
        (11, "Direct Burner Ignition"),
        (12, "Run"),
        (13, "Postpurge"),
        (14, "Lockout"),
        (255, "Safety Processor Offline"),
    ],
};

pub const SENSOR_STATE: Enumeration = Enumeration {
    name: "sensor state",
    entries: &[
        (0, "None"),
        (1, "Normal"),
        (2, "Open"),
        (3, "Shorted"),
        (4, "Above High Range"),
        (5, "Below Low Range"),
        (6, "Not Reliable"),
    ],
};

pub const MODULATION_SENSOR: Enumeration = Enumeration {
    name: "modulation sensor",
    entries: &[
        (0, "No Active Sensor"),
        (1, "DHW Sensor (S6S7)"),
        (2, "Outlet Sensor (S3S4)"),
        (3, "Inlet Sensor (S1)"),
        (4, "4-20mA Input (S2)"),
        (5, "Header Sensor (S5)"),
        (6, "S10 Sensor (S10)"),
        (7, "Steam Sensor (S1)"),
    ],
};

pub const SETPOINT_SOURCE: Enumeration = Enumeration {
    name: "setpoint source",
    entries: &[
        (0, "Unknown"),
        (1, "CH Setpoint"),
        (2, "CH Time of Day Setpoint"),
        (3, "Outdoor Reset Setpoint"),
        (4, "Remote Control Setpoint"),
        (5, "DHW Tap Setpoint"),
        (6, "DHW Preheat Setpoint"),
        (7, "Outdoor Reset Time of Day Setpoint"),
        (8, "Mix Setpoint"),
    ],
};

pub const DEMAND: Enumeration = Enumeration {
    name: "demand",
    entries: &[(0, "Off"), (1, "On")],
};

pub const PUMP_STATUS: Enumeration = Enumeration {
    name: "pump status",
    entries: &[
        (92, "Forced On, from manual pump control"),
        (93, "Forced On, due to Outlet high limit is active"),
        (94, "Forced On, from burner demand"),
        (95, "Forced On, due to Lead Lag slave has demand"),
        (96, "Forced Off, from local DHW priority service"),
        (97, "Forced Off, from Lead Lag DHW priority service"),
        (98, "Forced Off, from Central Heat anti-condensation"),
        (99, "Forced Off, from DHW anti-condensation"),
        (100, "Forced Off, due to DHW high limit is active"),
        (101, "Forced Off, from EnviraCOM DHW priority service"),
        (102, "On, due to local CH frost protection is active"),
        (103, "On, due to Lead Lag CH frost protection is active"),
        (104, "On, due to local DHW frost protection is active"),
        (105, "On, due to Lead Lag DHW frost protection is active"),
        (106, "On, from local Central Heat demand"),
        (107, "On, from Lead Lag Central Heat demand"),
        (108, "On, from local DHW demand"),
        (109, "On, from Lead Lag DHW demand"),
        (110, "On, from local Mix demand"),
        (111, "On, from Lead Lag Mix demand"),
        (112, "On, from local Central Heat service"),
        (113, "On, from Lead Lag Central Heat service"),
        (114, "On, from local DHW service"),
        (115, "On, from Lead Lag DHW service"),
        (116, "On, from local Mix service"),
        (117, "On, from Lead Lag Mix service"),
        (118, "On, from Lead Lag auxiliary pump X"),
        (119, "On, from Lead Lag auxiliary pump Y"),
        (120, "On, from Lead Lag auxiliary pump Z"),
        (121, "On, but inhibited by pump start delay"),
        (122, "On, from pump override"),
        (123, "Off, not needed"),
        (124, "On, from burner demand"),
        (125, "On, from exercise"),
        (126, "On, from local Lead Lag service"),
        (127, "On, from local Lead Lag pump demand"),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn decode(kind: ReadingKind, register: u32) -> Value {
        kind.decode(register, || Ok::<_, Infallible>(100)).unwrap()
    }

    static ABC: Enumeration = Enumeration {
        name: "abc",
        entries: &[(0, "A"), (10, "B"), (20, "C")],
    };

    #[test]
    fn plain_rounding() {
        assert_eq!(Scale::IDENTITY.apply(7), Value::Integer(7));
        assert_eq!(Scale::MICRO_AMPERE.apply(7), Value::Decimal(0.1));
        assert_eq!(Scale::MICRO_AMPERE.apply(1234), Value::Decimal(12.3));
        assert_eq!(Scale::MICRO_AMPERE.apply(0), Value::Integer(0));
        assert_eq!(
            decode(ReadingKind::Plain(Scale::IDENTITY), 42),
            Value::Integer(42)
        );
    }

    #[test]
    fn rounding_uses_exact_binary_value() {
        // 0.15 and 1.45 are stored slightly below the tie
        assert_eq!(Scale::MICRO_AMPERE.apply(15), Value::Decimal(0.1));
        assert_eq!(Scale::MICRO_AMPERE.apply(145), Value::Decimal(1.4));
        assert_eq!(Scale::MICRO_AMPERE.apply(205), Value::Decimal(2.0));
        // 1.05 is stored slightly above it
        assert_eq!(Scale::MICRO_AMPERE.apply(105), Value::Decimal(1.1));
        // exact ties go away from zero
        assert_eq!(Scale::MICRO_AMPERE.apply(25), Value::Decimal(0.3));
        assert_eq!(round_tenths(0.25), 0.3);
        assert_eq!(round_tenths(-0.25), -0.3);
        assert_eq!(round_tenths(2.75), 2.8);
        assert_eq!(round_tenths(-4564.48), -4564.5);
        assert_eq!(round_tenths(0.04), 0.0);
        assert_eq!(round_tenths(1e-300), 0.0);
        assert_eq!(round_tenths(12.0), 12.0);
    }

    #[test]
    fn temperature() {
        assert_eq!(decode(ReadingKind::Temperature, 0), Value::Integer(32));
        assert_eq!(decode(ReadingKind::Temperature, 651), Value::Decimal(149.2));
        assert_eq!(decode(ReadingKind::Temperature, 215), Value::Decimal(70.7));
        // 65484 is -52 tenths of a degree Celsius
        assert_eq!(ReadingKind::Temperature.raw(65484), -52);
        assert_eq!(decode(ReadingKind::Temperature, 65484), Value::Decimal(22.6));
        assert_eq!(ReadingKind::Temperature.raw(40000), -25536);
        assert_eq!(
            decode(ReadingKind::Temperature, 40000),
            Value::Decimal(-4564.5)
        );
        // 0x8000 itself is not reinterpreted
        assert_eq!(ReadingKind::Temperature.raw(32768), 32768);
    }

    #[test]
    fn flame_signal() {
        assert_eq!(decode(ReadingKind::FlameSignal, 456), Value::Decimal(4.6));
        assert_eq!(decode(ReadingKind::FlameSignal, 300), Value::Integer(3));
    }

    #[test]
    fn firing_rate_direct_percentage() {
        let register = ReadingKind::FIRING_RATE_DIRECT + 500;
        let value = ReadingKind::FiringRate
            .decode(register, || -> Result<u32, ()> {
                panic!("max rate must not be read")
            })
            .unwrap();
        assert_eq!(value, Value::Integer(50));
        assert_eq!(
            decode(ReadingKind::FiringRate, ReadingKind::FIRING_RATE_DIRECT + 999),
            Value::Integer(99)
        );
    }

    #[test]
    fn firing_rate_relative_to_max() {
        assert_eq!(decode(ReadingKind::FiringRate, 50), Value::Integer(50));
        let value = ReadingKind::FiringRate
            .decode(1990, || Ok::<_, Infallible>(4000))
            .unwrap();
        assert_eq!(value, Value::Integer(49));
        let value = ReadingKind::FiringRate
            .decode(10, || Ok::<_, Infallible>(0))
            .unwrap();
        assert_eq!(value, Value::Unknown);
    }

    #[test]
    fn firing_rate_propagates_max_rate_error() {
        let result = ReadingKind::FiringRate.decode(10, || Err("link down"));
        assert_eq!(result, Err("link down"));
    }

    #[test]
    fn enumeration_floor_match() {
        let kind = ReadingKind::Enumerated(&ABC);
        assert_eq!(decode(kind, 15), Value::Label("B"));
        assert_eq!(kind.raw(15), 10);
        assert_eq!(decode(kind, 25), Value::Label("C"));
        assert_eq!(kind.raw(25), 20);
        assert_eq!(decode(kind, 0), Value::Label("A"));
        assert_eq!(decode(kind, 10), Value::Label("B"));
    }

    #[test]
    fn enumeration_underflow() {
        let kind = ReadingKind::Enumerated(&PUMP_STATUS);
        assert_eq!(decode(kind, 5), Value::Unknown);
        assert_eq!(kind.raw(5), 5);
        assert_eq!(PUMP_STATUS.floor(91), None);
        assert_eq!(PUMP_STATUS.floor(92), Some((92, "Forced On, from manual pump control")));
        assert_eq!(decode(kind, 200), Value::Label("On, from local Lead Lag pump demand"));
    }

    #[test]
    fn enumeration_tables_are_sorted() {
        for table in [
            &BURNER_STATE,
            &SENSOR_STATE,
            &MODULATION_SENSOR,
            &SETPOINT_SOURCE,
            &DEMAND,
            &PUMP_STATUS,
        ] {
            assert!(
                table.entries.windows(2).all(|pair| pair[0].0 < pair[1].0),
                "{} is not sorted",
                table.name
            );
        }
        assert_eq!(BURNER_STATE.label(255), Some("Safety Processor Offline"));
        assert_eq!(BURNER_STATE.label(15), None);
        assert_eq!(decode(ReadingKind::Enumerated(&BURNER_STATE), 100), Value::Label("Lockout"));
    }

    #[test]
    fn counter() {
        assert_eq!(decode(ReadingKind::Counter, 65538), Value::Integer(65538));
        assert_eq!(ReadingKind::Counter.raw(65538), 65538);
        assert_eq!(ReadingKind::Counter.word_count(), 2);
        assert_eq!(ReadingKind::Temperature.word_count(), 1);
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Decimal(160.0).to_string(), "160.0");
        assert_eq!(Value::Decimal(-4.5).to_string(), "-4.5");
        assert_eq!(Value::Label("Run").to_string(), "Run");
        assert_eq!(Value::Unknown.to_string(), "unknown");
    }

    fn sample(unit: Option<&'static str>, value: Value) -> Sample {
        Sample {
            name: "supply_sensor",
            address: 7,
            title: "Supply Sensor",
            unit,
            summary: true,
            register_value: 651,
            raw_value: 651,
            value,
        }
    }

    #[test]
    fn format_sample() {
        assert_eq!(
            sample(Some("°F"), Value::Decimal(149.2)).to_string(),
            "Supply Sensor: 149.2 °F"
        );
        assert_eq!(
            sample(None, Value::Label("Run")).to_string(),
            "Supply Sensor: Run"
        );
    }

    #[test]
    fn numeric_value_falls_back_to_raw() {
        assert_eq!(sample(None, Value::Decimal(149.2)).numeric_value(), 149.2);
        assert_eq!(sample(None, Value::Label("Run")).numeric_value(), 651.0);
    }

    #[test]
    fn tabulate_rows() {
        let table = tabulate(&[
            sample(Some("°F"), Value::Decimal(149.2)),
            sample(None, Value::Unknown),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        for column in ["Title", "Raw", "Value", "Units"] {
            assert!(lines[0].contains(column));
        }
        assert!(lines[2].contains("Supply Sensor"));
        assert!(lines[2].contains("149.2"));
        assert!(lines[2].contains("°F"));
        assert!(lines[3].contains("unknown"));
    }
}
