//! The controller's register map.
//!
//! Addresses are fixed by the Sage2 firmware and must not change.

use crate::protocol::RegisterAddress;
use crate::reading::{
    ReadingKind, Scale, BURNER_STATE, DEMAND, MODULATION_SENSOR, PUMP_STATUS, SENSOR_STATE,
    SETPOINT_SOURCE,
};

/// Static description of one named reading.
#[derive(Debug, PartialEq)]
pub struct RegisterEntry {
    /// Snake case key, e.g. `supply_sensor`.
    pub name: &'static str,
    pub address: RegisterAddress,
    pub kind: ReadingKind,
    pub title: &'static str,
    unit: Option<&'static str>,
    /// Part of the commonly displayed subset.
    pub summary: bool,
}

impl RegisterEntry {
    const fn new(
        name: &'static str,
        address: RegisterAddress,
        kind: ReadingKind,
        title: &'static str,
        summary: bool,
    ) -> Self {
        Self {
            name,
            address,
            kind,
            title,
            unit: None,
            summary,
        }
    }

    const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    /// The explicit unit, or the default unit of the kind.
    pub fn unit(&self) -> Option<&'static str> {
        self.unit.or_else(|| self.kind.default_unit())
    }
}

const TEMPERATURE: ReadingKind = ReadingKind::Temperature;
const FIRING_RATE: ReadingKind = ReadingKind::FiringRate;
const COUNTER: ReadingKind = ReadingKind::Counter;
const BURNER: ReadingKind = ReadingKind::Enumerated(&BURNER_STATE);
const SENSOR: ReadingKind = ReadingKind::Enumerated(&SENSOR_STATE);
const MODULATION: ReadingKind = ReadingKind::Enumerated(&MODULATION_SENSOR);
const SETPOINT: ReadingKind = ReadingKind::Enumerated(&SETPOINT_SOURCE);
const ON_OFF: ReadingKind = ReadingKind::Enumerated(&DEMAND);
const PUMP: ReadingKind = ReadingKind::Enumerated(&PUMP_STATUS);

/// All readings in declaration order.
pub static REGISTRY: [RegisterEntry; 50] = [
    RegisterEntry::new("supply_sensor", 7, TEMPERATURE, "Supply Sensor", true),
    RegisterEntry::new("firing_rate_requested", 8, FIRING_RATE, "Firing Rate (Requested)", true),
    RegisterEntry::new("firing_rate_measured", 9, FIRING_RATE, "Firing Rate (Measured)", true),
    RegisterEntry::new("flame_signal", 10, ReadingKind::FlameSignal, "Flame Signal", false),
    RegisterEntry::new("return_sensor", 11, TEMPERATURE, "Return Sensor", true),
    RegisterEntry::new("header_sensor", 13, TEMPERATURE, "Header Sensor", true),
    RegisterEntry::new("stack_sensor", 14, TEMPERATURE, "Stack Sensor", true),
    RegisterEntry::new("active_ch_setpoint", 16, TEMPERATURE, "Active CH Setpoint", false),
    RegisterEntry::new("active_dhw_setpoint", 17, TEMPERATURE, "Active DHW Setpoint", false),
    RegisterEntry::new("active_ll_setpoint", 18, TEMPERATURE, "Active LL Setpoint", false),
    RegisterEntry::new("active_ch_operating_point", 25, TEMPERATURE, "Active CH Operating Point", false),
    RegisterEntry::new("active_dhw_operating_point", 26, TEMPERATURE, "Active DHW Operating Point", false),
    RegisterEntry::new("active_ll_operating_point", 27, TEMPERATURE, "Active LL Operating Point", false),
    RegisterEntry::new("active_system_operating_point", 28, TEMPERATURE, "Active System Operating Point", true),
    RegisterEntry::new("active_system_setpoint", 29, TEMPERATURE, "Active System Setpoint", true),
    RegisterEntry::new("active_system_on_hysteresis", 30, TEMPERATURE, "Active System Hysteresis (on)", false),
    RegisterEntry::new("active_system_off_hysteresis", 31, TEMPERATURE, "Active System Hysteresis (off)", false),
    // Burner control
    RegisterEntry::new("burner_state", 33, BURNER, "Burner State", true),
    // Sensor status
    RegisterEntry::new("supply_sensor_state", 48, SENSOR, "Supply Sensor State", false),
    RegisterEntry::new("return_sensor_state", 49, SENSOR, "Return Sensor State", false),
    RegisterEntry::new("stack_sensor_state", 51, SENSOR, "Stack Sensor State", false),
    RegisterEntry::new("header_sensor_state", 52, SENSOR, "Header Sensor State", false),
    RegisterEntry::new("remote_control_input_state", 53, SENSOR, "4-20mA Remote Control Input State", false),
    // Demand and modulation
    RegisterEntry::new("active_system_sensor", 61, MODULATION, "Active System Sensor", true),
    RegisterEntry::new("active_ll_sensor", 62, MODULATION, "Active LL Sensor", false),
    // Central heat
    RegisterEntry::new("setpoint_source_ch", 65, SETPOINT, "Setpoint Source (CH)", false),
    RegisterEntry::new("demand_ch", 66, ON_OFF, "Demand (CH)", true),
    RegisterEntry::new("requested_rate_ch", 68, FIRING_RATE, "Requested Rate (CH)", true),
    RegisterEntry::new("demand_frost", 70, ON_OFF, "Demand (Frost)", true),
    RegisterEntry::new("active_ch_on_hysteresis", 71, TEMPERATURE, "Active CH Hysteresis (on)", false),
    RegisterEntry::new("active_ch_off_hysteresis", 72, TEMPERATURE, "Active CH Hysteresis (off)", false),
    RegisterEntry::new("active_sensor_ch", 76, MODULATION, "Active Sensor (CH)", false),
    // Domestic hot water
    RegisterEntry::new("active_sensor_dhw", 79, MODULATION, "Active Sensor (DHW)", false),
    RegisterEntry::new("setpoint_source_dhw", 81, SETPOINT, "Setpoint Source (DHW)", false),
    RegisterEntry::new("dhw_priority_counter", 82, ReadingKind::Plain(Scale::IDENTITY), "DHW Priority Timer", false)
        .with_unit("sec"),
    RegisterEntry::new("demand_dhw", 83, ON_OFF, "Demand (DHW)", true),
    RegisterEntry::new("active_dhw_on_hysteresis", 88, TEMPERATURE, "Active DHW Hysteresis (on)", false),
    RegisterEntry::new("active_dhw_off_hysteresis", 89, TEMPERATURE, "Active DHW Hysteresis (off)", false),
    // Pumps
    RegisterEntry::new("pump_status_ch", 96, PUMP, "Pump Status (CH)", true),
    RegisterEntry::new("pump_status_dhw", 100, PUMP, "Pump Status (DHW)", true),
    RegisterEntry::new("pump_status_boiler", 108, PUMP, "Pump Status (Boiler)", true),
    // Statistics
    RegisterEntry::new("counter_burner", 128, COUNTER, "Cycle Count (Burner)", true).with_unit("cycles"),
    RegisterEntry::new("counter_burner_hours", 130, COUNTER, "Burner Run Time", true).with_unit("hours"),
    RegisterEntry::new("counter_ch_pump", 132, COUNTER, "Cycle Count (CH Pump)", true).with_unit("cycles"),
    RegisterEntry::new("counter_dhw_pump", 134, COUNTER, "Cycle Count (DHW Pump)", true).with_unit("cycles"),
    RegisterEntry::new("counter_boiler_pump", 138, COUNTER, "Cycle Count (Boiler Pump)", true).with_unit("cycles"),
    // Lead lag
    RegisterEntry::new("setpoint_source_ll", 162, SETPOINT, "Setpoint Source (LL)", false),
    RegisterEntry::new("demand_ll", 164, ON_OFF, "Demand (LL)", false),
    // Extended sensors
    RegisterEntry::new("outdoor_sensor", 170, TEMPERATURE, "Outdoor Sensor", true),
    RegisterEntry::new("outdoor_sensor_state", 171, SENSOR, "Outdoor Sensor State", false),
];

/// Looks up an entry by its key or its title.
pub fn find(name: &str) -> Option<&'static RegisterEntry> {
    REGISTRY
        .iter()
        .find(|entry| entry.name == name || entry.title == name)
}

/// Entries flagged as summary readings, in declaration order.
pub fn summary() -> impl Iterator<Item = &'static RegisterEntry> {
    REGISTRY.iter().filter(|entry| entry.summary)
}
