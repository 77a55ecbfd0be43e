//! # Telemetry Protocol Constants and Types
//!
//! Core definitions for the slash-delimited dashboard protocol.
//!
//! Each record is one text line of 15 positional fields:
//!
//! ```text
//! mode/headlight/power/aux_light/gear/signal_lamp/hazard/left/right/
//! speed_left/speed_right/steering/throttle_left/throttle_right/eds
//! ```

use serde::Serialize;

/// Field separator within a record
pub const FIELD_DELIMITER: char = '/';

/// Number of positional fields in a record (extra trailing fields are ignored)
pub const FIELD_COUNT: usize = 15;

/// Field names in wire order, used in decode diagnostics
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "mode",
    "headlight",
    "power_state",
    "aux_light",
    "gear",
    "turn_signal_lamp",
    "hazard",
    "turn_left",
    "turn_right",
    "speed_left",
    "speed_right",
    "steering_angle",
    "throttle_left_pct",
    "throttle_right_pct",
    "eds_active",
];

/// Upper bound for the throttle percentage fields
pub const THROTTLE_PCT_MAX: i64 = 100;

/// Drive mode selector (field 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Eco = 0,
    Normal = 1,
    Sport = 2,
}

impl DriveMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Eco),
            1 => Some(Self::Normal),
            2 => Some(Self::Sport),
            _ => None,
        }
    }
}

/// Main headlight switch (field 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Headlight {
    Off = 0,
    Auto = 1,
    On = 2,
}

impl Headlight {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Auto),
            2 => Some(Self::On),
            _ => None,
        }
    }
}

/// Ignition / power state (field 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Off = 0,
    On = 1,
    Accessory = 2,
}

impl PowerState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Accessory),
            _ => None,
        }
    }
}

/// Secondary light switch: high beam or fog (field 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxLight {
    Off = 0,
    HighBeam = 1,
    Fog = 2,
}

impl AuxLight {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::HighBeam),
            2 => Some(Self::Fog),
            _ => None,
        }
    }
}

/// Drive direction (field 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gear {
    Neutral = 0,
    Forward = 1,
    Reverse = 2,
}

impl Gear {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Neutral),
            1 => Some(Self::Forward),
            2 => Some(Self::Reverse),
            _ => None,
        }
    }
}

/// One decoded telemetry record
///
/// Only produced by [`decode`](super::decode) when all 15 fields parsed and
/// passed their range checks. `average_speed` is derived from the two wheel
/// speeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryFrame {
    /// Eco / Normal / Sport
    pub mode: DriveMode,

    /// Off / Auto / On
    pub headlight: Headlight,

    /// Off / On / Accessory
    pub power_state: PowerState,

    /// Off / HighBeam / Fog
    pub aux_light: AuxLight,

    /// Neutral / Forward / Reverse
    pub gear: Gear,

    /// Turn signal indicator lamp
    pub turn_signal_lamp: bool,

    /// Hazard lights
    pub hazard: bool,

    /// Left turn signal
    pub turn_left: bool,

    /// Right turn signal
    pub turn_right: bool,

    /// Left wheel speed in km/h
    pub speed_left: f64,

    /// Right wheel speed in km/h
    pub speed_right: f64,

    /// Steering angle in degrees (signed)
    pub steering_angle: f64,

    /// Left motor throttle (0-100%)
    pub throttle_left_pct: u8,

    /// Right motor throttle (0-100%)
    pub throttle_right_pct: u8,

    /// Electronic differential / stability assist engaged
    pub eds_active: bool,

    /// Mean of `speed_left` and `speed_right` in km/h
    pub average_speed: f64,
}
