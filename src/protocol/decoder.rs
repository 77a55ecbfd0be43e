//! # Telemetry Line Decoder
//!
//! Decodes one slash-delimited text line into a [`TelemetryFrame`].
//!
//! Decoding is all-or-nothing: a single bad field rejects the whole line.

use thiserror::Error;

use super::frame::*;

/// Why a line was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeFailure {
    #[error("expected at least 15 fields, got {found}")]
    TooFewFields { found: usize },

    #[error("field {index} ({field}) is not an integer: {value:?}")]
    InvalidInteger {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("field {index} ({field}) is not a number: {value:?}")]
    InvalidFloat {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("field {index} ({field}) is not finite: {value}")]
    NonFinite {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("field {index} ({field}) = {value} is outside 0..={max}")]
    OutOfRange {
        index: usize,
        field: &'static str,
        value: i64,
        max: i64,
    },
}

/// A rejected line together with the reason
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed telemetry line {raw_line:?}: {reason}")]
pub struct DecodeError {
    /// The line as received
    pub raw_line: String,

    /// First field that failed
    pub reason: DecodeFailure,
}

/// Decode an optional line
///
/// `None` and empty (or whitespace-only) lines are the idle case and yield
/// `Ok(None)` without a diagnostic. Anything else is handed to
/// [`parse_frame`].
///
/// # Examples
///
/// ```
/// use gotogo_link::protocol::{decode, Gear};
///
/// let frame = decode(Some("1/0/1/0/1/0/0/0/0/45.0/47.0/12.5/60/62/0"))
///     .unwrap()
///     .unwrap();
/// assert_eq!(frame.gear, Gear::Forward);
/// assert_eq!(frame.average_speed, 46.0);
///
/// assert_eq!(decode(Some("")), Ok(None));
/// assert_eq!(decode(None), Ok(None));
/// ```
pub fn decode(line: Option<&str>) -> Result<Option<TelemetryFrame>, DecodeError> {
    match line.map(str::trim) {
        None | Some("") => Ok(None),
        Some(line) => parse_frame(line).map(Some),
    }
}

/// Parse a non-empty line into a frame
///
/// # Errors
///
/// Returns [`DecodeError`] if the line has fewer than 15 fields or any of the
/// first 15 fails its type or range check.
pub fn parse_frame(line: &str) -> Result<TelemetryFrame, DecodeError> {
    parse_fields(line).map_err(|reason| DecodeError {
        raw_line: line.to_string(),
        reason,
    })
}

fn parse_fields(line: &str) -> Result<TelemetryFrame, DecodeFailure> {
    let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if parts.len() < FIELD_COUNT {
        return Err(DecodeFailure::TooFewFields { found: parts.len() });
    }

    let fields = Fields(&parts[..FIELD_COUNT]);

    let mode = fields.coded(0, 2, DriveMode::from_code)?;
    let headlight = fields.coded(1, 2, Headlight::from_code)?;
    let power_state = fields.coded(2, 2, PowerState::from_code)?;
    let aux_light = fields.coded(3, 2, AuxLight::from_code)?;
    let gear = fields.coded(4, 2, Gear::from_code)?;
    let turn_signal_lamp = fields.flag(5)?;
    let hazard = fields.flag(6)?;
    let turn_left = fields.flag(7)?;
    let turn_right = fields.flag(8)?;
    let speed_left = fields.float(9)?;
    let speed_right = fields.float(10)?;
    let steering_angle = fields.float(11)?;
    let throttle_left_pct = fields.bounded(12, THROTTLE_PCT_MAX)? as u8;
    let throttle_right_pct = fields.bounded(13, THROTTLE_PCT_MAX)? as u8;
    let eds_active = fields.flag(14)?;

    Ok(TelemetryFrame {
        mode,
        headlight,
        power_state,
        aux_light,
        gear,
        turn_signal_lamp,
        hazard,
        turn_left,
        turn_right,
        speed_left,
        speed_right,
        steering_angle,
        throttle_left_pct,
        throttle_right_pct,
        eds_active,
        average_speed: mean(speed_left, speed_right),
    })
}

/// Mean of two finite values; halves first only when the sum would overflow
fn mean(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.is_finite() {
        sum / 2.0
    } else {
        a / 2.0 + b / 2.0
    }
}

/// Positional view over the first 15 parts of a line
struct Fields<'a>(&'a [&'a str]);

impl Fields<'_> {
    fn raw(&self, index: usize) -> &str {
        self.0[index].trim()
    }

    fn integer(&self, index: usize) -> Result<i64, DecodeFailure> {
        let value = self.raw(index);
        value.parse::<i64>().map_err(|_| DecodeFailure::InvalidInteger {
            index,
            field: FIELD_NAMES[index],
            value: value.to_string(),
        })
    }

    fn bounded(&self, index: usize, max: i64) -> Result<i64, DecodeFailure> {
        let value = self.integer(index)?;
        if !(0..=max).contains(&value) {
            return Err(DecodeFailure::OutOfRange {
                index,
                field: FIELD_NAMES[index],
                value,
                max,
            });
        }
        Ok(value)
    }

    fn coded<T>(
        &self,
        index: usize,
        max: i64,
        from_code: fn(i64) -> Option<T>,
    ) -> Result<T, DecodeFailure> {
        let value = self.bounded(index, max)?;
        from_code(value).ok_or(DecodeFailure::OutOfRange {
            index,
            field: FIELD_NAMES[index],
            value,
            max,
        })
    }

    fn flag(&self, index: usize) -> Result<bool, DecodeFailure> {
        Ok(self.bounded(index, 1)? == 1)
    }

    fn float(&self, index: usize) -> Result<f64, DecodeFailure> {
        let raw = self.raw(index);
        let value = raw.parse::<f64>().map_err(|_| DecodeFailure::InvalidFloat {
            index,
            field: FIELD_NAMES[index],
            value: raw.to_string(),
        })?;

        if !value.is_finite() {
            return Err(DecodeFailure::NonFinite {
                index,
                field: FIELD_NAMES[index],
                value,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LINE: &str = "1/0/1/0/1/0/0/0/0/45.0/47.0/12.5/60/62/0";

    fn replace_field(index: usize, value: &str) -> String {
        let mut parts: Vec<&str> = SAMPLE_LINE.split('/').collect();
        parts[index] = value;
        parts.join("/")
    }

    #[test]
    fn test_decode_sample_line() {
        let frame = parse_frame(SAMPLE_LINE).unwrap();

        assert_eq!(frame.mode, DriveMode::Normal);
        assert_eq!(frame.headlight, Headlight::Off);
        assert_eq!(frame.power_state, PowerState::On);
        assert_eq!(frame.aux_light, AuxLight::Off);
        assert_eq!(frame.gear, Gear::Forward);
        assert!(!frame.turn_signal_lamp);
        assert!(!frame.hazard);
        assert!(!frame.turn_left);
        assert!(!frame.turn_right);
        assert_eq!(frame.speed_left, 45.0);
        assert_eq!(frame.speed_right, 47.0);
        assert_eq!(frame.steering_angle, 12.5);
        assert_eq!(frame.throttle_left_pct, 60);
        assert_eq!(frame.throttle_right_pct, 62);
        assert!(!frame.eds_active);
        assert_eq!(frame.average_speed, 46.0);
    }

    #[test]
    fn test_decode_all_maxima() {
        let frame = parse_frame("2/2/2/2/2/1/1/1/1/120.5/119.5/-35.25/100/100/1").unwrap();

        assert_eq!(frame.mode, DriveMode::Sport);
        assert_eq!(frame.headlight, Headlight::On);
        assert_eq!(frame.power_state, PowerState::Accessory);
        assert_eq!(frame.aux_light, AuxLight::Fog);
        assert_eq!(frame.gear, Gear::Reverse);
        assert!(frame.turn_signal_lamp && frame.hazard && frame.turn_left && frame.turn_right);
        assert_eq!(frame.steering_angle, -35.25);
        assert_eq!(frame.throttle_left_pct, 100);
        assert!(frame.eds_active);
        assert_eq!(frame.average_speed, 120.0);
    }

    #[test]
    fn test_average_speed_is_exact_mean() {
        let frame = parse_frame("0/0/0/0/0/0/0/0/0/0.1/0.2/0/0/0/0").unwrap();
        assert_eq!(frame.average_speed, (0.1 + 0.2) / 2.0);
    }

    #[test]
    fn test_average_speed_near_f64_max_stays_finite() {
        let frame = parse_frame("1/0/1/0/1/0/0/0/0/1e308/1e308/0/0/0/0").unwrap();
        assert_eq!(frame.speed_left, 1e308);
        assert!(frame.average_speed.is_finite());
        assert_eq!(frame.average_speed, 1e308);

        let json = serde_json::to_value(frame).unwrap();
        assert_eq!(json["average_speed"], 1e308);

        let frame = parse_frame("1/0/1/0/1/0/0/0/0/-1.7e308/-1.7e308/0/0/0/0").unwrap();
        assert_eq!(frame.average_speed, -1.7e308);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let line = format!("{}/99/garbage", SAMPLE_LINE);
        let frame = parse_frame(&line).unwrap();
        assert_eq!(frame, parse_frame(SAMPLE_LINE).unwrap());
    }

    #[test]
    fn test_whitespace_around_fields_accepted() {
        let frame = parse_frame(" 1 /0/1/0/1/0/0/0/0/ 45.0/47.0 /12.5/60/62/0").unwrap();
        assert_eq!(frame.mode, DriveMode::Normal);
        assert_eq!(frame.speed_left, 45.0);
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse_frame("1/0/1/0/1/0/0/0/0/45.0/47.0").unwrap_err();
        assert_eq!(err.reason, DecodeFailure::TooFewFields { found: 11 });
        assert_eq!(err.raw_line, "1/0/1/0/1/0/0/0/0/45.0/47.0");
    }

    #[test]
    fn test_fourteen_fields_rejected() {
        let line = "1/0/1/0/1/0/0/0/0/45.0/47.0/12.5/60/62";
        assert!(matches!(
            parse_frame(line).unwrap_err().reason,
            DecodeFailure::TooFewFields { found: 14 }
        ));
    }

    #[test]
    fn test_non_numeric_integer_field() {
        let err = parse_frame(&replace_field(4, "D")).unwrap_err();
        match err.reason {
            DecodeFailure::InvalidInteger { index, field, value } => {
                assert_eq!(index, 4);
                assert_eq!(field, "gear");
                assert_eq!(value, "D");
            }
            other => panic!("Expected InvalidInteger, got: {:?}", other),
        }
    }

    #[test]
    fn test_float_in_integer_field_rejected() {
        let err = parse_frame(&replace_field(12, "60.5")).unwrap_err();
        assert!(matches!(err.reason, DecodeFailure::InvalidInteger { index: 12, .. }));
    }

    #[test]
    fn test_non_numeric_float_field() {
        let err = parse_frame(&replace_field(10, "fast")).unwrap_err();
        assert!(matches!(err.reason, DecodeFailure::InvalidFloat { index: 10, .. }));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let err = parse_frame(&replace_field(9, "NaN")).unwrap_err();
        assert!(matches!(err.reason, DecodeFailure::NonFinite { index: 9, .. }));

        let err = parse_frame(&replace_field(11, "inf")).unwrap_err();
        assert!(matches!(err.reason, DecodeFailure::NonFinite { index: 11, .. }));
    }

    #[test]
    fn test_out_of_range_codes() {
        for (index, value) in [(0, "3"), (1, "-1"), (4, "7"), (5, "2"), (14, "2")] {
            let err = parse_frame(&replace_field(index, value)).unwrap_err();
            assert!(
                matches!(err.reason, DecodeFailure::OutOfRange { index: i, .. } if i == index),
                "field {} = {} should be out of range, got {:?}",
                index,
                value,
                err.reason
            );
        }
    }

    #[test]
    fn test_throttle_over_100_rejected() {
        let err = parse_frame(&replace_field(13, "101")).unwrap_err();
        assert_eq!(
            err.reason,
            DecodeFailure::OutOfRange {
                index: 13,
                field: "throttle_right_pct",
                value: 101,
                max: 100,
            }
        );
    }

    #[test]
    fn test_empty_field_rejected() {
        let err = parse_frame(&replace_field(2, "")).unwrap_err();
        assert!(matches!(err.reason, DecodeFailure::InvalidInteger { index: 2, .. }));
    }

    #[test]
    fn test_decode_idle_inputs() {
        assert_eq!(decode(None), Ok(None));
        assert_eq!(decode(Some("")), Ok(None));
        assert_eq!(decode(Some("  \r")), Ok(None));
    }

    #[test]
    fn test_decode_reports_malformed_line() {
        let err = decode(Some("hello")).unwrap_err();
        assert_eq!(err.raw_line, "hello");
        assert_eq!(err.reason, DecodeFailure::TooFewFields { found: 1 });
        assert!(err.to_string().contains("hello"));
    }

    #[test]
    fn test_decode_trims_line_endings() {
        let line = format!("{}\r\n", SAMPLE_LINE);
        let frame = decode(Some(&line)).unwrap().unwrap();
        assert!(!frame.eds_active);
        assert_eq!(frame.throttle_right_pct, 62);
    }
}
