//! Julian-date conversions, step-size parsing, and sampling grids.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{SECONDS_PER_DAY, UNIX_EPOCH_JD};

/// Fraction of a step tolerated when deciding whether the last epoch fits the window.
const GRID_TOLERANCE_STEPS: f64 = 1e-9;

/// Largest number of epochs a single grid may hold.
pub const MAX_GRID_SAMPLES: usize = 100_000;

/// Errors raised while interpreting dates, step sizes, or time windows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    #[error("unrecognised date `{0}` (expected YYYY-MM-DD, RFC 3339, or a Julian Date)")]
    InvalidDate(String),
    #[error("unrecognised step size `{0}` (expected e.g. `1d`, `6h`, `30m`)")]
    InvalidStep(String),
    #[error("window start {start_jd} is after window end {end_jd}")]
    InvertedWindow { start_jd: f64, end_jd: f64 },
    #[error("window bounds must be finite Julian Dates")]
    NonFiniteWindow,
    #[error("window of {days} days at step {step} exceeds {max} samples")]
    TooManySamples { days: f64, step: StepSize, max: usize },
}

/// Convert a UTC timestamp to a Julian Date.
pub fn julian_date(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / (SECONDS_PER_DAY * 1_000.0) + UNIX_EPOCH_JD
}

/// Convert a Julian Date back to a UTC timestamp (millisecond resolution).
pub fn datetime_from_jd(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1_000.0).round();
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Format a Julian Date as `YYYY-MM-DD HH:MM:SS` (UTC) for logs and provider queries.
pub fn format_jd(jd: f64) -> String {
    match datetime_from_jd(jd) {
        Some(instant) => instant.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("JD {jd}"),
    }
}

/// Parse a user-supplied epoch into a Julian Date.
///
/// Accepts RFC 3339 timestamps (`2029-04-13T21:46:00Z`), naive date-times
/// (`2024-01-01T12:00:00`, `2024-01-01 12:00`), calendar dates (`2024-01-01`),
/// and bare Julian Dates (`2460310.5`).
pub fn parse_epoch(input: &str) -> Result<f64, TimeError> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(julian_date(instant.with_timezone(&Utc)));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(julian_date(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(julian_date(midnight.and_utc()));
        }
    }
    match trimmed.parse::<f64>() {
        Ok(jd) if jd.is_finite() && jd > 0.0 => Ok(jd),
        _ => Err(TimeError::InvalidDate(input.to_string())),
    }
}

/// Unit of a sampling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepUnit {
    Minutes,
    Hours,
    Days,
}

impl StepUnit {
    fn code(self) -> &'static str {
        match self {
            StepUnit::Minutes => "m",
            StepUnit::Hours => "h",
            StepUnit::Days => "d",
        }
    }

    fn days(self) -> f64 {
        match self {
            StepUnit::Minutes => 1.0 / 1_440.0,
            StepUnit::Hours => 1.0 / 24.0,
            StepUnit::Days => 1.0,
        }
    }
}

/// Sampling step such as `7d` or `6h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepSize {
    value: u32,
    unit: StepUnit,
}

impl StepSize {
    pub const ONE_DAY: StepSize = StepSize {
        value: 1,
        unit: StepUnit::Days,
    };

    /// A step of `value` units; zero-length steps are rejected.
    pub fn new(value: u32, unit: StepUnit) -> Result<Self, TimeError> {
        if value == 0 {
            return Err(TimeError::InvalidStep(format!("{value}{}", unit.code())));
        }
        Ok(Self { value, unit })
    }

    pub fn days(value: u32) -> Result<Self, TimeError> {
        Self::new(value, StepUnit::Days)
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn unit(&self) -> StepUnit {
        self.unit
    }

    /// Step length in days.
    pub fn as_days(&self) -> f64 {
        f64::from(self.value) * self.unit.days()
    }
}

impl fmt::Display for StepSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.code())
    }
}

impl FromStr for StepSize {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let value: u32 = digits
            .parse()
            .map_err(|_| TimeError::InvalidStep(s.to_string()))?;
        let unit = match unit.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "days" => StepUnit::Days,
            "h" | "hour" | "hours" => StepUnit::Hours,
            "m" | "min" | "mins" | "minutes" => StepUnit::Minutes,
            _ => return Err(TimeError::InvalidStep(s.to_string())),
        };
        Self::new(value, unit).map_err(|_| TimeError::InvalidStep(s.to_string()))
    }
}

impl TryFrom<String> for StepSize {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StepSize> for String {
    fn from(value: StepSize) -> Self {
        value.to_string()
    }
}

/// Regular sampling grid `start + k·step` for `k = 0..=⌊(end − start)/step⌋`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    start_jd: f64,
    end_jd: f64,
    step: StepSize,
}

impl TimeGrid {
    pub fn new(start_jd: f64, end_jd: f64, step: StepSize) -> Result<Self, TimeError> {
        if !start_jd.is_finite() || !end_jd.is_finite() {
            return Err(TimeError::NonFiniteWindow);
        }
        if start_jd > end_jd {
            return Err(TimeError::InvertedWindow { start_jd, end_jd });
        }
        let steps = (end_jd - start_jd) / step.as_days();
        if !steps.is_finite() || steps >= MAX_GRID_SAMPLES as f64 {
            return Err(TimeError::TooManySamples {
                days: end_jd - start_jd,
                step,
                max: MAX_GRID_SAMPLES,
            });
        }
        Ok(Self {
            start_jd,
            end_jd,
            step,
        })
    }

    pub fn start_jd(&self) -> f64 {
        self.start_jd
    }

    pub fn end_jd(&self) -> f64 {
        self.end_jd
    }

    pub fn step(&self) -> StepSize {
        self.step
    }

    /// Number of epochs on the grid; a step longer than the window yields one.
    pub fn len(&self) -> usize {
        let steps = (self.end_jd - self.start_jd) / self.step.as_days() + GRID_TOLERANCE_STEPS;
        steps.floor() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Grid epochs in ascending order.
    pub fn epochs(&self) -> impl Iterator<Item = f64> {
        let start = self.start_jd;
        let step = self.step.as_days();
        (0..self.len()).map(move |k| start + k as f64 * step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_dates_map_to_midnight_julian_dates() {
        assert_eq!(parse_epoch("2024-01-01").unwrap(), 2_460_310.5);
        assert_eq!(parse_epoch("2000-01-01T12:00:00Z").unwrap(), 2_451_545.0);
        assert_eq!(parse_epoch("2460310.5").unwrap(), 2_460_310.5);
    }

    #[test]
    fn rfc3339_with_minutes_resolves_fractional_day() {
        let jd = parse_epoch("2029-04-13T21:46:00Z").unwrap();
        let expected = parse_epoch("2029-04-13").unwrap() + (21.0 * 60.0 + 46.0) / 1_440.0;
        assert!((jd - expected).abs() < 1e-8, "jd = {jd}");
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(matches!(
            parse_epoch("next tuesday"),
            Err(TimeError::InvalidDate(_))
        ));
        assert!(parse_epoch("-5").is_err());
    }

    #[test]
    fn step_sizes_parse_and_display() {
        let step: StepSize = "7d".parse().unwrap();
        assert_eq!(step, StepSize::days(7).unwrap());
        assert_eq!(step.to_string(), "7d");
        let hours: StepSize = "6 hours".parse().unwrap();
        assert!((hours.as_days() - 0.25).abs() < 1e-12);
        assert!("0d".parse::<StepSize>().is_err());
        assert!("d".parse::<StepSize>().is_err());
        assert!("3w".parse::<StepSize>().is_err());
    }

    #[test]
    fn weekly_grid_over_january_has_five_epochs() {
        let start = parse_epoch("2024-01-01").unwrap();
        let end = parse_epoch("2024-01-31").unwrap();
        let grid = TimeGrid::new(start, end, StepSize::days(7).unwrap()).unwrap();
        let epochs: Vec<f64> = grid.epochs().collect();
        assert_eq!(grid.len(), 5);
        assert_eq!(epochs.len(), 5);
        assert_eq!(epochs[4], start + 28.0);
    }

    #[test]
    fn step_longer_than_window_keeps_only_start() {
        let grid = TimeGrid::new(2_460_000.5, 2_460_002.5, StepSize::days(10).unwrap()).unwrap();
        assert_eq!(grid.epochs().collect::<Vec<_>>(), vec![2_460_000.5]);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = TimeGrid::new(2_460_010.5, 2_460_000.5, StepSize::ONE_DAY).unwrap_err();
        assert!(matches!(err, TimeError::InvertedWindow { .. }));
    }

    #[test]
    fn zero_steps_are_rejected_by_every_constructor() {
        assert!(matches!(StepSize::days(0), Err(TimeError::InvalidStep(_))));
        assert!(StepSize::new(0, StepUnit::Minutes).is_err());
        assert_eq!(StepSize::new(6, StepUnit::Hours).unwrap().to_string(), "6h");
    }

    #[test]
    fn oversized_grids_are_rejected_before_sampling() {
        let minute: StepSize = "1m".parse().unwrap();
        let err = TimeGrid::new(0.5, 1_000_000.5, minute).unwrap_err();
        assert!(matches!(err, TimeError::TooManySamples { max: MAX_GRID_SAMPLES, .. }));

        let century_daily = TimeGrid::new(2_451_545.0, 2_451_545.0 + 36_525.0, StepSize::ONE_DAY);
        assert_eq!(century_daily.unwrap().len(), 36_526);
    }

    #[test]
    fn julian_dates_round_trip_through_datetime() {
        let jd = 2_460_310.75;
        let instant = datetime_from_jd(jd).unwrap();
        assert!((julian_date(instant) - jd).abs() < 1e-9);
        assert_eq!(format_jd(jd), "2024-01-01 06:00:00");
    }
}
