//! Time values: effort amounts, instants, and the clock that supplies "now".
//!
//! `Amount` is a signed duration in milliseconds with a compact notation
//! (`3p`, `2h`, `-1d`). `Point` is a local wall-clock instant in the
//! configured timezone. Nothing in the engine reads the system time directly;
//! it always goes through a [`Clock`].

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_POMODORO: i64 = 25 * MS_PER_MINUTE;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
pub const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Pomodoro conversions round up to a fifth of a pomodoro (5 minutes).
const POMODORO_STEP_MS: i64 = MS_PER_POMODORO / 5;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?\s*(\d+(?:\.\d*)?|\.\d+)\s*([dhmwp])?$").expect("amount regex is valid")
});

/// A signed duration, stored in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.saturating_mul(MS_PER_MINUTE))
    }

    pub fn from_hours(hours: i64) -> Self {
        Self(hours.saturating_mul(MS_PER_HOUR))
    }

    pub fn from_days(days: f64) -> Self {
        Self((days * MS_PER_DAY as f64).round() as i64)
    }

    pub fn from_pomodoros(pomodoros: f64) -> Self {
        Self((pomodoros * MS_PER_POMODORO as f64).round() as i64)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_days(&self) -> f64 {
        self.0 as f64 / MS_PER_DAY as f64
    }

    /// Pomodoros, rounded up to the nearest 0.2.
    pub fn as_pomodoros(&self) -> f64 {
        let mut steps = self.0.div_euclid(POMODORO_STEP_MS);
        if self.0.rem_euclid(POMODORO_STEP_MS) != 0 {
            steps += 1;
        }
        steps as f64 / 5.0
    }

    /// Exact pomodoros, no rounding.
    pub fn pomodoros(&self) -> f64 {
        self.0 as f64 / MS_PER_POMODORO as f64
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Clamped to the range `TimeDelta` can hold.
    pub fn to_time_delta(&self) -> TimeDelta {
        TimeDelta::try_milliseconds(self.0).unwrap_or(if self.0 < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let caps = AMOUNT_RE
            .captures(trimmed)
            .with_context(|| format!("invalid amount '{s}' (expected e.g. 3p, 2h, 30m, 1d, 1w)"))?;

        let value: f64 = caps[2]
            .parse()
            .with_context(|| format!("invalid number in amount '{s}'"))?;

        let unit_ms = match caps.get(3).map(|m| m.as_str()) {
            Some("d") => MS_PER_DAY,
            Some("h") => MS_PER_HOUR,
            Some("m") => MS_PER_MINUTE,
            Some("w") => MS_PER_WEEK,
            // unitless amounts are pomodoros
            Some("p") | None => MS_PER_POMODORO,
            Some(other) => bail!("unknown amount unit '{other}'"),
        };

        let sign = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1.0 } else { 1.0 };
        Ok(Self((sign * value * unit_ms as f64).round() as i64))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            return write!(f, "-{}", self.abs());
        }
        if self.0 != 0 && self.0 % MS_PER_DAY == 0 {
            write!(f, "{}d", self.0 / MS_PER_DAY)
        } else {
            write!(f, "{}p", self.as_pomodoros())
        }
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(self.0.saturating_neg())
    }
}

impl Mul<f64> for Amount {
    type Output = Amount;
    fn mul(self, factor: f64) -> Amount {
        Amount((self.0 as f64 * factor).round() as i64)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

/// A wall-clock instant.
///
/// Serialized as `YYYY-MM-DD` at midnight, otherwise `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Point(NaiveDateTime);

impl Point {
    pub fn now(clock: &dyn Clock) -> Self {
        clock.now()
    }

    pub fn new(dt: NaiveDateTime) -> Self {
        Self(dt)
    }

    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .with_context(|| format!("invalid date {year}-{month}-{day}"))?;
        let time = NaiveTime::from_hms_opt(hour, min, sec)
            .with_context(|| format!("invalid time {hour}:{min}:{sec}"))?;
        Ok(Self(date.and_time(time)))
    }

    pub fn from_epoch_ms(ms: i64) -> Result<Self> {
        let dt = DateTime::<Utc>::from_timestamp_millis(ms)
            .with_context(|| format!("epoch millis out of range: {ms}"))?;
        Ok(Self(dt.naive_utc()))
    }

    pub fn as_epoch_ms(&self) -> i64 {
        self.0.and_utc().timestamp_millis()
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn is_midnight(&self) -> bool {
        self.0.time() == NaiveTime::MIN
    }

    /// Midnight at the start of this point's day.
    pub fn start_of_day(&self) -> Self {
        Self(self.0.date().and_time(NaiveTime::MIN))
    }

    /// Seconds-resolution copy (drops sub-second noise from system clocks).
    pub fn truncated(&self) -> Self {
        Self(self.0.with_nanosecond(0).unwrap_or(self.0))
    }
}

impl FromStr for Point {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(Self(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
            return Ok(Self(dt));
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid point '{s}': {e}"))?;
        Ok(Self(date.and_time(NaiveTime::MIN)))
    }
}

impl TryFrom<String> for Point {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Point> for String {
    fn from(p: Point) -> String {
        p.to_string()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_midnight() {
            write!(f, "{}", self.0.format("%Y-%m-%d"))
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
        }
    }
}

impl Add<Amount> for Point {
    type Output = Point;
    fn add(self, rhs: Amount) -> Point {
        let delta = rhs.to_time_delta();
        Point(self.0.checked_add_signed(delta).unwrap_or(if rhs.is_negative() {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        }))
    }
}

impl Sub<Amount> for Point {
    type Output = Point;
    fn sub(self, rhs: Amount) -> Point {
        let delta = rhs.to_time_delta();
        Point(self.0.checked_sub_signed(delta).unwrap_or(if rhs.is_negative() {
            NaiveDateTime::MAX
        } else {
            NaiveDateTime::MIN
        }))
    }
}

impl Sub for Point {
    type Output = Amount;
    fn sub(self, rhs: Point) -> Amount {
        Amount::from_millis((self.0 - rhs.0).num_milliseconds())
    }
}

/// Source of "now" for everything time-dependent.
pub trait Clock: Send + Sync {
    fn now(&self) -> Point;
}

/// Real time, read as wall-clock in an IANA timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: &str) -> Result<Self> {
        let tz: Tz = tz
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
        Ok(Self { tz })
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Point {
        Point(Utc::now().with_timezone(&self.tz).naive_local()).truncated()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Point);

impl Clock for FixedClock {
    fn now(&self) -> Point {
        self.0
    }
}
