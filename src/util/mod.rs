//! Utilities: the timestamp type the claim model is built on, and the
//! process-wide clock settings (override time, time modifier, grace period)
//! consulted during verification.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde_derive::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::RwLock;

pub(crate) mod ser;

/// A UTC timestamp, serialized on the wire as RFC 3339 with microsecond
/// precision and a trailing `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, adjusted by the process-wide override/modifier
    /// settings.
    pub fn now() -> Self {
        now()
    }

    /// Parse a timestamp from its wire form. Accepts any RFC 3339 precision.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(text)
            .map_err(|e| Error::InvalidFormat(format!("timestamp: {}", e)))?;
        Ok(Self(parsed.with_timezone(&Utc)))
    }

    /// The wire form of this timestamp.
    pub fn to_wire(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// This timestamp shifted by a number of seconds (negative shifts back).
    pub fn add_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(seconds))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Self(date)
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

#[derive(Default)]
struct ClockSettings {
    override_time: Option<DateTime<Utc>>,
    modifier_secs: i64,
    grace_secs: u64,
}

static CLOCK: Lazy<RwLock<ClockSettings>> = Lazy::new(|| RwLock::new(ClockSettings::default()));

/// The current time as this crate sees it: the override time if one is set,
/// otherwise the system clock shifted by the time modifier.
pub fn now() -> Timestamp {
    let settings = CLOCK.read().expect("dime_core::util::now() -- clock lock poisoned");
    match settings.override_time {
        Some(fixed) => Timestamp(fixed),
        None => Timestamp(Utc::now() + chrono::Duration::seconds(settings.modifier_secs)),
    }
}

/// Pin the clock to a fixed instant (pass `None` to release it). Meant for
/// deterministic tests.
pub fn set_override_time(time: Option<Timestamp>) {
    let mut settings = CLOCK.write().expect("dime_core::util::set_override_time() -- clock lock poisoned");
    settings.override_time = time.map(|t| t.0);
}

/// Shift every `now()` reading by a signed number of seconds.
pub fn set_time_modifier(seconds: i64) {
    let mut settings = CLOCK.write().expect("dime_core::util::set_time_modifier() -- clock lock poisoned");
    settings.modifier_secs = seconds;
}

/// The configured time modifier, in seconds.
pub fn time_modifier() -> i64 {
    CLOCK.read().expect("dime_core::util::time_modifier() -- clock lock poisoned").modifier_secs
}

/// Treat timestamps within this many seconds of each other as equal during
/// verification.
pub fn set_grace_period(seconds: u64) {
    let mut settings = CLOCK.write().expect("dime_core::util::set_grace_period() -- clock lock poisoned");
    settings.grace_secs = seconds;
}

/// The configured grace period, in seconds.
pub fn grace_period() -> u64 {
    CLOCK.read().expect("dime_core::util::grace_period() -- clock lock poisoned").grace_secs
}

/// Compare two timestamps, treating any difference within the grace period
/// as equality.
pub(crate) fn cmp_with_grace(a: &Timestamp, b: &Timestamp) -> std::cmp::Ordering {
    let grace = chrono::Duration::seconds(grace_period() as i64);
    let diff = (a.0 - b.0).abs();
    if diff <= grace {
        std::cmp::Ordering::Equal
    } else {
        a.0.cmp(&b.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn timestamp_wire_round_trip() {
        let ts = Timestamp::parse("2024-02-29T13:37:00.123456Z").unwrap();
        assert_eq!(ts.to_wire(), "2024-02-29T13:37:00.123456Z");
        let coarse = Timestamp::parse("2024-02-29T13:37:00Z").unwrap();
        assert_eq!(coarse.to_wire(), "2024-02-29T13:37:00.000000Z");
        assert!(Timestamp::parse("last thursday").is_err());
    }

    #[test]
    fn timestamp_ordering() {
        let a = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        let b = a.add_seconds(10);
        assert!(a < b);
        assert_eq!(b.add_seconds(-10), a);
    }

    #[test]
    fn override_and_modifier() {
        let _guard = test::lock_globals();
        let fixed = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        set_override_time(Some(fixed));
        assert_eq!(now(), fixed);
        set_override_time(None);
        set_time_modifier(3600);
        let shifted = now();
        set_time_modifier(0);
        let plain = now();
        assert!((*shifted - *plain).num_seconds() >= 3590);
    }

    #[test]
    fn grace_period_comparison() {
        let _guard = test::lock_globals();
        let a = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        set_grace_period(2);
        assert_eq!(cmp_with_grace(&a.add_seconds(2), &a), Ordering::Equal);
        assert_eq!(cmp_with_grace(&a.add_seconds(3), &a), Ordering::Greater);
        assert_eq!(cmp_with_grace(&a, &a.add_seconds(3)), Ordering::Less);
        set_grace_period(0);
        assert_eq!(cmp_with_grace(&a.add_seconds(1), &a), Ordering::Greater);
        assert_eq!(cmp_with_grace(&a, &a), Ordering::Equal);
    }
}
