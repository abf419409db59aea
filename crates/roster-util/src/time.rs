//! Time utilities for rosterd
//!
//! Shift bookkeeping works in Unix seconds stored as real numbers, which is
//! what existing ledger files contain. [`Clock`] is the seam the ledger reads
//! time through, so tests can drive it by hand.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `ROSTER_MOCK_TIME` environment variable can be set
//! to override the system time. The mocked clock advances at the real rate
//! from the given instant.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "ROSTER_MOCK_TIME";

/// Offset between mock time and real time, computed once per process.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Current local time, respecting `ROSTER_MOCK_TIME` in debug builds.
pub fn now() -> DateTime<Local> {
    let real_now = Local::now();
    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// A point in time as Unix seconds.
///
/// Serializes as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0.0);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self(dt.timestamp_micros() as f64 / 1_000_000.0)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later)
    pub fn seconds_since(&self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    pub fn plus_secs(&self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    pub fn minus_secs(&self, secs: f64) -> Self {
        Self(self.0 - secs)
    }

    /// Convert to local time; `None` if out of chrono's range or not finite
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        if !self.0.is_finite() {
            return None;
        }
        let secs = self.0.floor();
        let nanos = ((self.0 - secs) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
            .map(|utc| utc.with_timezone(&Local))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_timestamp(*self))
    }
}

/// Source of "now" for the ledger
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock that never reports an earlier time than it already has.
///
/// A system clock step backwards (NTP correction, manual change) would
/// otherwise produce shifts with negative length.
#[derive(Debug, Default)]
pub struct SystemClock {
    /// Bit pattern of the last reading. Non-negative f64 values order the same
    /// way as their bit patterns, so `fetch_max` keeps the largest reading.
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let real = Timestamp::from_datetime(&now()).as_secs().max(0.0);
        let prev = f64::from_bits(self.last.fetch_max(real.to_bits(), Ordering::AcqRel));

        if real < prev {
            tracing::warn!(
                reported = real,
                previous = prev,
                "System clock went backwards, holding previous reading"
            );
            Timestamp(prev)
        } else {
            Timestamp(real)
        }
    }
}

/// Manually driven clock for tests and tooling
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.as_secs().to_bits()),
        }
    }

    pub fn set(&self, ts: Timestamp) {
        self.secs.store(ts.as_secs().to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        let current = f64::from_bits(self.secs.load(Ordering::SeqCst));
        self.set(Timestamp(current + secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(f64::from_bits(self.secs.load(Ordering::SeqCst)))
    }
}

/// Format a span of seconds as `H:MM:SS`, prefixed with `N day(s), ` once it
/// exceeds a day. Fractional seconds are truncated; negative spans show as zero.
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.trunc() as u64
    } else {
        0
    };

    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// Format a timestamp with full local date and time
pub fn format_timestamp(ts: Timestamp) -> String {
    match ts.to_local() {
        Some(dt) => format_datetime_full(&dt),
        None => "invalid time".to_string(),
    }
}

pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
