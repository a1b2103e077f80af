//! # Prayer Arc Core Library
//!
//! This library provides the temporal cycle and wave-geometry engine behind the
//! prayer arc display, plus the collaborators the binary wires around it
//! (configuration, the prayer-time API client, location handling, rendering).
//!
//! ## Design Philosophy
//!
//! ### Pure Engine
//! - **No hidden state**: [`cycle::resolve`] is a pure function of `now`, the
//!   installed [`schedule::PrayerSchedule`] and the drawing [`wave::Ellipse`]
//! - **Never fails**: malformed time strings degrade to the default table rather
//!   than surfacing errors to the caller
//! - **Closed vocabulary**: the five prayers are a fixed enumeration with an
//!   explicit successor/predecessor mapping, not strings compared by name
//!
//! ### The Cycle
//! A cycle runs from one Fajr to the next. For display the cycle is padded by
//! 90 minutes before Fajr and after Isha (the "visual window"), and progress
//! through that window drives the sun marker along a trough → crest → trough
//! sine wave (night → day → night).
//!
//! ### Data Flow
//! 1. **Startup**: install the default schedule → resolve → display
//! 2. **Online**: fetch timings for the current coordinates → normalize → install
//! 3. **Offline**: keep the previously installed (or default) schedule, mark as fallback
//! 4. **Every minute**: resolve again with a fresh `now`
//!
//! ## Core Types
//!
//! - [`Prayer`]: one of the five daily prayers, in fixed order
//! - [`TimeValue`]: a validated hour/minute pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Module declarations
pub mod config;
pub mod cycle;
pub mod format;
pub mod location;
pub mod normalize;
pub mod prayer_api;
pub mod renderer;
pub mod schedule;
pub mod shell;
pub mod wave;

/// One of the five daily prayers.
///
/// Variants are declared in the order they occur within a cycle, so the derived
/// `Ord` matches chronological order and [`Prayer::index`] is the position in
/// every schedule.
///
/// # Example
/// ```
/// use prayer_arc_lib::Prayer;
///
/// assert_eq!(Prayer::Asr.next(), Prayer::Maghrib);
/// assert_eq!(Prayer::Isha.next(), Prayer::Fajr);
/// assert_eq!(Prayer::Fajr.previous(), Prayer::Isha);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All prayers in cycle order.
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Position within a cycle (Fajr = 0, Isha = 4).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    /// Field name carrying this prayer's time in an API `timings` object.
    pub fn api_key(self) -> &'static str {
        self.name()
    }

    /// The prayer that follows this one. Isha wraps to the next cycle's Fajr.
    pub fn next(self) -> Prayer {
        Prayer::ALL[(self.index() + 1) % Prayer::ALL.len()]
    }

    /// The prayer that precedes this one. Fajr wraps to the previous cycle's Isha.
    pub fn previous(self) -> Prayer {
        Prayer::ALL[(self.index() + Prayer::ALL.len() - 1) % Prayer::ALL.len()]
    }

    pub fn is_last(self) -> bool {
        self == Prayer::Isha
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names none of the five prayers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown prayer name: {0}")]
pub struct UnknownPrayer(pub String);

impl FromStr for Prayer {
    type Err = UnknownPrayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prayer::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPrayer(s.to_string()))
    }
}

/// A time of day with minute resolution.
///
/// Only ever produced by parsing a canonical `HH:MM` string, so `hour` is
/// always 0–23 and `minute` 0–59.
///
/// # Example
/// ```
/// use prayer_arc_lib::TimeValue;
///
/// let t = TimeValue::parse_canonical("05:28").unwrap();
/// assert_eq!((t.hour(), t.minute()), (5, 28));
/// assert!(TimeValue::parse_canonical("5:28").is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeValue {
    hour: u8,
    minute: u8,
}

impl TimeValue {
    /// Parse a strict `HH:MM` string. Out-of-range fields are rejected here;
    /// clamping is the normalizer's job.
    pub fn parse_canonical(s: &str) -> Option<Self> {
        if !normalize::is_canonical(s) {
            return None;
        }
        let hour: u8 = s[0..2].parse().ok()?;
        let minute: u8 = s[3..5].parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    pub fn hour(self) -> u32 {
        u32::from(self.hour)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minute)
    }

    pub fn to_naive_time(self) -> chrono::NaiveTime {
        // Fields are range-checked on construction
        chrono::NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or_default()
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
