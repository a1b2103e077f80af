//! # Prayer Schedule
//!
//! The set of five daily prayer times the engine resolves against. A schedule
//! always holds exactly five markers in cycle order; the fixed-size array makes
//! that invariant a property of the type.
//!
//! ## Sources
//! - **Default table**: [`DEFAULT_TIMES`], used at startup and as the recovery
//!   value whenever external data cannot be trusted
//! - **External payload**: the `timings` object of a prayer-time API response,
//!   see [`PrayerSchedule::from_external`]
//!
//! ## Fallback Policy
//! 1. A single unparseable entry is replaced by that slot's default time
//! 2. If any entry still fails the canonical `HH:MM` gate afterwards, the whole
//!    schedule is discarded and the default table is returned. Partial
//!    application never happens at that stage.

use crate::normalize::{is_canonical, normalize_value};
use crate::{Prayer, TimeValue};
use serde::Serialize;
use serde_json::Value;

/// Built-in schedule, in cycle order. Shared by startup seeding and error recovery.
pub const DEFAULT_TIMES: [(Prayer, &str); 5] = [
    (Prayer::Fajr, "05:28"),
    (Prayer::Dhuhr, "12:21"),
    (Prayer::Asr, "15:46"),
    (Prayer::Maghrib, "18:09"),
    (Prayer::Isha, "19:31"),
];

/// One named prayer time.
///
/// Only built through validated constructors, so `time` is always canonical
/// `HH:MM` and `parsed` is its exact decomposition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrayerMarker {
    prayer: Prayer,
    time: String,
    parsed: TimeValue,
}

impl PrayerMarker {
    /// Build a marker from a canonical `HH:MM` string. Non-canonical input yields `None`.
    pub fn new(prayer: Prayer, time: &str) -> Option<Self> {
        let parsed = TimeValue::parse_canonical(time)?;
        Some(Self {
            prayer,
            time: time.to_string(),
            parsed,
        })
    }

    pub fn prayer(&self) -> Prayer {
        self.prayer
    }

    /// Canonical `HH:MM`
    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn parsed(&self) -> TimeValue {
        self.parsed
    }

    /// `time` is canonical and `parsed` agrees with it.
    fn is_consistent(&self) -> bool {
        is_canonical(&self.time) && TimeValue::parse_canonical(&self.time) == Some(self.parsed)
    }

    fn default_for(prayer: Prayer) -> Self {
        let (_, time) = DEFAULT_TIMES[prayer.index()];
        let parsed = TimeValue::parse_canonical(time).unwrap_or_else(|| {
            unreachable!("default table entry {time} for {prayer} is not canonical")
        });
        Self {
            prayer,
            time: time.to_string(),
            parsed,
        }
    }
}

/// Exactly five prayer markers in the order Fajr, Dhuhr, Asr, Maghrib, Isha.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrayerSchedule {
    markers: [PrayerMarker; 5],
}

impl Default for PrayerSchedule {
    fn default() -> Self {
        Self {
            markers: Prayer::ALL.map(PrayerMarker::default_for),
        }
    }
}

impl PrayerSchedule {
    /// Build a schedule from the `timings` object of an API payload.
    ///
    /// Each prayer's field is looked up by [`Prayer::api_key`] and normalized;
    /// an unusable field falls back to that slot's default time. A container
    /// that is not a JSON object provides no fields at all, which yields the
    /// complete default table.
    ///
    /// # Example
    /// ```
    /// use prayer_arc_lib::{schedule::PrayerSchedule, Prayer};
    /// use serde_json::json;
    ///
    /// let schedule = PrayerSchedule::from_external(&json!({
    ///     "Fajr": "04:12 (PKT)", "Dhuhr": "12:30", "Asr": "16:58",
    ///     "Maghrib": "19:20", "Isha": "20:45",
    /// }));
    /// assert_eq!(schedule.get(Prayer::Fajr).time(), "04:12");
    /// ```
    pub fn from_external(raw: &Value) -> Self {
        let fields = raw.as_object();
        let mut entries = Vec::with_capacity(Prayer::ALL.len());

        for prayer in Prayer::ALL {
            let normalized = fields.and_then(|f| normalize_value(f.get(prayer.api_key())));
            let time = normalized.unwrap_or_else(|| DEFAULT_TIMES[prayer.index()].1.to_string());
            entries.push((prayer, time));
        }

        Self::from_entries(entries)
    }

    /// Build a schedule from (prayer, time) pairs that must already be
    /// canonical. Any wrong count, order or non-canonical time yields the
    /// default table.
    pub fn from_entries(entries: Vec<(Prayer, String)>) -> Self {
        if entries.len() != Prayer::ALL.len() || !entries.iter().all(|(_, t)| is_canonical(t)) {
            return Self::default();
        }

        let markers: Option<Vec<PrayerMarker>> = entries
            .iter()
            .map(|(prayer, time)| PrayerMarker::new(*prayer, time))
            .collect();

        match markers {
            Some(markers) => Self::from_markers(markers),
            None => Self::default(),
        }
    }

    /// Build a schedule from an arbitrary list of markers.
    ///
    /// Anything other than exactly five consistent markers in cycle order is
    /// treated as malformed and replaced by the default table.
    pub fn from_markers(markers: Vec<PrayerMarker>) -> Self {
        let well_formed = markers.len() == Prayer::ALL.len()
            && markers
                .iter()
                .zip(Prayer::ALL)
                .all(|(marker, prayer)| marker.prayer == prayer && marker.is_consistent());

        if !well_formed {
            return Self::default();
        }

        match <[PrayerMarker; 5]>::try_from(markers) {
            Ok(markers) => Self { markers },
            Err(_) => Self::default(),
        }
    }

    pub fn markers(&self) -> &[PrayerMarker; 5] {
        &self.markers
    }

    pub fn get(&self, prayer: Prayer) -> &PrayerMarker {
        &self.markers[prayer.index()]
    }

    pub fn first(&self) -> &PrayerMarker {
        self.get(Prayer::Fajr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrayerMarker> {
        self.markers.iter()
    }

    /// True when every (prayer, time) pair matches `other` in order.
    ///
    /// Used to skip redundant state propagation when a refetch returns the same
    /// times; never needed for correctness.
    pub fn same_times(&self, other: &PrayerSchedule) -> bool {
        self.markers
            .iter()
            .zip(other.markers.iter())
            .all(|(a, b)| a.prayer == b.prayer && a.time == b.time)
    }

    pub fn is_default(&self) -> bool {
        self.same_times(&Self::default())
    }
}
