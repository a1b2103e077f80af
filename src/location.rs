//! # Location Handling
//!
//! Coordinates for the prayer-time lookup, where they come from, and when a
//! new position warrants a refetch.
//!
//! A [`LocationProvider`] offers a one-shot read plus an optional stream of
//! updates. When nothing arrives within the configured wait, the shell falls
//! back to [`FALLBACK_COORDS`].

use crate::format::format_coords;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// Used when no location is available in time (Karachi).
pub const FALLBACK_COORDS: Coordinates = Coordinates {
    latitude: 24.866793937143527,
    longitude: 67.01059830949353,
};

/// Movement in either axis, in degrees, that triggers a refetch.
pub const MOVE_THRESHOLD_DEG: f64 = 0.01;

/// Age after which fetched data is refreshed on the next location update.
pub const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Validated coordinates; non-finite values yield `None`.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        (latitude.is_finite() && longitude.is_finite()).then_some(Self {
            latitude,
            longitude,
        })
    }

    pub fn label(&self) -> String {
        format_coords(self.latitude, self.longitude)
    }

    /// True when `other` is more than [`MOVE_THRESHOLD_DEG`] away in either axis.
    pub fn moved_from(&self, other: &Coordinates) -> bool {
        (self.latitude - other.latitude).abs() > MOVE_THRESHOLD_DEG
            || (self.longitude - other.longitude).abs() > MOVE_THRESHOLD_DEG
    }
}

/// Outcome of asking a provider where the device is.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LocationFix {
    Available(Coordinates),
    /// The user refused access to their position.
    Denied,
    /// No position source, or it has nothing yet.
    #[default]
    Unavailable,
}

impl LocationFix {
    pub fn coords(&self) -> Option<Coordinates> {
        match self {
            LocationFix::Available(coords) => Some(*coords),
            _ => None,
        }
    }
}

impl From<Option<Coordinates>> for LocationFix {
    fn from(coords: Option<Coordinates>) -> Self {
        coords.map_or(LocationFix::Unavailable, LocationFix::Available)
    }
}

/// Source of device coordinates.
pub trait LocationProvider: Send + Sync {
    /// One-shot read.
    fn current(&self) -> LocationFix;

    /// Continuous updates, if the provider supports them.
    fn watch(&self) -> Option<watch::Receiver<LocationFix>> {
        None
    }
}

/// Fixed answer from configuration: coordinates, a refusal, or nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticLocation {
    fix: LocationFix,
}

impl StaticLocation {
    pub fn new(coords: Option<Coordinates>) -> Self {
        Self { fix: coords.into() }
    }

    /// A provider whose permission request was refused.
    pub fn denied() -> Self {
        Self {
            fix: LocationFix::Denied,
        }
    }
}

impl LocationProvider for StaticLocation {
    fn current(&self) -> LocationFix {
        self.fix
    }
}

/// Provider fed by a [`watch`] channel, for positions pushed from elsewhere.
#[derive(Debug)]
pub struct ChannelLocation {
    rx: watch::Receiver<LocationFix>,
}

impl ChannelLocation {
    pub fn new(rx: watch::Receiver<LocationFix>) -> Self {
        Self { rx }
    }
}

impl LocationProvider for ChannelLocation {
    fn current(&self) -> LocationFix {
        *self.rx.borrow()
    }

    fn watch(&self) -> Option<watch::Receiver<LocationFix>> {
        Some(self.rx.clone())
    }
}

/// Decide whether a location update should trigger a fetch.
///
/// Fetch when nothing has been fetched yet, when the position moved by more
/// than [`MOVE_THRESHOLD_DEG`], or when the last fetch is older than
/// [`STALE_AFTER`].
pub fn should_refetch(
    coords: &Coordinates,
    last_fetched: Option<&Coordinates>,
    since_last_fetch: Option<Duration>,
) -> bool {
    let moved = last_fetched.map_or(true, |last| coords.moved_from(last));
    let stale = since_last_fetch.map_or(true, |age| age > STALE_AFTER);
    moved || stale
}
