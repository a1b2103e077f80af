//! # Cycle Resolution
//!
//! Given "now" and a schedule, works out where in the prayer cycle we are.
//!
//! ## The Cycle
//! A cycle is anchored at the most recent Fajr at or before `now`. In the
//! pre-dawn hours that is *yesterday's* Fajr, so 02:00 still belongs to the
//! previous evening's Isha period. All five markers are projected onto the
//! anchor's calendar date; Fajr is always the earliest, so they are same-day by
//! construction.
//!
//! ## The Visual Window
//! Progress is normalized over the cycle padded by [`PADDING_MINUTES`] before
//! Fajr and after Isha. The padding only affects progress fractions, never
//! which prayer is current.
//!
//! ```text
//!  Fajr-90m   Fajr    Dhuhr    Asr   Maghrib   Isha   Isha+90m
//!     |--------|--------|-------|-------|--------|--------|
//!     0                     progress                      1
//! ```
//!
//! All arithmetic is on naive local date-times; the caller supplies `now` in
//! whatever wall clock the schedule is expressed in.

use crate::schedule::PrayerSchedule;
use crate::wave::{self, Ellipse, Point};
use crate::Prayer;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Padding applied before the first and after the last marker of the visual window.
pub const PADDING_MINUTES: i64 = 90;

/// Which cycle an instant belongs to, relative to the one anchored at or before `now`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CycleRef {
    Previous,
    Current,
    /// Wraparound: the event belongs to the next cycle
    Following,
}

/// A prayer pinned to an absolute instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedPrayer {
    pub prayer: Prayer,
    /// Canonical `HH:MM`
    pub time: String,
    pub date: NaiveDateTime,
    pub cycle: CycleRef,
}

/// A schedule marker projected into the current cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CyclePoint {
    pub prayer: Prayer,
    pub time: String,
    pub date: NaiveDateTime,
    /// Position within the visual window, clamped to `[0, 1]`
    pub progress: f64,
    pub pos: Point,
}

/// Everything the display needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleResult {
    pub current: ResolvedPrayer,
    pub next: ResolvedPrayer,
    /// Milliseconds until `next`
    pub countdown_ms: i64,
    /// Progress of `now` through the visual window
    pub progress: f64,
    pub sun_pos: Point,
    pub points: [CyclePoint; 5],
    pub segment_start: f64,
    pub segment_end: f64,
}

impl CycleResult {
    pub fn point(&self, prayer: Prayer) -> &CyclePoint {
        &self.points[prayer.index()]
    }

    /// Polyline of the highlighted segment between the current and next prayer.
    pub fn active_path(&self, ellipse: &Ellipse) -> Vec<Point> {
        wave::path_between(
            self.segment_start,
            self.segment_end,
            ellipse,
            wave::DEFAULT_PATH_STEPS,
        )
    }

    /// Polyline of the full wave.
    pub fn base_path(ellipse: &Ellipse) -> Vec<Point> {
        wave::path_between(0.0, 1.0, ellipse, wave::DEFAULT_PATH_STEPS)
    }

    /// True when the next prayer belongs to the following cycle.
    pub fn wraps(&self) -> bool {
        self.next.cycle == CycleRef::Following
    }
}

/// Resolve the cycle state at `now`.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use prayer_arc_lib::{cycle::resolve, schedule::PrayerSchedule, wave::Ellipse, Prayer};
///
/// let now = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(13, 0, 0).unwrap();
/// let result = resolve(now, &PrayerSchedule::default(), &Ellipse::new(185.0, 170.0, 185.0, 50.0));
/// assert_eq!(result.current.prayer, Prayer::Dhuhr);
/// assert_eq!(result.next.prayer, Prayer::Asr);
/// ```
pub fn resolve(now: NaiveDateTime, schedule: &PrayerSchedule, ellipse: &Ellipse) -> CycleResult {
    // 1. Anchor: most recent Fajr at or before now
    let cycle_date = cycle_date(now, schedule);

    // 2. Project every marker onto the anchor date
    let dates: [NaiveDateTime; 5] =
        Prayer::ALL.map(|p| cycle_date.and_time(schedule.get(p).parsed().to_naive_time()));

    // 3. Visual window
    let padding = Duration::minutes(PADDING_MINUTES);
    let visual_start = dates[Prayer::Fajr.index()] - padding;
    let visual_end = dates[Prayer::Isha.index()] + padding;
    let visual_ms = (visual_end - visual_start).num_milliseconds() as f64;
    let progress_of = |at: NaiveDateTime| {
        // Schedules with Isha well before Fajr collapse the window
        if visual_ms <= 0.0 {
            return 0.0;
        }
        let elapsed = (at - visual_start).num_milliseconds() as f64;
        (elapsed / visual_ms).clamp(0.0, 1.0)
    };
    let progress = progress_of(now);

    // 4. Current and next
    let at = |prayer: Prayer, date: NaiveDateTime, cycle: CycleRef| ResolvedPrayer {
        prayer,
        time: schedule.get(prayer).time().to_string(),
        date,
        cycle,
    };

    let (current, next) = match Prayer::ALL.into_iter().rev().find(|p| dates[p.index()] <= now) {
        None => (
            at(
                Prayer::Isha,
                dates[Prayer::Isha.index()] - Duration::days(1),
                CycleRef::Previous,
            ),
            at(Prayer::Fajr, dates[Prayer::Fajr.index()], CycleRef::Current),
        ),
        Some(prayer) if prayer.is_last() => (
            at(prayer, dates[prayer.index()], CycleRef::Current),
            at(
                Prayer::Fajr,
                dates[Prayer::Fajr.index()] + Duration::days(1),
                CycleRef::Following,
            ),
        ),
        Some(prayer) => (
            at(prayer, dates[prayer.index()], CycleRef::Current),
            at(prayer.next(), dates[prayer.next().index()], CycleRef::Current),
        ),
    };

    let countdown_ms = (next.date - now).num_milliseconds();

    // 5. Per-marker progress and position
    let points = Prayer::ALL.map(|prayer| {
        let date = dates[prayer.index()];
        let progress = progress_of(date);
        CyclePoint {
            prayer,
            time: schedule.get(prayer).time().to_string(),
            date,
            progress,
            pos: wave::position_at(progress, ellipse),
        }
    });

    // 6. Active segment
    let segment_start = points
        .iter()
        .find(|p| p.prayer == current.prayer)
        .map_or(0.0, |p| p.progress);
    let segment_end = match next.cycle {
        CycleRef::Following => 1.0,
        _ => points
            .iter()
            .find(|p| p.prayer == next.prayer)
            .map_or(1.0, |p| p.progress),
    };

    // 7. Sun follows global progress
    let sun_pos = wave::position_at(progress, ellipse);

    CycleResult {
        current,
        next,
        countdown_ms,
        progress,
        sun_pos,
        points,
        segment_start,
        segment_end,
    }
}

/// Calendar date of the cycle containing `now`.
fn cycle_date(now: NaiveDateTime, schedule: &PrayerSchedule) -> NaiveDate {
    let today = now.date();
    let today_fajr = today.and_time(schedule.first().parsed().to_naive_time());
    if now >= today_fajr {
        today
    } else {
        today.pred_opt().unwrap_or(today)
    }
}
