//! # End-to-End Cycle Test Suite
//!
//! Runs API-shaped payloads through normalization, schedule construction and
//! cycle resolution the way the running app does, and checks the behaviour a
//! viewer of the display depends on: which prayer is shown, what comes next,
//! how long until then, and where the sun sits.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use prayer_arc_lib::{
    cycle::{resolve, CycleRef},
    format::format_countdown,
    normalize::normalize,
    schedule::PrayerSchedule,
    wave::{position_at, Ellipse},
    Prayer,
};
use serde_json::json;

fn arc() -> Ellipse {
    Ellipse::new(185.0, 170.0, 185.0, 50.0)
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Schedule as the API would deliver it, with decorations the normalizer strips.
fn live_schedule() -> PrayerSchedule {
    PrayerSchedule::from_external(&json!({
        "Fajr": "03:49 (BST)",
        "Sunrise": "04:43 (BST)",
        "Dhuhr": "13:02 (BST)",
        "Asr": "17:26 (BST)",
        "Maghrib": "21:21 (BST)",
        "Isha": "22:15 (BST)",
    }))
}

/// Normalization examples a user could hit with a misbehaving upstream.
#[test]
fn normalization_examples() {
    assert_eq!(normalize("25:99").as_deref(), Some("23:59"));
    assert_eq!(normalize("bad"), None);
    assert_eq!(normalize(" 5:3 "), None);
    assert_eq!(normalize("05:03").as_deref(), Some("05:03"));
}

/// A payload missing one field keeps the others and defaults only that slot.
#[test]
fn missing_field_defaults_single_slot() {
    let schedule = PrayerSchedule::from_external(&json!({
        "Fajr": "03:49", "Dhuhr": "13:02", "Asr": "17:26", "Isha": "22:15",
    }));

    assert_eq!(schedule.get(Prayer::Maghrib).time(), "18:09");
    assert_eq!(schedule.get(Prayer::Fajr).time(), "03:49");
    assert_eq!(schedule.get(Prayer::Isha).time(), "22:15");
}

/// Every minute of a full cycle resolves to a consistent current/next pair.
///
/// Walks from one Fajr to the next in one-minute steps and checks that the
/// current prayer never lies in the future, the next never in the past, and
/// the countdown always matches the gap to the next prayer.
#[test]
fn every_minute_of_a_cycle_is_consistent() {
    let schedule = live_schedule();
    let start = at(10, 3, 49);

    for minute in 0..(24 * 60) {
        let now = start + Duration::minutes(minute);
        let result = resolve(now, &schedule, &arc());

        assert!(
            result.current.date <= now,
            "current {} at {} is in the future at {}",
            result.current.prayer,
            result.current.date,
            now
        );
        assert!(
            result.next.date > now,
            "next {} at {} is not in the future at {}",
            result.next.prayer,
            result.next.date,
            now
        );
        assert_eq!(result.next.prayer, result.current.prayer.next());
        assert_eq!(
            result.countdown_ms,
            (result.next.date - now).num_milliseconds()
        );
        assert!(result.countdown_ms >= 0);
        assert!((0.0..=1.0).contains(&result.progress));
        assert!(
            result.segment_start <= result.segment_end,
            "segment runs backwards at {}",
            now
        );
    }
}

/// Pre-dawn hours belong to the previous evening's Isha.
#[test]
fn pre_dawn_is_previous_isha() {
    let result = resolve(at(10, 2, 0), &PrayerSchedule::default(), &arc());

    assert_eq!(result.current.prayer, Prayer::Isha);
    assert_eq!(result.current.date, at(9, 19, 31));
    assert_eq!(result.next.prayer, Prayer::Fajr);
    assert_eq!(result.next.date, at(10, 5, 28));
    assert_eq!(result.countdown_ms, (at(10, 5, 28) - at(10, 2, 0)).num_milliseconds());
    assert_eq!(format_countdown(result.countdown_ms), "3h 28m");
}

/// After Isha the next Fajr is tomorrow's and the segment runs to the window edge.
#[test]
fn after_isha_wraps_to_tomorrow() {
    let schedule = live_schedule();
    let result = resolve(at(10, 22, 16), &schedule, &arc());

    assert_eq!(result.current.prayer, Prayer::Isha);
    assert_eq!(result.next.prayer, Prayer::Fajr);
    assert_eq!(result.next.cycle, CycleRef::Following);
    assert_eq!(result.next.date, at(11, 3, 49));
    assert_eq!(result.segment_end, 1.0);
}

/// Progress rises through the cycle and only drops when the next cycle starts.
#[test]
fn progress_only_resets_at_fajr() {
    let schedule = PrayerSchedule::default();
    let start = at(10, 5, 28);
    let mut previous = resolve(start, &schedule, &arc()).progress;

    for minute in 1..=(24 * 60) {
        let now = start + Duration::minutes(minute);
        let progress = resolve(now, &schedule, &arc()).progress;

        if now == at(11, 5, 28) {
            assert!(
                progress < previous,
                "progress should wrap at the next Fajr"
            );
        } else {
            assert!(
                progress >= previous,
                "progress fell from {} to {} at {}",
                previous,
                progress,
                now
            );
        }
        previous = progress;
    }
}

/// The sun sits at the trough before dawn padding and after dusk padding.
#[test]
fn sun_rests_in_the_trough_outside_the_window() {
    let e = arc();
    let night = resolve(at(10, 23, 30), &PrayerSchedule::default(), &e);
    assert_eq!(night.progress, 1.0);
    assert_eq!(night.sun_pos, position_at(1.0, &e));
    assert!((night.sun_pos.y - (e.cy + e.ry)).abs() < 1e-9);
}

/// Refetching identical times compares equal; a one-minute shift does not.
#[test]
fn refetch_change_detection() {
    let first = live_schedule();
    let second = live_schedule();
    assert_eq!(first, second);

    let shifted = PrayerSchedule::from_external(&json!({
        "Fajr": "03:49", "Dhuhr": "13:02", "Asr": "17:26",
        "Maghrib": "21:22", "Isha": "22:15",
    }));
    assert_ne!(first, shifted);
}
