//! # Orchestration Shell
//!
//! Drives the pure engine on a timer and keeps the installed schedule fresh.
//! All mutable state lives here: last known coordinates, last fetch time and
//! location, the in-flight request and the installed schedule.
//!
//! ## Guarantees
//! - **Cadence**: [`cycle::resolve`] runs once per `display.tick_secs` with a fresh `now`
//! - **Atomic install**: schedules are swapped as a whole `Arc<PrayerSchedule>`
//!   and published on a [`watch`] channel; nobody sees a half-built schedule
//! - **At most one live fetch**: starting a fetch aborts the previous task, and
//!   every result carries a generation number so a superseded fetch that slips
//!   through is discarded instead of overwriting newer data
//! - **Degradation**: a failed fetch keeps the installed schedule and marks the
//!   data source as [`DataSource::Fallback`]

use crate::config::Config;
use crate::cycle::{self, CycleResult};
use crate::location::{should_refetch, Coordinates, LocationFix, LocationProvider};
use crate::prayer_api::{ApiError, ApiTimings, PrayerApi, TimingsSource};
use crate::schedule::PrayerSchedule;
use crate::wave::Ellipse;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Where the installed schedule came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Fallback,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Live => f.write_str("Live"),
            DataSource::Fallback => f.write_str("Fallback"),
        }
    }
}

/// One resolved frame plus the status line the display shows with it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub now: NaiveDateTime,
    pub cycle: CycleResult,
    pub location_label: String,
    pub data_source: DataSource,
    pub last_sync_at: Option<NaiveDateTime>,
}

/// Anything that can show a frame.
pub trait FrameSink {
    fn show(&mut self, frame: &Frame);
}

/// Result of a finished fetch task.
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub coords: Coordinates,
    pub result: Result<ApiTimings, ApiError>,
}

/// What applying a fetch outcome did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchApplied {
    /// A newer fetch was started since; outcome ignored
    Superseded,
    /// New times installed
    Installed,
    /// Fetch succeeded with the times already installed
    Unchanged,
    /// Fetch failed; previous schedule kept
    Failed,
}

/// Shell state, free of any I/O so every transition can be tested directly.
#[derive(Debug)]
pub struct ShellState {
    schedule: Arc<PrayerSchedule>,
    location_label: String,
    data_source: DataSource,
    last_sync_at: Option<NaiveDateTime>,
    last_coords: Option<Coordinates>,
    last_fetched: Option<Coordinates>,
    last_fetch_at: Option<Instant>,
    generation: u64,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            schedule: Arc::new(PrayerSchedule::default()),
            location_label: "Locating…".to_string(),
            data_source: DataSource::Fallback,
            last_sync_at: None,
            last_coords: None,
            last_fetched: None,
            last_fetch_at: None,
            generation: 0,
        }
    }
}

impl ShellState {
    pub fn schedule(&self) -> &Arc<PrayerSchedule> {
        &self.schedule
    }

    pub fn location_label(&self) -> &str {
        &self.location_label
    }

    pub fn data_source(&self) -> DataSource {
        self.data_source
    }

    pub fn last_coords(&self) -> Option<Coordinates> {
        self.last_coords
    }

    /// Resolve a frame at `now` against the installed schedule.
    pub fn frame(&self, now: NaiveDateTime, ellipse: &Ellipse) -> Frame {
        Frame {
            now,
            cycle: cycle::resolve(now, &self.schedule, ellipse),
            location_label: self.location_label.clone(),
            data_source: self.data_source,
            last_sync_at: self.last_sync_at,
        }
    }

    /// Record a location fix. Returns true when it warrants a fetch.
    pub fn on_location(&mut self, coords: Coordinates, at: Instant) -> bool {
        self.last_coords = Some(coords);
        self.location_label = coords.label();
        let age = self.last_fetch_at.map(|t| at.saturating_duration_since(t));
        should_refetch(&coords, self.last_fetched.as_ref(), age)
    }

    /// The provider refused access to the device position.
    pub fn on_location_denied(&mut self) {
        self.location_label = "Location permission needed".to_string();
        self.data_source = DataSource::Fallback;
    }

    /// There is no position source at all.
    pub fn on_location_unavailable(&mut self) {
        self.location_label = "Location unavailable".to_string();
        self.data_source = DataSource::Fallback;
    }

    /// Install fallback coordinates after the location wait expired.
    pub fn on_location_timeout(&mut self, fallback: Coordinates) {
        self.last_coords = Some(fallback);
        self.location_label = format!("Fallback {}", fallback.label());
    }

    /// Start a new fetch generation; older generations become stale.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Apply a finished fetch.
    pub fn apply_fetch(
        &mut self,
        outcome: FetchOutcome,
        now: NaiveDateTime,
        at: Instant,
    ) -> FetchApplied {
        if outcome.generation != self.generation {
            log::debug!(
                "Discarding superseded fetch {} (current {})",
                outcome.generation,
                self.generation
            );
            return FetchApplied::Superseded;
        }

        match outcome.result {
            Ok(timings) => {
                let schedule = PrayerSchedule::from_external(&timings.timings);
                self.last_fetched = Some(outcome.coords);
                self.last_fetch_at = Some(at);
                self.last_sync_at = Some(now);
                self.data_source = DataSource::Live;
                if let Some(tz) = timings.timezone {
                    self.location_label = tz;
                }

                if self.schedule.same_times(&schedule) {
                    FetchApplied::Unchanged
                } else {
                    log::info!(
                        "Installed prayer times: {}",
                        schedule
                            .iter()
                            .map(|m| format!("{} {}", m.prayer(), m.time()))
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    self.schedule = Arc::new(schedule);
                    FetchApplied::Installed
                }
            }
            Err(e) => {
                log::warn!("Prayer time fetch failed: {}", e);
                self.data_source = DataSource::Fallback;
                FetchApplied::Failed
            }
        }
    }
}

/// The running application: timers, location updates and fetch tasks around a [`ShellState`].
pub struct Shell<S: FrameSink, A: TimingsSource = PrayerApi> {
    state: ShellState,
    api: Option<Arc<A>>,
    config: Config,
    sink: S,
    schedule_tx: watch::Sender<Arc<PrayerSchedule>>,
    results_tx: mpsc::UnboundedSender<FetchOutcome>,
    results_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    in_flight: Option<JoinHandle<()>>,
}

impl<S: FrameSink, A: TimingsSource> Shell<S, A> {
    /// `api == None` runs offline on the default schedule.
    pub fn new(config: Config, api: Option<A>, sink: S) -> Self {
        let state = ShellState::default();
        let (schedule_tx, _) = watch::channel(state.schedule.clone());
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            state,
            api: api.map(Arc::new),
            config,
            sink,
            schedule_tx,
            results_tx,
            results_rx,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Subscribe to schedule replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PrayerSchedule>> {
        self.schedule_tx.subscribe()
    }

    /// Resolve and show a frame for the current wall-clock time.
    pub fn render_now(&mut self) {
        let frame = self.state.frame(Local::now().naive_local(), &self.config.display.arc);
        self.sink.show(&frame);
    }

    /// Start fetching for `coords`, cancelling any fetch still in flight.
    pub fn start_fetch(&mut self, coords: Coordinates) {
        let Some(api) = self.api.clone() else {
            return;
        };

        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let generation = self.state.begin_fetch();
        let tx = self.results_tx.clone();
        log::debug!("Starting fetch {} for {}", generation, coords.label());
        self.in_flight = Some(tokio::spawn(async move {
            let result = api.fetch_timings(coords).await;
            // receiver only goes away on shutdown
            let _ = tx.send(FetchOutcome {
                generation,
                coords,
                result,
            });
        }));
    }

    fn handle_location(&mut self, coords: Coordinates) {
        if self.state.on_location(coords, Instant::now()) {
            self.start_fetch(coords);
        }
        self.render_now();
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome) {
        let now = Local::now().naive_local();
        if self.state.apply_fetch(outcome, now, Instant::now()) == FetchApplied::Installed {
            self.schedule_tx.send_replace(self.state.schedule.clone());
        }
        if self.in_flight.as_ref().is_some_and(|h| h.is_finished()) {
            self.in_flight = None;
        }
        self.render_now();
    }

    /// Run until Ctrl-C.
    pub async fn run(self, provider: Arc<dyn LocationProvider>) {
        self.run_until(provider, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Cannot listen for Ctrl-C: {}", e);
            }
        })
        .await;
    }

    /// Run until `shutdown` completes, then hand the shell back.
    pub async fn run_until<F>(mut self, provider: Arc<dyn LocationProvider>, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        let display = &self.config.display;
        let mut tick = tokio::time::interval(Duration::from_secs(display.tick_secs.max(1)));
        let refresh_every = Duration::from_secs(self.config.api.refresh_minutes.max(1) * 60);
        let mut refresh = tokio::time::interval_at(
            tokio::time::Instant::now() + refresh_every,
            refresh_every,
        );

        let fallback_wait = Duration::from_secs(self.config.location.fallback_after_secs);
        let fallback_timer = tokio::time::sleep(fallback_wait);
        tokio::pin!(fallback_timer);
        let mut fallback_armed = true;

        tokio::pin!(shutdown);

        let mut location_rx = provider.watch();
        match provider.current() {
            LocationFix::Available(coords) => {
                fallback_armed = false;
                self.handle_location(coords);
            }
            LocationFix::Denied => self.state.on_location_denied(),
            LocationFix::Unavailable if location_rx.is_none() => {
                self.state.on_location_unavailable()
            }
            LocationFix::Unavailable => {}
        }

        loop {
            tokio::select! {
                _ = tick.tick() => self.render_now(),
                _ = refresh.tick() => {
                    if let Some(coords) = self.state.last_coords() {
                        self.start_fetch(coords);
                    }
                }
                _ = &mut fallback_timer, if fallback_armed => {
                    fallback_armed = false;
                    if self.state.last_coords().is_none() {
                        let fallback = self.config.location.fallback;
                        log::info!("No location after {:?}, using fallback {}", fallback_wait, fallback.label());
                        self.state.on_location_timeout(fallback);
                        self.start_fetch(fallback);
                        self.render_now();
                    }
                }
                update = next_location(&mut location_rx) => match update {
                    LocationFix::Available(coords) => {
                        fallback_armed = false;
                        self.handle_location(coords);
                    }
                    LocationFix::Denied => {
                        self.state.on_location_denied();
                        self.render_now();
                    }
                    LocationFix::Unavailable => {}
                },
                Some(outcome) = self.results_rx.recv() => self.handle_outcome(outcome),
                _ = &mut shutdown => {
                    log::info!("Shutting down");
                    break;
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self
    }
}

/// Wait for the next location update. Pends forever without a stream.
async fn next_location(rx: &mut Option<watch::Receiver<LocationFix>>) -> LocationFix {
    let Some(receiver) = rx.as_mut() else {
        return std::future::pending().await;
    };

    if receiver.changed().await.is_err() {
        // provider went away; stop polling it
        *rx = None;
        return LocationFix::Unavailable;
    }
    let update = *receiver.borrow_and_update();
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{ChannelLocation, StaticLocation, FALLBACK_COORDS};
    use crate::Prayer;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap()
    }

    fn timings(isha: &str) -> ApiTimings {
        ApiTimings {
            timings: json!({
                "Fajr": "04:58", "Dhuhr": "12:34", "Asr": "16:49",
                "Maghrib": "18:52", "Isha": isha,
            }),
            timezone: Some("Asia/Karachi".to_string()),
        }
    }

    fn ok(generation: u64, isha: &str) -> FetchOutcome {
        FetchOutcome {
            generation,
            coords: FALLBACK_COORDS,
            result: Ok(timings(isha)),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = ShellState::default();
        assert!(state.schedule().is_default());
        assert_eq!(state.data_source(), DataSource::Fallback);
        assert_eq!(state.location_label(), "Locating…");
    }

    #[test]
    fn test_successful_fetch_installs_schedule() {
        let mut state = ShellState::default();
        let generation = state.begin_fetch();

        let applied = state.apply_fetch(ok(generation, "20:10"), now(), Instant::now());
        assert_eq!(applied, FetchApplied::Installed);
        assert_eq!(state.data_source(), DataSource::Live);
        assert_eq!(state.location_label(), "Asia/Karachi");
        assert_eq!(state.schedule().get(Prayer::Isha).time(), "20:10");

        let frame = state.frame(now(), &Ellipse::new(185.0, 170.0, 185.0, 50.0));
        assert_eq!(frame.cycle.current.prayer, Prayer::Dhuhr);
        assert_eq!(frame.last_sync_at, Some(now()));
    }

    #[test]
    fn test_identical_refetch_keeps_schedule_arc() {
        let mut state = ShellState::default();
        let g1 = state.begin_fetch();
        state.apply_fetch(ok(g1, "20:10"), now(), Instant::now());
        let installed = state.schedule().clone();

        let g2 = state.begin_fetch();
        let applied = state.apply_fetch(ok(g2, "20:10"), now(), Instant::now());
        assert_eq!(applied, FetchApplied::Unchanged);
        assert!(Arc::ptr_eq(&installed, state.schedule()));
    }

    #[test]
    fn test_superseded_fetch_is_discarded() {
        let mut state = ShellState::default();
        let stale = state.begin_fetch();
        let fresh = state.begin_fetch();

        assert_eq!(
            state.apply_fetch(ok(fresh, "20:10"), now(), Instant::now()),
            FetchApplied::Installed
        );
        // the older request finishing late must not overwrite newer data
        assert_eq!(
            state.apply_fetch(ok(stale, "21:00"), now(), Instant::now()),
            FetchApplied::Superseded
        );
        assert_eq!(state.schedule().get(Prayer::Isha).time(), "20:10");
    }

    #[test]
    fn test_failed_fetch_keeps_schedule() {
        let mut state = ShellState::default();
        let g1 = state.begin_fetch();
        state.apply_fetch(ok(g1, "20:10"), now(), Instant::now());

        let g2 = state.begin_fetch();
        let failed = FetchOutcome {
            generation: g2,
            coords: FALLBACK_COORDS,
            result: Err(ApiError::InvalidResponse("code is not 200")),
        };
        assert_eq!(
            state.apply_fetch(failed, now(), Instant::now()),
            FetchApplied::Failed
        );
        assert_eq!(state.data_source(), DataSource::Fallback);
        assert_eq!(state.schedule().get(Prayer::Isha).time(), "20:10");
    }

    #[test]
    fn test_location_updates_and_timeout() {
        let mut state = ShellState::default();
        let start = Instant::now();
        let here = Coordinates::new(51.5, -0.12).unwrap();

        assert!(state.on_location(here, start));
        assert_eq!(state.location_label(), "51.50°N · 0.12°W");

        let g = state.begin_fetch();
        let outcome = FetchOutcome {
            generation: g,
            coords: here,
            result: Ok(ApiTimings {
                timings: json!({}),
                timezone: None,
            }),
        };
        state.apply_fetch(outcome, now(), start);
        assert_eq!(state.location_label(), "51.50°N · 0.12°W");

        // same spot, fresh data: nothing to do
        assert!(!state.on_location(here, start + Duration::from_secs(30)));

        let mut waiting = ShellState::default();
        waiting.on_location_timeout(FALLBACK_COORDS);
        assert_eq!(waiting.last_coords(), Some(FALLBACK_COORDS));
        assert_eq!(waiting.location_label(), "Fallback 24.87°N · 67.01°E");
    }

    #[test]
    fn test_denied_and_unavailable_labels() {
        let mut state = ShellState::default();
        let g = state.begin_fetch();
        state.apply_fetch(ok(g, "20:10"), now(), Instant::now());
        assert_eq!(state.data_source(), DataSource::Live);

        state.on_location_denied();
        assert_eq!(state.location_label(), "Location permission needed");
        assert_eq!(state.data_source(), DataSource::Fallback);
        // the installed times stay
        assert_eq!(state.schedule().get(Prayer::Isha).time(), "20:10");

        let mut bare = ShellState::default();
        bare.on_location_unavailable();
        assert_eq!(bare.location_label(), "Location unavailable");
        assert_eq!(bare.last_coords(), None);
    }

    struct Recorder(Vec<Frame>);

    impl FrameSink for Recorder {
        fn show(&mut self, frame: &Frame) {
            self.0.push(frame.clone());
        }
    }

    struct DropCount(Arc<AtomicUsize>);

    impl Drop for DropCount {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Accepts every request and never answers.
    #[derive(Default)]
    struct Silent {
        requested: Arc<Mutex<Vec<Coordinates>>>,
        dropped: Arc<AtomicUsize>,
    }

    impl TimingsSource for Silent {
        fn fetch_timings(
            &self,
            coords: Coordinates,
        ) -> impl Future<Output = Result<ApiTimings, ApiError>> + Send {
            self.requested.lock().unwrap().push(coords);
            let guard = DropCount(self.dropped.clone());
            async move {
                let _guard = guard;
                std::future::pending().await
            }
        }
    }

    fn here() -> Coordinates {
        Coordinates::new(51.5, -0.12).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_fetch_cancels_the_one_in_flight() {
        let source = Silent::default();
        let requested = source.requested.clone();
        let dropped = source.dropped.clone();
        let mut shell = Shell::new(Config::default(), Some(source), Recorder(Vec::new()));

        shell.start_fetch(FALLBACK_COORDS);
        tokio::task::yield_now().await;
        assert_eq!(*requested.lock().unwrap(), vec![FALLBACK_COORDS]);
        assert_eq!(dropped.load(Ordering::SeqCst), 0);

        shell.start_fetch(here());
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(*requested.lock().unwrap(), vec![FALLBACK_COORDS, here()]);
        assert_eq!(
            dropped.load(Ordering::SeqCst),
            1,
            "the first request should have been cancelled"
        );
        assert!(shell.in_flight.as_ref().is_some_and(|h| !h.is_finished()));
        assert_eq!(shell.state().generation, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_falls_back_when_no_location_arrives() {
        let config = Config::default();
        let wait = Duration::from_secs(config.location.fallback_after_secs);
        let source = Silent::default();
        let requested = source.requested.clone();
        let dropped = source.dropped.clone();
        let shell = Shell::new(config, Some(source), Recorder(Vec::new()));

        let shutdown = tokio::time::sleep(wait + Duration::from_secs(1));
        let shell = shell
            .run_until(Arc::new(StaticLocation::default()), shutdown)
            .await;

        assert_eq!(shell.state().location_label(), "Fallback 24.87°N · 67.01°E");
        assert_eq!(shell.state().last_coords(), Some(FALLBACK_COORDS));
        assert_eq!(*requested.lock().unwrap(), vec![FALLBACK_COORDS]);

        let frames = &shell.sink().0;
        assert_eq!(frames[0].location_label, "Location unavailable");
        assert_eq!(
            frames.last().unwrap().location_label,
            "Fallback 24.87°N · 67.01°E"
        );

        // shutdown cancels the request still waiting for an answer
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_follows_pushed_locations() {
        let (tx, rx) = watch::channel(LocationFix::Unavailable);
        let source = Silent::default();
        let requested = source.requested.clone();
        let shell = Shell::new(Config::default(), Some(source), Recorder(Vec::new()));

        let shutdown = async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send_replace(LocationFix::Available(here()));
            // well past the fallback wait
            tokio::time::sleep(Duration::from_secs(30)).await;
        };
        let shell = shell
            .run_until(Arc::new(ChannelLocation::new(rx)), shutdown)
            .await;

        assert_eq!(shell.state().last_coords(), Some(here()));
        assert_eq!(shell.state().location_label(), "51.50°N · 0.12°W");
        assert_eq!(*requested.lock().unwrap(), vec![here()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_denied_location() {
        let shell = Shell::new(Config::default(), Some(Silent::default()), Recorder(Vec::new()));

        let shutdown = tokio::time::sleep(Duration::from_secs(1));
        let shell = shell
            .run_until(Arc::new(StaticLocation::denied()), shutdown)
            .await;

        assert_eq!(shell.state().location_label(), "Location permission needed");
        assert_eq!(shell.state().data_source(), DataSource::Fallback);
        assert_eq!(shell.state().last_coords(), None);
        assert_eq!(shell.sink().0[0].location_label, "Location permission needed");
    }

    #[tokio::test]
    async fn test_offline_shell_renders_default_schedule() {
        let mut shell = Shell::new(Config::default(), None::<PrayerApi>, Recorder(Vec::new()));
        let rx = shell.subscribe();

        shell.render_now();
        // offline: no fetch is started
        shell.start_fetch(FALLBACK_COORDS);

        assert_eq!(shell.sink().0.len(), 1);
        assert_eq!(shell.sink().0[0].data_source, DataSource::Fallback);
        assert!(rx.borrow().is_default());
        assert!(shell.in_flight.is_none());
    }
}
