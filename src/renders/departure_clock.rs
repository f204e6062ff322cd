use crate::{
    config::ClockConfig,
    departures,
    metro::DepartureSource,
    render::Render,
    ring,
};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, TimeZone, Timelike, Utc};
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::{DrawTarget, Point},
    Pixel,
};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::{select, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Source of the current wall-clock time
pub type Clock = fn() -> DateTime<FixedOffset>;

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The last refresh succeeded
    Fresh,

    /// The last refresh failed, or there has not been one yet
    Stale,
}

#[derive(Debug, Clone)]
pub struct ClockSettings {
    pub num_leds: usize,
    pub offset: i32,
    pub horizon: Duration,
    pub refresh_interval: Duration,
    pub highlight: Rgb888,
    pub stale: Rgb888,
}

impl From<&ClockConfig> for ClockSettings {
    fn from(config: &ClockConfig) -> Self {
        Self {
            num_leds: config.ring.num_leds,
            offset: config.ring.offset,
            horizon: Duration::from_secs(config.horizon_secs),
            refresh_interval: config.refresh_interval(),
            highlight: config.ring.highlight.into(),
            stale: config.ring.stale.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    /// LEDs showing an upcoming departure
    pub positions: Vec<usize>,

    pub freshness: Freshness,

    /// When the departure feed last answered
    pub last_success: Option<DateTime<Utc>>,
}

impl Default for ClockState {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            freshness: Freshness::Stale,
            last_success: None,
        }
    }
}

impl ClockState {
    /// Fold the outcome of a feed refresh into the state.
    ///
    /// On failure the previous positions are kept and only marked stale.
    pub fn apply<Tz: TimeZone>(
        &mut self,
        result: Result<Vec<DateTime<Utc>>>,
        now: &DateTime<Tz>,
        settings: &ClockSettings,
    ) {
        match result {
            Ok(departure_times) => {
                let now_utc = now.with_timezone(&Utc);
                let waits = departures::upcoming(&departure_times, now_utc, settings.horizon);
                let second_of_hour = now.minute() * 60 + now.second();

                for wait in &waits {
                    debug!(
                        "Next train in {} mins, leaves at {} mins past the hour",
                        wait / 60,
                        ring::arrival_minute(second_of_hour, *wait)
                    );
                }

                self.positions = ring::departure_positions(
                    &waits,
                    second_of_hour,
                    settings.num_leds,
                    settings.offset,
                );
                self.freshness = Freshness::Fresh;
                self.last_success = Some(now_utc);
            }
            Err(_) => {
                self.freshness = Freshness::Stale;
            }
        }
    }
}

/// Lights the LED of every departure within the next hour
pub struct DepartureClock {
    settings: ClockSettings,

    /// Shared state between the render and the async task
    state: Arc<Mutex<ClockState>>,

    /// Flag used to gracefully terminate the update task
    cancel_token: CancellationToken,

    /// Handle to the task used to refresh the departures
    update_task_handle: Option<JoinHandle<Result<()>>>,
}

impl DepartureClock {
    pub fn new<S: DepartureSource>(source: S, settings: ClockSettings) -> Self {
        Self::with_clock(source, settings, local_now)
    }

    pub fn with_clock<S: DepartureSource>(
        source: S,
        settings: ClockSettings,
        clock: Clock,
    ) -> Self {
        let state = Arc::new(Mutex::new(ClockState::default()));
        let cancel_token = CancellationToken::new();

        let task_cancel_token = cancel_token.clone();
        let task_state = state.clone();
        let task_settings = settings.clone();

        let update_task_handle: JoinHandle<Result<()>> = tokio::task::spawn(async move {
            loop {
                let refresh_time = tokio::time::Instant::now() + task_settings.refresh_interval;

                let result = select! {
                    result = source.departures() => result,
                    _ = task_cancel_token.cancelled() => break,
                };

                match &result {
                    Ok(departures) => info!("Fetched {} departures", departures.len()),
                    Err(e) => error!("Could not get updated departures, showing stale data: {e:#}"),
                }

                task_state.lock().apply(result, &clock(), &task_settings);

                select! {
                    _ = tokio::time::sleep_until(refresh_time) => {},
                    _ = task_cancel_token.cancelled() => break,
                }
            }

            Ok(())
        });

        Self {
            settings,
            state,
            cancel_token,
            update_task_handle: Some(update_task_handle),
        }
    }

    pub fn state(&self) -> ClockState {
        self.state.lock().clone()
    }
}

impl<D> Render<D> for DepartureClock
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    fn render(&self, canvas: &mut D) -> Result<()> {
        let state = self.state.lock();

        let color = match state.freshness {
            Freshness::Fresh => self.settings.highlight,
            Freshness::Stale => self.settings.stale,
        };

        canvas.draw_iter(
            state
                .positions
                .iter()
                .map(|position| Pixel(Point::new(*position as i32, 0), color)),
        )?;

        Ok(())
    }
}

impl Drop for DepartureClock {
    fn drop(&mut self) {
        self.cancel_token.cancel();

        if let Some(task_handle) = self.update_task_handle.take() {
            task_handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingCanvas;
    use anyhow::anyhow;
    use embedded_graphics::prelude::RgbColor;
    use std::{
        collections::VecDeque,
        future::Future,
        sync::atomic::{AtomicUsize, Ordering},
    };

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    // 12:10:30
    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-01T12:10:30+00:00").unwrap()
    }

    fn settings() -> ClockSettings {
        ClockSettings {
            num_leds: 96,
            offset: 0,
            horizon: Duration::from_secs(3600),
            refresh_interval: Duration::from_secs(60),
            highlight: Rgb888::RED,
            stale: Rgb888::YELLOW,
        }
    }

    fn feed() -> Vec<DateTime<Utc>> {
        vec![
            // Already gone
            utc("2024-03-01T12:00:00Z"),
            // 20 past
            utc("2024-03-01T12:20:30Z"),
            // 40 past
            utc("2024-03-01T12:40:00Z"),
            // More than an hour away
            utc("2024-03-01T13:30:00Z"),
        ]
    }

    #[derive(Clone)]
    struct ScriptedSource {
        responses: Arc<Mutex<VecDeque<Result<Vec<DateTime<Utc>>>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<DateTime<Utc>>>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DepartureSource for ScriptedSource {
        fn departures(&self) -> impl Future<Output = Result<Vec<DateTime<Utc>>>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no more responses")));
            async move { response }
        }
    }

    #[test]
    fn successful_refresh_maps_departures() {
        let mut state = ClockState::default();
        state.apply(Ok(feed()), &fixed_now(), &settings());

        assert_eq!(state.positions, vec![32, 64]);
        assert_eq!(state.freshness, Freshness::Fresh);
        assert_eq!(state.last_success, Some(utc("2024-03-01T12:10:30Z")));
    }

    #[test]
    fn offset_is_applied() {
        let mut state = ClockState::default();
        let settings = ClockSettings {
            offset: -40,
            ..settings()
        };
        state.apply(Ok(feed()), &fixed_now(), &settings);

        assert_eq!(state.positions, vec![24, 88]);
    }

    #[test]
    fn failed_refresh_keeps_positions() {
        let mut state = ClockState::default();
        state.apply(Ok(feed()), &fixed_now(), &settings());
        state.apply(Err(anyhow!("timeout")), &fixed_now(), &settings());

        assert_eq!(state.positions, vec![32, 64]);
        assert_eq!(state.freshness, Freshness::Stale);
        assert_eq!(state.last_success, Some(utc("2024-03-01T12:10:30Z")));
    }

    #[test]
    fn empty_feed_clears_the_ring() {
        let mut state = ClockState::default();
        state.apply(Ok(feed()), &fixed_now(), &settings());
        state.apply(Ok(Vec::new()), &fixed_now(), &settings());

        assert!(state.positions.is_empty());
        assert_eq!(state.freshness, Freshness::Fresh);
    }

    #[test]
    fn minute_is_taken_from_the_local_wall_clock() {
        let mut state = ClockState::default();
        // 12:10:30 UTC is 17:40:30 in India
        let now = fixed_now().with_timezone(&FixedOffset::east_opt(5 * 3600 + 1800).unwrap());
        state.apply(Ok(feed()), &now, &settings());

        // 50 and 10 minutes past the local hour
        assert_eq!(state.positions, vec![16, 80]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_task_falls_back_to_stale_data() {
        let source = ScriptedSource::new(vec![
            Ok(feed()),
            Err(anyhow!("connection reset")),
            Ok(vec![utc("2024-03-01T12:15:30Z")]),
        ]);
        let calls = source.calls.clone();
        let clock = DepartureClock::with_clock(source, settings(), fixed_now);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(clock.state().positions, vec![32, 64]);
        assert_eq!(clock.state().freshness, Freshness::Fresh);

        let mut canvas = RingCanvas::new(96);
        clock.render(&mut canvas).unwrap();
        assert_eq!(canvas.lit(), vec![32, 64]);
        assert_eq!(canvas.get(32), Some(Rgb888::RED));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(clock.state().positions, vec![32, 64]);
        assert_eq!(clock.state().freshness, Freshness::Stale);

        let mut canvas = RingCanvas::new(96);
        clock.render(&mut canvas).unwrap();
        assert_eq!(canvas.lit(), vec![32, 64]);
        assert_eq!(canvas.get(64), Some(Rgb888::YELLOW));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(clock.state().positions, vec![24]);
        assert_eq!(clock.state().freshness, Freshness::Fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_clock_stops_refreshing() {
        let source = ScriptedSource::new(vec![Ok(feed()), Ok(feed()), Ok(feed())]);
        let calls = source.calls.clone();
        let clock = DepartureClock::with_clock(source, settings(), fixed_now);

        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(clock);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
