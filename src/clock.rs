//! Progress clock and its circular indicator
//!
//! The clock converts elapsed playback time into a percentage and asks its
//! owner to schedule the next tick through an alarm. Ticks land on whole
//! multiples of the tick interval of played time, and the last one lands
//! exactly on the end of the clip, so progress never drifts past 100.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use crate::{AlarmMessage, constants::indicator, session_id::SessionId};

/// Playback progress as a percentage in `[0, 100]`
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(f64);

impl Progress {
    /// No progress
    pub const ZERO: Self = Self(0.);
    /// The clip has played to its end
    pub const COMPLETE: Self = Self(100.);

    /// Computes `min(100, elapsed / total * 100)`
    ///
    /// A zero `total` counts as complete.
    pub fn from_elapsed(elapsed: Duration, total: Duration) -> Self {
        if total.is_zero() {
            return Self::COMPLETE;
        }
        Self((elapsed.as_secs_f64() / total.as_secs_f64() * 100.).clamp(0., 100.))
    }

    /// Returns the percentage
    pub fn percent(self) -> f64 {
        self.0
    }

    /// Whether the clip has played to its end
    pub fn is_complete(self) -> bool {
        self.0 >= 100.
    }
}

/// Geometry of the progress ring, ready to be drawn as a stroked circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ring {
    /// Width and height of the drawing area
    pub size: u32,
    /// Ring radius
    pub radius: f64,
    /// Stroke width of the ring
    pub stroke_width: u32,
    /// Full circumference, used as the dash array
    pub circumference: f64,
    /// Dash offset hiding the part of the ring not yet played
    pub dash_offset: f64,
}

impl Ring {
    /// Computes the ring geometry for a progress value
    pub fn for_progress(progress: Progress) -> Self {
        let circumference = 2. * PI * indicator::RADIUS;
        Self {
            size: indicator::SIZE,
            radius: indicator::RADIUS,
            stroke_width: indicator::STROKE_WIDTH,
            circumference,
            dash_offset: circumference - progress.percent() / 100. * circumference,
        }
    }
}

/// Everything needed to render the clickable progress indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicator {
    /// Current progress
    pub progress: Progress,
    /// Ring geometry for `progress`
    pub ring: Ring,
    /// Whether playback is running; decides the icon in the middle
    pub playing: bool,
    /// Label of the action a click performs
    pub label: &'static str,
}

impl Indicator {
    /// Builds the indicator for a progress value and playback status
    pub fn new(progress: Progress, playing: bool) -> Self {
        Self {
            progress,
            ring: Ring::for_progress(progress),
            playing,
            label: if playing { "Pause" } else { "Play" },
        }
    }
}

/// Events produced when the clock receives one of its own ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// Progress moved forward
    Progress(Progress),
    /// Progress reached 100; the clock has stopped
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Stopped,
    Running,
    Expired,
}

/// Converts elapsed time into progress, one tick at a time
///
/// Every start or resume opens a new generation. Ticks carry the generation
/// they were scheduled under, so a tick from before a `stop()` is ignored
/// even if it had already been queued.
///
/// Callers pass the current instant into every operation. Time played
/// between two ticks is banked when the clock stops, and the first tick after
/// a resume only waits for what is left of the interrupted tick.
#[derive(Debug, Clone)]
pub struct ProgressClock {
    session: SessionId,
    tick: Duration,
    total: Duration,
    elapsed: Duration,
    started: Option<Instant>,
    generation: u64,
    status: Status,
}

impl ProgressClock {
    /// Creates a stopped clock ticking every `tick`
    pub fn new(session: SessionId, tick: Duration) -> Self {
        Self {
            session,
            tick,
            total: Duration::ZERO,
            elapsed: Duration::ZERO,
            started: None,
            generation: 0,
            status: Status::Stopped,
        }
    }

    /// Starts measuring a clip of length `total` from zero
    pub fn start<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        total: Duration,
        now: Instant,
        schedule_message: S,
    ) {
        self.total = total;
        self.elapsed = Duration::ZERO;
        self.run(now, schedule_message);
    }

    /// Halts tick emission, banking the time played since the last tick
    ///
    /// Stopping a clock that is not running does nothing.
    pub fn stop(&mut self, now: Instant) {
        if self.status == Status::Running {
            self.bank(now);
            self.started = None;
            self.status = Status::Stopped;
            self.generation += 1;
        }
    }

    /// Continues a stopped clock from its frozen elapsed time
    ///
    /// Returns `false` if the clock is running, was never started, or has
    /// already expired.
    pub fn resume<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        now: Instant,
        schedule_message: S,
    ) -> bool {
        if self.status != Status::Stopped || self.total.is_zero() {
            return false;
        }
        self.run(now, schedule_message);
        true
    }

    /// Continues a stopped clock with progress reset to zero
    pub fn restart<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        now: Instant,
        schedule_message: S,
    ) -> bool {
        if self.status != Status::Stopped || self.total.is_zero() {
            return false;
        }
        self.elapsed = Duration::ZERO;
        self.run(now, schedule_message);
        true
    }

    fn bank(&mut self, now: Instant) {
        if let Some(started) = self.started {
            self.elapsed = (self.elapsed + now.saturating_duration_since(started)).min(self.total);
        }
    }

    /// Time until the next whole tick of elapsed time, or until the end of
    /// the clip if that comes first
    fn next_delay(&self) -> Duration {
        let remaining = self.total.saturating_sub(self.elapsed);
        let tick = self.tick.as_nanos();
        if tick == 0 {
            return remaining;
        }
        let into_tick = self.elapsed.as_nanos() % tick;
        let until_tick = Duration::from_nanos(u64::try_from(tick - into_tick).unwrap_or(u64::MAX));
        until_tick.min(remaining)
    }

    fn run<S: FnMut(AlarmMessage, Duration)>(&mut self, now: Instant, mut schedule_message: S) {
        self.generation += 1;
        self.status = Status::Running;
        self.started = Some(now);
        schedule_message(
            AlarmMessage::Tick {
                session: self.session,
                generation: self.generation,
            },
            self.next_delay(),
        );
    }

    /// Handles a tick scheduled under `generation`, delivered at `now`
    ///
    /// Returns `None` for ticks of an old generation or while not running.
    /// Otherwise the time played since the previous tick is added and either
    /// the next tick is scheduled or, once progress reaches 100, the clock
    /// stops for good and reports [`ClockEvent::Expired`]. Expiry is reported
    /// once per start.
    pub fn receive_tick<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        generation: u64,
        now: Instant,
        mut schedule_message: S,
    ) -> Option<ClockEvent> {
        if self.status != Status::Running || generation != self.generation {
            return None;
        }

        self.bank(now);

        if self.elapsed >= self.total {
            self.started = None;
            self.status = Status::Expired;
            self.generation += 1;
            return Some(ClockEvent::Expired);
        }

        self.started = Some(now);
        schedule_message(
            AlarmMessage::Tick {
                session: self.session,
                generation: self.generation,
            },
            self.next_delay(),
        );

        Some(ClockEvent::Progress(self.progress()))
    }

    /// Progress as of the last tick or stop
    pub fn progress(&self) -> Progress {
        if self.status == Status::Expired {
            return Progress::COMPLETE;
        }
        Progress::from_elapsed(self.elapsed, self.total)
    }

    /// Playback time counted up to the last tick or stop, excluding paused
    /// intervals
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether ticks are currently being emitted
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Whether the clock ran to completion
    pub fn is_expired(&self) -> bool {
        self.status == Status::Expired
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn schedule_into(
        due: &mut Option<(Duration, u64)>,
        now: Duration,
    ) -> impl FnMut(AlarmMessage, Duration) + '_ {
        move |message, delay| {
            if let AlarmMessage::Tick { generation, .. } = message {
                *due = Some((now + delay, generation));
            }
        }
    }

    /// A clock on virtual time, remembering the tick it last scheduled
    struct Driver {
        clock: ProgressClock,
        base: Instant,
        now: Duration,
        due: Option<(Duration, u64)>,
    }

    impl Driver {
        fn new(tick: Duration) -> Self {
            Self {
                clock: ProgressClock::new(SessionId::new(), tick),
                base: Instant::now(),
                now: Duration::ZERO,
                due: None,
            }
        }

        fn start(&mut self, total: Duration) {
            let at = self.base + self.now;
            self.clock.start(total, at, schedule_into(&mut self.due, self.now));
        }

        fn stop(&mut self, time: Duration) {
            self.now = time;
            self.clock.stop(self.base + time);
        }

        fn resume(&mut self, time: Duration) -> bool {
            self.now = time;
            self.clock
                .resume(self.base + time, schedule_into(&mut self.due, time))
        }

        fn restart(&mut self, time: Duration) -> bool {
            self.now = time;
            self.clock
                .restart(self.base + time, schedule_into(&mut self.due, time))
        }

        fn deliver(&mut self, generation: u64, time: Duration) -> Option<ClockEvent> {
            self.now = time;
            self.clock
                .receive_tick(generation, self.base + time, schedule_into(&mut self.due, time))
        }

        /// Delivers the pending tick at its due time
        fn tick(&mut self) -> Option<ClockEvent> {
            let (time, generation) = self.due.take()?;
            self.deliver(generation, time)
        }

        fn due_at(&self) -> Option<Duration> {
            self.due.map(|(time, _)| time)
        }
    }

    #[test]
    fn test_progress_from_elapsed() {
        assert_eq!(Progress::from_elapsed(secs(0), secs(30)), Progress::ZERO);
        assert_eq!(Progress::from_elapsed(secs(15), secs(30)).percent(), 50.);
        assert_eq!(Progress::from_elapsed(secs(30), secs(30)), Progress::COMPLETE);
        assert_eq!(Progress::from_elapsed(secs(45), secs(30)), Progress::COMPLETE);
        assert_eq!(Progress::from_elapsed(secs(3), Duration::ZERO), Progress::COMPLETE);
    }

    #[test]
    fn test_progress_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Progress::COMPLETE).unwrap(), "100.0");
    }

    #[test]
    fn test_ring_geometry() {
        let empty = Ring::for_progress(Progress::ZERO);
        assert!((empty.circumference - 2. * PI * 80.).abs() < 1e-9);
        assert!((empty.dash_offset - empty.circumference).abs() < 1e-9);

        let half = Ring::for_progress(Progress::from_elapsed(secs(15), secs(30)));
        assert!((half.dash_offset - half.circumference / 2.).abs() < 1e-9);

        let full = Ring::for_progress(Progress::COMPLETE);
        assert!(full.dash_offset.abs() < 1e-9);
    }

    #[test]
    fn test_indicator_label() {
        assert_eq!(Indicator::new(Progress::ZERO, true).label, "Pause");
        assert_eq!(Indicator::new(Progress::ZERO, false).label, "Play");
    }

    #[test]
    fn test_start_schedules_first_tick() {
        let mut driver = Driver::new(secs(1));
        driver.start(secs(30));

        assert!(driver.clock.is_running());
        assert_eq!(driver.due_at(), Some(secs(1)));
        assert_eq!(driver.clock.progress(), Progress::ZERO);
    }

    #[test]
    fn test_runs_to_expiry_exactly_once() {
        let mut driver = Driver::new(secs(1));
        driver.start(secs(30));

        let mut progress = Vec::new();
        let mut expirations = 0;
        while let Some(event) = driver.tick() {
            match event {
                ClockEvent::Progress(p) => progress.push(p.percent()),
                ClockEvent::Expired => expirations += 1,
            }
        }

        assert_eq!(expirations, 1);
        assert_eq!(driver.now, secs(30));
        assert_eq!(progress.len(), 29);
        assert!(progress.iter().all(|p| (0. ..=100.).contains(p)));
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert!(driver.clock.is_expired());
        assert!(!driver.clock.is_running());
        assert_eq!(driver.clock.progress(), Progress::COMPLETE);
        assert_eq!(driver.clock.elapsed(), secs(30));
    }

    #[test]
    fn test_stop_is_idempotent_and_drops_pending_tick() {
        let mut driver = Driver::new(secs(1));
        driver.stop(Duration::ZERO);
        driver.start(secs(30));
        let (_, generation) = driver.due.unwrap();

        driver.stop(millis(400));
        driver.stop(millis(900));

        assert!(!driver.clock.is_running());
        assert_eq!(driver.clock.elapsed(), millis(400));
        assert_eq!(driver.deliver(generation, secs(1)), None);
    }

    #[test]
    fn test_resume_continues_from_frozen_elapsed() {
        let mut driver = Driver::new(secs(1));
        driver.start(secs(30));
        for _ in 0..5 {
            driver.tick();
        }
        let (_, stale) = driver.due.unwrap();

        driver.stop(secs(5));
        assert!(driver.resume(secs(8)));

        assert_eq!(driver.clock.elapsed(), secs(5));
        assert_eq!(driver.deliver(stale, secs(6)), None);
        assert_eq!(driver.due_at(), Some(secs(9)));

        let event = driver.tick();
        assert_eq!(
            event,
            Some(ClockEvent::Progress(Progress::from_elapsed(secs(6), secs(30))))
        );
    }

    #[test]
    fn test_partial_tick_is_banked_on_stop() {
        let mut driver = Driver::new(secs(1));
        driver.start(secs(30));
        for _ in 0..5 {
            driver.tick();
        }

        driver.stop(millis(5_500));
        assert_eq!(driver.clock.elapsed(), millis(5_500));

        assert!(driver.resume(secs(8)));
        assert_eq!(driver.due_at(), Some(millis(8_500)));

        while driver.tick().is_some_and(|event| event != ClockEvent::Expired) {}
        assert!(driver.clock.is_expired());
        assert_eq!(driver.now, millis(32_500));
    }

    #[test]
    fn test_short_bursts_still_accumulate() {
        let mut driver = Driver::new(secs(1));
        driver.start(secs(30));

        let mut time = Duration::ZERO;
        while !driver.clock.is_expired() {
            let pause_at = time + millis(900);
            while driver.due_at().is_some_and(|due| due <= pause_at) {
                driver.tick();
            }
            if driver.clock.is_expired() {
                break;
            }
            driver.stop(pause_at);
            time = pause_at + millis(100);
            assert!(driver.resume(time));
            assert!(time < secs(60), "clock never expired");
        }

        assert_eq!(driver.clock.elapsed(), secs(30));
    }

    #[test]
    fn test_restart_resets_progress() {
        let mut driver = Driver::new(secs(1));
        driver.start(secs(30));
        for _ in 0..5 {
            driver.tick();
        }

        driver.stop(millis(5_300));
        assert!(driver.restart(secs(8)));
        assert_eq!(driver.clock.elapsed(), Duration::ZERO);
        assert_eq!(driver.clock.progress(), Progress::ZERO);
        assert_eq!(driver.due_at(), Some(secs(9)));
    }

    #[test]
    fn test_resume_rejected_when_running_or_unstarted() {
        let mut driver = Driver::new(secs(1));
        assert!(!driver.resume(Duration::ZERO));

        driver.start(secs(30));
        assert!(!driver.resume(Duration::ZERO));
    }

    #[test]
    fn test_uneven_tick_never_overshoots() {
        let mut driver = Driver::new(millis(700));
        driver.start(secs(5));

        let mut last = None;
        while !driver.clock.is_expired() {
            last = driver.tick();
        }

        assert_eq!(last, Some(ClockEvent::Expired));
        assert_eq!(driver.clock.elapsed(), secs(5));
        assert_eq!(driver.now, secs(5));
    }
}
