use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of checking the clock at some instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickPoll {
    /// not running
    Idle,
    /// nothing due before this deadline
    Wait(Instant),
    /// one step is due; `missed` deadlines were slept through and dropped
    Fire { missed: u32 },
}

#[derive(Clone, Copy, Debug)]
enum Anchor {
    /// first step is due at this instant
    Start(Instant),
    /// last step fired for this deadline
    Fired(Instant),
}

/// Absolute-deadline step clock. The next deadline is always the last fired
/// deadline plus the current interval, so wake-up jitter never accumulates
/// and a tempo change moves the very next step. A late wake fires a single
/// step and skips the deadlines it overslept.
#[derive(Clone, Debug, Default)]
pub struct TickClock {
    anchor: Option<Anchor>,
}

impl TickClock {
    /// First step is due immediately.
    pub fn start(&mut self, now: Instant) {
        self.anchor = Some(Anchor::Start(now));
    }

    pub fn stop(&mut self) {
        self.anchor = None;
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Next deadline at the given interval.
    pub fn deadline(&self, interval: Duration) -> Option<Instant> {
        self.anchor.map(|a| match a {
            Anchor::Start(at) => at,
            Anchor::Fired(at) => at + interval.max(MIN_INTERVAL),
        })
    }

    /// `interval` is read fresh on every call and applied from the last
    /// fired deadline.
    pub fn poll(&mut self, now: Instant, interval: Duration) -> TickPoll {
        let Some(due) = self.deadline(interval) else {
            return TickPoll::Idle;
        };
        if now < due {
            return TickPoll::Wait(due);
        }
        let interval = interval.max(MIN_INTERVAL);
        let missed = ((now - due).as_nanos() / interval.as_nanos()) as u32;
        self.anchor = Some(Anchor::Fired(due + interval * missed));
        TickPoll::Fire { missed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    #[test]
    fn idle_until_started() {
        let mut c = TickClock::default();
        assert_eq!(c.poll(Instant::now(), STEP), TickPoll::Idle);
    }

    #[test]
    fn on_time_wakes_fire_once_each() {
        let t0 = Instant::now();
        let mut c = TickClock::default();
        c.start(t0);
        assert_eq!(c.poll(t0, STEP), TickPoll::Fire { missed: 0 });
        assert_eq!(c.poll(t0 + STEP / 2, STEP), TickPoll::Wait(t0 + STEP));
        // a little late: still fires once, next deadline stays on the grid
        assert_eq!(c.poll(t0 + STEP + Duration::from_millis(7), STEP), TickPoll::Fire { missed: 0 });
        assert_eq!(c.deadline(STEP), Some(t0 + STEP * 2));
    }

    #[test]
    fn late_wake_drops_missed_ticks() {
        let t0 = Instant::now();
        let mut c = TickClock::default();
        c.start(t0);
        c.poll(t0, STEP);
        // overslept from 100 ms to 350 ms: deadlines 100, 200, 300 were due
        assert_eq!(c.poll(t0 + Duration::from_millis(350), STEP), TickPoll::Fire { missed: 2 });
        assert_eq!(c.deadline(STEP), Some(t0 + STEP * 4));
        assert_eq!(c.poll(t0 + Duration::from_millis(360), STEP), TickPoll::Wait(t0 + STEP * 4));
    }

    #[test]
    fn interval_change_moves_the_pending_deadline() {
        let t0 = Instant::now();
        let mut c = TickClock::default();
        c.start(t0);
        c.poll(t0, STEP);
        let fast = Duration::from_millis(40);
        assert_eq!(c.poll(t0 + Duration::from_millis(30), fast), TickPoll::Wait(t0 + fast));
        assert_eq!(c.poll(t0 + Duration::from_millis(45), fast), TickPoll::Fire { missed: 0 });
        assert_eq!(c.deadline(fast), Some(t0 + fast * 2));
        // slowing down pushes the deadline out again
        assert_eq!(c.poll(t0 + Duration::from_millis(85), STEP), TickPoll::Wait(t0 + fast + STEP));
    }

    #[test]
    fn stop_clears_deadline() {
        let mut c = TickClock::default();
        c.start(Instant::now());
        c.stop();
        assert!(!c.is_running());
    }
}
