use crate::clock::Clock;
use parking_lot::Mutex;

/// Minimum and maximum observed during one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extremes {
    pub min: i64,
    pub max: i64,
}

impl Extremes {
    fn of(value: i64) -> Extremes { Extremes { min: value, max: value } }

    fn observe(&mut self, value: i64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Tracks the min/max of observed values per wall-clock minute.
///
/// Only the previous complete minute is reported.  Rollover is detected lazily: every observation
/// and every read compares the current minute against the stored one.
pub struct MinuteWindow {
    clock: Clock,
    state: Mutex<State>,
}

struct State {
    minute: u64,
    current: Option<Extremes>,
    previous: Option<Extremes>,
}

impl MinuteWindow {
    /// Creates a window that starts in the current minute.
    ///
    /// `seed` is the level already in effect, if the tracked quantity is a level (such as an
    /// in-flight count) rather than a stream of discrete observations.
    pub fn new(clock: Clock, seed: Option<i64>) -> MinuteWindow {
        let minute = clock.minute();
        MinuteWindow {
            clock,
            state: Mutex::new(State {
                minute,
                current: seed.map(Extremes::of),
                previous: None,
            }),
        }
    }

    /// Records `value` in the current minute.
    ///
    /// `level` is passed to rollover as the value in effect during any minute that saw no
    /// observations; `None` leaves such minutes empty.
    pub fn observe(&self, value: i64, level: Option<i64>) {
        let mut state = self.state.lock();
        self.roll(&mut state, level);
        match state.current.as_mut() {
            Some(extremes) => extremes.observe(value),
            None => state.current = Some(Extremes::of(value)),
        }
    }

    /// Extremes of the previous complete minute, `None` before the first rollover.
    pub fn previous(&self, level: Option<i64>) -> Option<Extremes> {
        let mut state = self.state.lock();
        self.roll(&mut state, level);
        state.previous
    }

    fn roll(&self, state: &mut State, level: Option<i64>) {
        let now = self.clock.minute();
        if now <= state.minute {
            return;
        }

        state.previous = if now == state.minute + 1 {
            state.current
        } else {
            // At least one whole minute passed untouched; the level held throughout it.
            level.map(Extremes::of)
        };
        state.current = level.map(Extremes::of);
        state.minute = now;
    }
}
