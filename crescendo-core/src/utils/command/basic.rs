//! Leaf commands built from closures.

use embassy_time::{Duration, Instant};

use super::Command;

/// Calls `action` on every tick. Never finishes on its own.
pub fn run<F: FnMut()>(action: F) -> Run<F> {
    Run { action }
}

/// Calls `action` once when started and finishes in the same tick.
pub fn run_once<F: FnMut()>(action: F) -> RunOnce<F> {
    RunOnce { action }
}

/// Calls `action` on every tick and `on_end` when the command ends for any reason.
pub fn run_end<F: FnMut(), G: FnMut()>(
    action: F,
    on_end: G,
) -> RunEnd<F, G> {
    RunEnd { action, on_end }
}

/// Does nothing for `duration`, then finishes.
pub fn wait(duration: Duration) -> Wait {
    Wait {
        duration,
        started: None,
    }
}

/// Does nothing until `condition` returns true.
pub fn wait_until<F: FnMut() -> bool>(condition: F) -> WaitUntil<F> {
    WaitUntil { condition }
}

pub struct Run<F> {
    action: F,
}

impl<F: FnMut()> Command for Run<F> {
    fn execute(
        &mut self,
        _now: Instant,
    ) {
        (self.action)()
    }
}

pub struct RunOnce<F> {
    action: F,
}

impl<F: FnMut()> Command for RunOnce<F> {
    fn initialize(
        &mut self,
        _now: Instant,
    ) {
        (self.action)()
    }

    fn execute(
        &mut self,
        _now: Instant,
    ) {
    }

    fn is_finished(
        &mut self,
        _now: Instant,
    ) -> bool {
        true
    }
}

pub struct RunEnd<F, G> {
    action: F,
    on_end: G,
}

impl<F: FnMut(), G: FnMut()> Command for RunEnd<F, G> {
    fn execute(
        &mut self,
        _now: Instant,
    ) {
        (self.action)()
    }

    fn end(
        &mut self,
        _interrupted: bool,
    ) {
        (self.on_end)()
    }
}

pub struct Wait {
    duration: Duration,
    started: Option<Instant>,
}

impl Command for Wait {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        self.started = Some(now);
    }

    fn execute(
        &mut self,
        _now: Instant,
    ) {
    }

    fn is_finished(
        &mut self,
        now: Instant,
    ) -> bool {
        match self.started {
            Some(started) => elapsed_since(started, now) >= self.duration,
            None => false,
        }
    }
}

pub struct WaitUntil<F> {
    condition: F,
}

impl<F: FnMut() -> bool> Command for WaitUntil<F> {
    fn execute(
        &mut self,
        _now: Instant,
    ) {
    }

    fn is_finished(
        &mut self,
        _now: Instant,
    ) -> bool {
        (self.condition)()
    }
}

/// Time elapsed from `start` to `now`, saturating at zero if the clock went backwards.
pub(crate) fn elapsed_since(
    start: Instant,
    now: Instant,
) -> Duration {
    now.checked_duration_since(start)
        .unwrap_or(Duration::from_ticks(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_run_never_finishes() {
        let count = Cell::new(0);
        let mut cmd = run(|| count.set(count.get() + 1));
        cmd.initialize(at(0));
        for ms in 0..10 {
            cmd.execute(at(ms * 20));
            assert!(!cmd.is_finished(at(ms * 20)));
        }
        assert_eq!(count.get(), 10);
    }

    #[test]
    fn test_run_once_acts_on_initialize() {
        let count = Cell::new(0);
        let mut cmd = run_once(|| count.set(count.get() + 1));
        cmd.initialize(at(0));
        assert_eq!(count.get(), 1);
        cmd.execute(at(0));
        assert!(cmd.is_finished(at(0)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_run_end_calls_end_handler() {
        let ended = Cell::new(false);
        let mut cmd = run_end(|| {}, || ended.set(true));
        cmd.initialize(at(0));
        cmd.execute(at(0));
        assert!(!ended.get());
        cmd.end(true);
        assert!(ended.get());
    }

    #[test]
    fn test_wait_finishes_after_duration() {
        let mut cmd = wait(Duration::from_millis(100));
        cmd.initialize(at(1_000));
        assert!(!cmd.is_finished(at(1_099)));
        assert!(cmd.is_finished(at(1_100)));
    }

    #[test]
    fn test_elapsed_saturates() {
        assert_eq!(elapsed_since(at(50), at(10)), Duration::from_ticks(0));
    }
}
