//! Command combinators.
//!
//! Each combinator wraps one or two commands and forwards the lifecycle calls,
//! so a composed command is still a single [`Command`] to the scheduler.

use embassy_time::{Duration, Instant};

use super::{basic::elapsed_since, Command, Requirements, SubsystemId};

/// Runs `inner` for at most `timeout`. See [`CommandExt::with_timeout`](super::CommandExt::with_timeout).
pub struct WithTimeout<C> {
    inner: C,
    timeout: Duration,
    started: Instant,
    inner_finished: bool,
}

impl<C: Command> WithTimeout<C> {
    pub(crate) fn new(
        inner: C,
        timeout: Duration,
    ) -> Self {
        Self {
            inner,
            timeout,
            started: Instant::from_ticks(0),
            inner_finished: false,
        }
    }
}

impl<C: Command> Command for WithTimeout<C> {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        self.started = now;
        self.inner_finished = false;
        self.inner.initialize(now);
    }

    fn execute(
        &mut self,
        now: Instant,
    ) {
        self.inner.execute(now);
    }

    fn is_finished(
        &mut self,
        now: Instant,
    ) -> bool {
        self.inner_finished = self.inner.is_finished(now);
        self.inner_finished || elapsed_since(self.started, now) >= self.timeout
    }

    fn end(
        &mut self,
        interrupted: bool,
    ) {
        // A timeout interrupts the inner command even though the group finished normally.
        self.inner.end(interrupted || !self.inner_finished);
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }
}

/// Runs `first`, then `second`. The second command is initialized in the
/// same tick the first one finishes.
pub struct AndThen<A, B> {
    first: A,
    second: B,
    stage: Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    First,
    Second,
    Done,
}

impl<A: Command, B: Command> AndThen<A, B> {
    pub(crate) fn new(
        first: A,
        second: B,
    ) -> Self {
        Self {
            first,
            second,
            stage: Stage::First,
        }
    }
}

impl<A: Command, B: Command> Command for AndThen<A, B> {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        self.stage = Stage::First;
        self.first.initialize(now);
    }

    fn execute(
        &mut self,
        now: Instant,
    ) {
        match self.stage {
            Stage::First => {
                self.first.execute(now);
                if self.first.is_finished(now) {
                    self.first.end(false);
                    self.stage = Stage::Second;
                    self.second.initialize(now);
                }
            }
            Stage::Second => {
                self.second.execute(now);
                if self.second.is_finished(now) {
                    self.second.end(false);
                    self.stage = Stage::Done;
                }
            }
            Stage::Done => {}
        }
    }

    fn is_finished(
        &mut self,
        _now: Instant,
    ) -> bool {
        self.stage == Stage::Done
    }

    fn end(
        &mut self,
        interrupted: bool,
    ) {
        if !interrupted {
            return;
        }
        match self.stage {
            Stage::First => self.first.end(true),
            Stage::Second => self.second.end(true),
            Stage::Done => {}
        }
    }

    fn requirements(&self) -> Requirements {
        self.first.requirements().union(&self.second.requirements())
    }
}

/// Runs `inner` until it finishes or `condition` becomes true.
pub struct Until<C, F> {
    inner: C,
    condition: F,
    inner_finished: bool,
}

impl<C: Command, F: FnMut() -> bool> Until<C, F> {
    pub(crate) fn new(
        inner: C,
        condition: F,
    ) -> Self {
        Self {
            inner,
            condition,
            inner_finished: false,
        }
    }
}

impl<C: Command, F: FnMut() -> bool> Command for Until<C, F> {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        self.inner_finished = false;
        self.inner.initialize(now);
    }

    fn execute(
        &mut self,
        now: Instant,
    ) {
        self.inner.execute(now);
    }

    fn is_finished(
        &mut self,
        now: Instant,
    ) -> bool {
        self.inner_finished = self.inner.is_finished(now);
        self.inner_finished || (self.condition)()
    }

    fn end(
        &mut self,
        interrupted: bool,
    ) {
        self.inner.end(interrupted || !self.inner_finished);
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }
}

/// Runs `cleanup(interrupted)` after `inner` ends.
pub struct FinallyDo<C, F> {
    inner: C,
    cleanup: F,
}

impl<C: Command, F: FnMut(bool)> FinallyDo<C, F> {
    pub(crate) fn new(
        inner: C,
        cleanup: F,
    ) -> Self {
        Self { inner, cleanup }
    }
}

impl<C: Command, F: FnMut(bool)> Command for FinallyDo<C, F> {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        self.inner.initialize(now);
    }

    fn execute(
        &mut self,
        now: Instant,
    ) {
        self.inner.execute(now);
    }

    fn is_finished(
        &mut self,
        now: Instant,
    ) -> bool {
        self.inner.is_finished(now)
    }

    fn end(
        &mut self,
        interrupted: bool,
    ) {
        self.inner.end(interrupted);
        (self.cleanup)(interrupted);
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }
}

/// Adds a subsystem to the requirements of `inner`.
pub struct Requiring<C> {
    inner: C,
    subsystem: SubsystemId,
}

impl<C: Command> Requiring<C> {
    pub(crate) fn new(
        inner: C,
        subsystem: SubsystemId,
    ) -> Self {
        Self { inner, subsystem }
    }
}

impl<C: Command> Command for Requiring<C> {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        self.inner.initialize(now);
    }

    fn execute(
        &mut self,
        now: Instant,
    ) {
        self.inner.execute(now);
    }

    fn is_finished(
        &mut self,
        now: Instant,
    ) -> bool {
        self.inner.is_finished(now)
    }

    fn end(
        &mut self,
        interrupted: bool,
    ) {
        self.inner.end(interrupted);
    }

    fn requirements(&self) -> Requirements {
        let mut requirements = self.inner.requirements();
        if let Err(id) = requirements.insert(self.subsystem) {
            tracing::warn!(id = id.get(), "requirement set full, command now requires everything");
        }
        requirements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::{
        basic::{run, run_end, run_once},
        CommandExt,
    };
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Drive `cmd` the way the scheduler does, one tick every 20 ms, until it finishes.
    fn drive<C: Command>(
        cmd: &mut C,
        max_ticks: u64,
    ) -> Option<u64> {
        cmd.initialize(at(0));
        for tick in 0..max_ticks {
            let now = at(tick * 20);
            cmd.execute(now);
            if cmd.is_finished(now) {
                cmd.end(false);
                return Some(tick);
            }
        }
        None
    }

    #[test]
    fn test_timeout_interrupts_inner() {
        let interrupted = Cell::new(None);
        let mut cmd = run(|| {})
            .finally_do(|i| interrupted.set(Some(i)))
            .with_timeout(Duration::from_millis(100));
        assert_eq!(drive(&mut cmd, 50), Some(5));
        assert_eq!(interrupted.get(), Some(true));
    }

    #[test]
    fn test_timeout_passes_through_inner_finish() {
        let interrupted = Cell::new(None);
        let mut cmd = run_once(|| {})
            .finally_do(|i| interrupted.set(Some(i)))
            .with_timeout(Duration::from_secs(10));
        assert_eq!(drive(&mut cmd, 50), Some(0));
        assert_eq!(interrupted.get(), Some(false));
    }

    #[test]
    fn test_and_then_starts_second_in_same_tick() {
        let log = RefCell::new(Vec::new());
        let mut cmd = run(|| log.borrow_mut().push("first"))
            .with_timeout(Duration::from_millis(40))
            .and_then(run_once(|| log.borrow_mut().push("second")));

        assert_eq!(drive(&mut cmd, 50), Some(3));
        assert_eq!(*log.borrow(), ["first", "first", "first", "second"]);
    }

    #[test]
    fn test_and_then_interrupt_ends_active_stage_only() {
        let ended = RefCell::new(Vec::new());
        let mut cmd = run_end(|| {}, || ended.borrow_mut().push("first"))
            .and_then(run_end(|| {}, || ended.borrow_mut().push("second")));
        cmd.initialize(at(0));
        cmd.execute(at(0));
        cmd.end(true);
        assert_eq!(*ended.borrow(), ["first"]);
    }

    #[test]
    fn test_until_checks_condition_after_execute() {
        let count = Cell::new(0);
        let mut cmd = run(|| count.set(count.get() + 1)).until(|| count.get() >= 3);
        assert_eq!(drive(&mut cmd, 50), Some(2));
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_requirements_propagate_through_groups() {
        let a = SubsystemId::allocate();
        let b = SubsystemId::allocate();
        let cmd = run(|| {})
            .requiring(a)
            .with_timeout(Duration::from_secs(1))
            .and_then(run_once(|| {}).requiring(b));
        let reqs = cmd.requirements();
        assert!(reqs.contains(a));
        assert!(reqs.contains(b));
    }
}
