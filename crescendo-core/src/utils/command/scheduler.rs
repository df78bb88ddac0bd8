//! Cooperative, requirement-aware command scheduler.
//!
//! The scheduler owns every running command. On each [`Scheduler::run`] it
//! calls `periodic` on the registered subsystems, then ticks each command
//! once. Scheduling a command interrupts every running command that shares
//! a requirement with it, so at most one command drives a subsystem at a time.

use alloc::{boxed::Box, vec::Vec};

use embassy_time::Instant;

use super::{BoxedCommand, Command, Requirements, SubsystemId};

/// A robot mechanism that commands can require.
pub trait Subsystem {
    fn id(&self) -> SubsystemId;

    /// Called once per scheduler tick, before any command runs.
    fn periodic(&self) {}
}

/// Refers to a command accepted by [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandHandle(u32);

struct Scheduled<'a> {
    handle: CommandHandle,
    command: BoxedCommand<'a>,
    requirements: Requirements,
}

pub struct Scheduler<'a> {
    subsystems: Vec<&'a dyn Subsystem>,
    scheduled: Vec<Scheduled<'a>>,
    next_handle: u32,
}

impl<'a> Scheduler<'a> {
    pub fn new() -> Self {
        Self {
            subsystems: Vec::new(),
            scheduled: Vec::new(),
            next_handle: 0,
        }
    }

    /// Register a subsystem so its `periodic` hook runs every tick.
    pub fn register(
        &mut self,
        subsystem: &'a dyn Subsystem,
    ) {
        self.subsystems.push(subsystem);
    }

    /// Start `command`, interrupting any running command that shares a requirement.
    ///
    /// Interrupted commands are ended before `command` is initialized.
    pub fn schedule(
        &mut self,
        command: impl Command + 'a,
        now: Instant,
    ) -> CommandHandle {
        let requirements = command.requirements();
        let mut command: BoxedCommand<'a> = Box::new(command);

        let mut i = 0;
        while i < self.scheduled.len() {
            if self.scheduled[i].requirements.intersects(&requirements) {
                let mut displaced = self.scheduled.remove(i);
                tracing::debug!(
                    handle = displaced.handle.0,
                    "interrupting command on shared requirement"
                );
                displaced.command.end(true);
            } else {
                i += 1;
            }
        }

        let handle = CommandHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        command.initialize(now);
        tracing::debug!(handle = handle.0, "command scheduled");
        self.scheduled.push(Scheduled {
            handle,
            command,
            requirements,
        });
        handle
    }

    /// Run one tick: subsystem hooks, then every scheduled command.
    pub fn run(
        &mut self,
        now: Instant,
    ) {
        for subsystem in &self.subsystems {
            subsystem.periodic();
        }

        let mut i = 0;
        while i < self.scheduled.len() {
            let entry = &mut self.scheduled[i];
            entry.command.execute(now);
            if entry.command.is_finished(now) {
                let mut finished = self.scheduled.remove(i);
                finished.command.end(false);
                tracing::debug!(handle = finished.handle.0, "command finished");
            } else {
                i += 1;
            }
        }
    }

    /// Interrupt the command behind `handle`. Returns false if it is no longer running.
    pub fn cancel(
        &mut self,
        handle: CommandHandle,
    ) -> bool {
        match self.scheduled.iter().position(|s| s.handle == handle) {
            Some(index) => {
                let mut cancelled = self.scheduled.remove(index);
                cancelled.command.end(true);
                tracing::debug!(handle = handle.0, "command cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for mut entry in self.scheduled.drain(..) {
            entry.command.end(true);
        }
    }

    pub fn is_scheduled(
        &self,
        handle: CommandHandle,
    ) -> bool {
        self.scheduled.iter().any(|s| s.handle == handle)
    }

    /// The running command that requires `subsystem`, if any.
    pub fn requiring(
        &self,
        subsystem: SubsystemId,
    ) -> Option<CommandHandle> {
        self.scheduled
            .iter()
            .find(|s| s.requirements.contains(subsystem))
            .map(|s| s.handle)
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::{
        basic::{run, run_end, run_once},
        CommandExt,
    };
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    struct Counter {
        id: SubsystemId,
        ticks: Cell<u32>,
    }

    impl Subsystem for Counter {
        fn id(&self) -> SubsystemId {
            self.id
        }

        fn periodic(&self) {
            self.ticks.set(self.ticks.get() + 1);
        }
    }

    #[test]
    fn test_periodic_runs_every_tick() {
        let counter = Counter {
            id: SubsystemId::allocate(),
            ticks: Cell::new(0),
        };
        let mut scheduler = Scheduler::new();
        scheduler.register(&counter);
        for ms in 0..5 {
            scheduler.run(Instant::from_millis(ms * 20));
        }
        assert_eq!(counter.ticks.get(), 5);
    }

    #[test]
    fn test_finished_command_is_removed() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(run_once(|| {}), Instant::from_millis(0));
        assert!(scheduler.is_scheduled(handle));
        scheduler.run(Instant::from_millis(0));
        assert!(!scheduler.is_scheduled(handle));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_shared_requirement_interrupts_before_initialize() {
        let id = SubsystemId::allocate();
        let log = RefCell::new(vec![]);
        let mut scheduler = Scheduler::new();

        let first = scheduler.schedule(
            run_end(|| {}, || log.borrow_mut().push("first end")).requiring(id),
            Instant::from_millis(0),
        );
        scheduler.run(Instant::from_millis(0));
        let second = scheduler.schedule(
            run_once(|| log.borrow_mut().push("second init")).requiring(id),
            Instant::from_millis(20),
        );

        assert!(!scheduler.is_scheduled(first));
        assert!(scheduler.is_scheduled(second));
        assert_eq!(*log.borrow(), ["first end", "second init"]);
    }

    #[test]
    fn test_disjoint_requirements_run_together() {
        let a = SubsystemId::allocate();
        let b = SubsystemId::allocate();
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule(run(|| {}).requiring(a), Instant::from_millis(0));
        let second = scheduler.schedule(run(|| {}).requiring(b), Instant::from_millis(0));
        assert!(scheduler.is_scheduled(first));
        assert!(scheduler.is_scheduled(second));
        assert_eq!(scheduler.requiring(a), Some(first));
        assert_eq!(scheduler.requiring(b), Some(second));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_overflowed_requirements_interrupt_everything() {
        let drive = SubsystemId::allocate();
        let mut scheduler = Scheduler::new();
        let running = scheduler.schedule(run(|| {}).requiring(drive), Instant::from_millis(0));

        // One more subsystem than a requirement set can hold.
        let mut greedy = run(|| {}).boxed();
        for _ in 0..=crate::utils::command::MAX_REQUIREMENTS {
            greedy = greedy.requiring(SubsystemId::allocate()).boxed();
        }
        assert!(greedy.requirements().is_overflowed());

        let greedy = scheduler.schedule(greedy, Instant::from_millis(20));
        assert!(!scheduler.is_scheduled(running));
        assert!(scheduler.is_scheduled(greedy));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancel_ends_with_interrupted() {
        let interrupted = Cell::new(None);
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(
            run(|| {}).finally_do(|i| interrupted.set(Some(i))),
            Instant::from_millis(0),
        );
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert_eq!(interrupted.get(), Some(true));
    }

    #[test]
    fn test_cancel_all() {
        let ended = Cell::new(0);
        let mut scheduler = Scheduler::new();
        scheduler.schedule(run_end(|| {}, || ended.set(ended.get() + 1)), Instant::from_millis(0));
        scheduler.schedule(run_end(|| {}, || ended.set(ended.get() + 1)), Instant::from_millis(0));
        scheduler.cancel_all();
        assert_eq!(ended.get(), 2);
        assert!(scheduler.is_empty());
    }
}
