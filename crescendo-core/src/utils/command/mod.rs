//! Command runtime for robot subsystems.
//!
//! A [`Command`] is a unit of work the [`Scheduler`] ticks once per loop
//! period until it reports finished or is interrupted. Commands are built with
//! the factories in [`basic`] and composed with [`CommandExt`]:
//!
//! - `basic`: `run`, `run_once`, `run_end`, `wait`, `wait_until`
//! - `group`: timeout, sequence, condition, cleanup and requirement combinators
//! - `scheduler`: requirement-aware cooperative scheduler
//! - `trigger`: polled boolean conditions
//!
//! # Example
//! ```rust
//! use core::cell::Cell;
//! use crescendo_core::utils::command::{basic::run, CommandExt, Scheduler};
//! use embassy_time::{Duration, Instant};
//!
//! let ticks = Cell::new(0);
//! let mut scheduler = Scheduler::new();
//! scheduler.schedule(
//!     run(|| ticks.set(ticks.get() + 1)).with_timeout(Duration::from_millis(40)),
//!     Instant::from_millis(0),
//! );
//! for ms in [0, 20, 40] {
//!     scheduler.run(Instant::from_millis(ms));
//! }
//! assert_eq!(ticks.get(), 3);
//! assert!(scheduler.is_empty());
//! ```

pub mod basic;
pub mod group;
pub mod scheduler;
pub mod trigger;

use alloc::boxed::Box;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_time::{Duration, Instant};

pub use basic::{run, run_end, run_once, wait, wait_until};
pub use group::{AndThen, FinallyDo, Requiring, Until, WithTimeout};
pub use scheduler::{CommandHandle, Scheduler, Subsystem};
pub use trigger::Trigger;

/// Upper bound on the number of subsystems a single command may require.
pub const MAX_REQUIREMENTS: usize = 8;

static NEXT_SUBSYSTEM_ID: AtomicU32 = AtomicU32::new(0);

/// Identity of one subsystem instance, used to express command requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubsystemId(u32);

impl SubsystemId {
    /// Allocate a process-unique id.
    pub fn allocate() -> Self {
        Self(NEXT_SUBSYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// The set of subsystems a command drives exclusively while it runs.
///
/// Holds at most [`MAX_REQUIREMENTS`] ids. A set that overflowed is treated
/// as requiring every subsystem, so it conflicts with any non-empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    ids: heapless::Vec<SubsystemId, MAX_REQUIREMENTS>,
    overflowed: bool,
}

impl Requirements {
    pub const fn new() -> Self {
        Self {
            ids: heapless::Vec::new(),
            overflowed: false,
        }
    }

    pub fn of(id: SubsystemId) -> Self {
        let mut requirements = Self::new();
        // a fresh set always has room for one id
        let _ = requirements.insert(id);
        requirements
    }

    /// Add `id` to the set. Already-present ids are accepted.
    ///
    /// Returns `Err(id)` when the set is full; the set is then marked
    /// overflowed and conflicts with every other non-empty set.
    pub fn insert(
        &mut self,
        id: SubsystemId,
    ) -> Result<(), SubsystemId> {
        if self.contains(id) {
            return Ok(());
        }
        self.ids.push(id).map_err(|id| {
            self.overflowed = true;
            id
        })
    }

    pub fn union(
        mut self,
        other: &Requirements,
    ) -> Self {
        self.overflowed |= other.overflowed;
        for &id in other.iter() {
            if let Err(id) = self.insert(id) {
                tracing::warn!(id = id.get(), "requirement set full, command now requires everything");
            }
        }
        self
    }

    pub fn contains(
        &self,
        id: SubsystemId,
    ) -> bool {
        self.ids.contains(&id)
    }

    pub fn intersects(
        &self,
        other: &Requirements,
    ) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.overflowed || other.overflowed || self.iter().any(|&id| other.contains(id))
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && !self.overflowed
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubsystemId> {
        self.ids.iter()
    }
}

/// A schedulable, cancellable unit of work.
///
/// The scheduler calls `initialize` once when the command starts, then
/// `execute` followed by `is_finished` on every tick. `end` runs exactly once,
/// with `interrupted == true` when the command was cancelled or superseded.
pub trait Command {
    fn initialize(
        &mut self,
        _now: Instant,
    ) {
    }

    fn execute(
        &mut self,
        now: Instant,
    );

    fn is_finished(
        &mut self,
        _now: Instant,
    ) -> bool {
        false
    }

    fn end(
        &mut self,
        _interrupted: bool,
    ) {
    }

    fn requirements(&self) -> Requirements {
        Requirements::new()
    }
}

/// Type-erased command, as stored by the scheduler.
pub type BoxedCommand<'a> = Box<dyn Command + 'a>;

impl<C: Command + ?Sized> Command for Box<C> {
    fn initialize(
        &mut self,
        now: Instant,
    ) {
        (**self).initialize(now)
    }

    fn execute(
        &mut self,
        now: Instant,
    ) {
        (**self).execute(now)
    }

    fn is_finished(
        &mut self,
        now: Instant,
    ) -> bool {
        (**self).is_finished(now)
    }

    fn end(
        &mut self,
        interrupted: bool,
    ) {
        (**self).end(interrupted)
    }

    fn requirements(&self) -> Requirements {
        (**self).requirements()
    }
}

/// Composition helpers available on every [`Command`].
pub trait CommandExt: Command + Sized {
    /// Interrupt the command once `timeout` has elapsed since it started.
    fn with_timeout(
        self,
        timeout: Duration,
    ) -> WithTimeout<Self> {
        WithTimeout::new(self, timeout)
    }

    /// Run `next` after this command finishes.
    fn and_then<C: Command>(
        self,
        next: C,
    ) -> AndThen<Self, C> {
        AndThen::new(self, next)
    }

    /// Interrupt the command as soon as `condition` returns true.
    fn until<F: FnMut() -> bool>(
        self,
        condition: F,
    ) -> Until<Self, F> {
        Until::new(self, condition)
    }

    /// Run `cleanup` after the command ends, on every exit path.
    fn finally_do<F: FnMut(bool)>(
        self,
        cleanup: F,
    ) -> FinallyDo<Self, F> {
        FinallyDo::new(self, cleanup)
    }

    /// Declare that the command drives `subsystem` exclusively.
    fn requiring(
        self,
        subsystem: SubsystemId,
    ) -> Requiring<Self> {
        Requiring::new(self, subsystem)
    }

    fn boxed<'a>(self) -> BoxedCommand<'a>
    where
        Self: 'a,
    {
        Box::new(self)
    }
}

impl<C: Command> CommandExt for C {}
