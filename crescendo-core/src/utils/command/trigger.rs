//! Polled boolean conditions.
//!
//! A [`Trigger`] is re-evaluated whenever it is read, usually once per
//! scheduler tick. It never caches a value.

use alloc::boxed::Box;

/// A level-triggered condition.
pub struct Trigger<'a> {
    condition: Box<dyn Fn() -> bool + 'a>,
}

impl<'a> Trigger<'a> {
    pub fn new(condition: impl Fn() -> bool + 'a) -> Self {
        Self {
            condition: Box::new(condition),
        }
    }

    /// Evaluate the condition now.
    pub fn get(&self) -> bool {
        (self.condition)()
    }

    pub fn and(
        self,
        other: Trigger<'a>,
    ) -> Trigger<'a> {
        Trigger::new(move || self.get() && other.get())
    }

    pub fn or(
        self,
        other: Trigger<'a>,
    ) -> Trigger<'a> {
        Trigger::new(move || self.get() || other.get())
    }

    pub fn negate(self) -> Trigger<'a> {
        Trigger::new(move || !self.get())
    }

    /// Turn the trigger into a condition for [`CommandExt::until`](super::CommandExt::until)
    /// or [`wait_until`](super::wait_until).
    pub fn into_condition(self) -> impl FnMut() -> bool + 'a {
        move || self.get()
    }
}

impl core::fmt::Debug for Trigger<'_> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        f.debug_struct("Trigger").finish_non_exhaustive()
    }
}
