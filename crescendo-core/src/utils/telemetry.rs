//! Write-only numeric telemetry.
//!
//! Subsystems push samples under fixed string keys and never read them back.

use alloc::vec::Vec;

pub trait Telemetry {
    fn record(
        &mut self,
        key: &'static str,
        value: f32,
    );
}

impl<T: Telemetry + ?Sized> Telemetry for &mut T {
    fn record(
        &mut self,
        key: &'static str,
        value: f32,
    ) {
        (**self).record(key, value)
    }
}

/// Emits every sample as a `trace` event on the `telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(
        &mut self,
        key: &'static str,
        value: f32,
    ) {
        tracing::trace!(target: "telemetry", key, value);
    }
}

/// One recorded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub key: &'static str,
    pub value: f32,
}

/// Keeps every sample in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    samples: Vec<Sample>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Most recent value recorded under `key`.
    pub fn latest(
        &self,
        key: &str,
    ) -> Option<f32> {
        self.samples
            .iter()
            .rev()
            .find(|s| s.key == key)
            .map(|s| s.value)
    }

    pub fn count(
        &self,
        key: &str,
    ) -> usize {
        self.samples.iter().filter(|s| s.key == key).count()
    }
}

impl Telemetry for LogBuffer {
    fn record(
        &mut self,
        key: &'static str,
        value: f32,
    ) {
        self.samples.push(Sample { key, value });
    }
}
