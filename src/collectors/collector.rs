//! # Collector contract.
//!
//! A [`Collector`] samples one metric family (memory, threads, process, ...) and
//! returns a [`MetricSnapshot`]. It is called once per tick from the owning
//! [`CollectorSchedule`](crate::CollectorSchedule), never concurrently with itself.

use crate::error::CollectorError;
use crate::report::MetricValue;

/// Point-in-time sample of one metric family.
///
/// Consumed once (merged into a payload) and discarded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSnapshot {
    family: String,
    fields: Vec<(String, MetricValue)>,
}

impl MetricSnapshot {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field (builder style).
    #[inline]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.push(key, value);
        self
    }

    #[inline]
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn fields(&self) -> &[(String, MetricValue)] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<(String, MetricValue)> {
        self.fields
    }
}

/// Sampler of one metric family.
///
/// `collect` must not block longer than the owning task's interval in normal
/// operation; a hung collector stalls only its own task.
pub trait Collector: Send {
    /// Family name (e.g. `"memory"`), used in logs.
    fn family(&self) -> &str;

    /// Takes one sample.
    fn collect(&mut self) -> Result<MetricSnapshot, CollectorError>;
}

/// Builds a fresh collector; called from `before_run`.
pub type CollectorFactory = Box<dyn Fn() -> Box<dyn Collector> + Send + Sync>;
