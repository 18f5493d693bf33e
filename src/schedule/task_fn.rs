//! # Function-backed scheduled task (`ScheduleFn`)
//!
//! [`ScheduleFn`] wraps a closure `F: Fn(TickContext) -> Fut`, producing a fresh
//! future per tick. State shared between ticks goes into an explicit `Arc<...>`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use pulsevisor::{ScheduleFn, TaskRef, TickContext, TickError};
//!
//! let t: TaskRef = ScheduleFn::new("jvmMetric", |_ctx: TickContext| async {
//!     Ok::<_, TickError>(())
//! })
//! .with_config_key("metricOutput.interval.jvm")
//! .into_ref();
//!
//! assert_eq!(t.name(), "jvmMetric");
//! assert_eq!(t.config_key(), Some("metricOutput.interval.jvm"));
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TickError;
use crate::schedule::task::{ScheduledTask, TaskRef, TickContext};

/// Function-backed scheduled task.
#[derive(Debug)]
pub struct ScheduleFn<F> {
    name: Cow<'static, str>,
    config_key: Option<Cow<'static, str>>,
    f: F,
}

impl<F> ScheduleFn<F> {
    /// Creates a task; turn it into a [`TaskRef`] with [`into_ref`](Self::into_ref).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            config_key: None,
            f,
        }
    }

    /// Binds the task interval to a configuration key.
    pub fn with_config_key(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.config_key = Some(key.into());
        self
    }
}

impl<F, Fut> ScheduleFn<F>
where
    F: Fn(TickContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TickError>> + Send + 'static,
{
    /// Returns the task as a shared handle.
    pub fn into_ref(self) -> TaskRef {
        Arc::new(self)
    }
}

#[async_trait]
impl<F, Fut> ScheduledTask for ScheduleFn<F>
where
    F: Fn(TickContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TickError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn config_key(&self) -> Option<&str> {
        self.config_key.as_deref()
    }

    async fn execute(&self, ctx: &TickContext) -> Result<(), TickError> {
        (self.f)(ctx.clone()).await
    }
}
