//! # Listener registration.
//!
//! [`Subscription`] binds a [`Listener`] to the dispatch parameters the bus needs:
//!
//! | Parameter        | Default            | Meaning                                              |
//! |------------------|--------------------|------------------------------------------------------|
//! | `parallelism`    | 1                  | number of consumer workers (`P ≥ 1`)                 |
//! | `shard_by`       | none               | key function; same key → same worker, FIFO per key   |
//! | `weight`         | [`BASELINE_WEIGHT`]| precedence; higher weight is offered events first    |
//! | `queue_capacity` | bus default        | bound of each worker queue                           |
//!
//! ## Queue layout
//! ```text
//! P = 1                 : [queue] ─► worker                      (publish order)
//! P > 1, shard_by(f)    : hash(f(ev)) mod P ─► [queue i] ─► worker i   (FIFO per key)
//! P > 1, no sharding    : [shared queue] ─► worker 1..P          (no ordering)
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::RegistrationError;
use crate::events::Event;
use crate::listeners::Listener;

/// Weight every registration gets unless it asks for another one.
pub const BASELINE_WEIGHT: i32 = 100;

/// Hashed shard-key extractor.
pub(crate) type ShardFn = Arc<dyn Fn(&Event) -> u64 + Send + Sync>;

/// Registration of a listener on the bus.
#[derive(Clone)]
pub struct Subscription {
    pub(crate) listener: Arc<dyn Listener>,
    pub(crate) parallelism: usize,
    pub(crate) shard: Option<ShardFn>,
    pub(crate) weight: i32,
    pub(crate) queue_capacity: Option<usize>,
}

impl Subscription {
    /// Creates a registration with a single unsharded worker at [`BASELINE_WEIGHT`].
    pub fn new(listener: Arc<dyn Listener>) -> Self {
        Self {
            listener,
            parallelism: 1,
            shard: None,
            weight: BASELINE_WEIGHT,
            queue_capacity: None,
        }
    }

    /// Sets the number of consumer workers.
    #[inline]
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    /// Sets the precedence weight.
    #[inline]
    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Overrides the bus-wide queue capacity for this listener.
    #[inline]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Enables shard-by-key ordering: events with equal keys are consumed by the
    /// same worker in publish order.
    pub fn shard_by<K, F>(mut self, key: F) -> Self
    where
        K: Hash,
        F: Fn(&Event) -> K + Send + Sync + 'static,
    {
        self.shard = Some(Arc::new(move |ev: &Event| {
            let mut hasher = DefaultHasher::new();
            key(ev).hash(&mut hasher);
            hasher.finish()
        }));
        self
    }

    pub fn name(&self) -> &str {
        self.listener.name()
    }

    pub fn is_sharded(&self) -> bool {
        self.shard.is_some()
    }

    pub fn get_parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn get_weight(&self) -> i32 {
        self.weight
    }

    pub(crate) fn validate(&self) -> Result<(), RegistrationError> {
        let name = self.listener.name();
        if name.trim().is_empty() {
            return Err(RegistrationError::InvalidListener {
                name: name.to_string(),
                reason: "name must not be empty",
            });
        }
        if self.parallelism == 0 {
            return Err(RegistrationError::InvalidListener {
                name: name.to_string(),
                reason: "parallelism must be at least 1",
            });
        }
        if self.queue_capacity == Some(0) {
            return Err(RegistrationError::InvalidListener {
                name: name.to_string(),
                reason: "queue capacity must be at least 1",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listener", &self.listener.name())
            .field("parallelism", &self.parallelism)
            .field("sharded", &self.shard.is_some())
            .field("weight", &self.weight)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::events::{Event, EventType};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Listener for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn accept(&self, _ev: Event) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn defaults() {
        let sub = Subscription::new(Arc::new(Named("a")));
        assert_eq!(sub.get_parallelism(), 1);
        assert_eq!(sub.get_weight(), BASELINE_WEIGHT);
        assert!(!sub.is_sharded());
        assert!(sub.validate().is_ok());
    }

    #[test]
    fn rejects_zero_parallelism_and_empty_name() {
        let err = Subscription::new(Arc::new(Named("a")))
            .parallelism(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.as_label(), "registration_invalid_listener");

        let err = Subscription::new(Arc::new(Named(" "))).validate().unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidListener { .. }));

        let err = Subscription::new(Arc::new(Named("a")))
            .queue_capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidListener { .. }));
    }

    #[test]
    fn equal_keys_hash_equally() {
        let sub = Subscription::new(Arc::new(Named("a")))
            .shard_by(|ev: &Event| ev.downcast_ref::<u32>().copied().unwrap_or(0) % 10);
        let shard = sub.shard.clone().expect("sharded");

        let a = Event::custom(EventType::new("t"), 13_u32);
        let b = Event::custom(EventType::new("t"), 3_u32);
        assert_eq!(shard(&a), shard(&b));
    }
}
