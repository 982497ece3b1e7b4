//! # pulse_events
//!
//! A synchronous in-process publish/subscribe bus with two keyspaces:
//!
//! - **Typed events** — keyed by the event's type; handlers receive the
//!   payload by shared reference.
//! - **Named signals** — keyed by string; handlers take no payload.
//!
//! Subscribing returns a [`SubscriptionId`] token used for removal, since
//! closures carry no comparable identity. Publishing snapshots the handler
//! list before invoking it, so handlers may subscribe or unsubscribe from
//! inside a dispatch; such changes take effect at the next publish.
//! Publishing with no subscribers is a silent no-op.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Token identifying one subscription, returned by the subscribe methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type TypedHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;
type NamedHandler = Arc<dyn Fn() + Send + Sync>;

/// The in-process event bus.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Default)]
pub struct EventBus {
    /// Monotonic subscription id allocator.
    next_id: AtomicU64,
    /// Payload-event handlers keyed by event type.
    typed: Mutex<HashMap<TypeId, Vec<(SubscriptionId, TypedHandler)>>>,
    /// Signal handlers keyed by name.
    named: Mutex<HashMap<String, Vec<(SubscriptionId, NamedHandler)>>>,
}

/// Handler maps must survive a panicking subscriber; recover the state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventBus {
    /// Create a new empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe `handler` to events of type `E`.
    pub fn subscribe<E: 'static>(
        &self,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_id();
        let erased: TypedHandler = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });
        lock(&self.typed)
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        id
    }

    /// Publish `event` to every subscriber of type `E`.
    pub fn publish<E: 'static>(&self, event: &E) {
        let handlers: Vec<TypedHandler> = lock(&self.typed)
            .get(&TypeId::of::<E>())
            .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        trace!(
            event = std::any::type_name::<E>(),
            subscribers = handlers.len(),
            "publishing typed event"
        );
        for handler in handlers {
            handler(event);
        }
    }

    /// Subscribe `handler` to the named signal `name`.
    pub fn subscribe_named(
        &self,
        name: impl Into<String>,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_id();
        let erased: NamedHandler = Arc::new(handler);
        lock(&self.named)
            .entry(name.into())
            .or_default()
            .push((id, erased));
        id
    }

    /// Publish the named signal `name` to every subscriber.
    pub fn publish_named(&self, name: &str) {
        let handlers: Vec<NamedHandler> = lock(&self.named)
            .get(name)
            .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        trace!(signal = name, subscribers = handlers.len(), "publishing signal");
        for handler in handlers {
            handler();
        }
    }

    /// Remove the subscription identified by `id`, typed or named.
    ///
    /// Returns `true` if a handler was removed. Removal takes effect for
    /// publishes that start after this call; a dispatch already snapshotted
    /// still delivers.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if remove_subscription(&mut lock(&self.typed), id) {
            return true;
        }
        remove_subscription(&mut lock(&self.named), id)
    }

    /// Number of subscribers for events of type `E`.
    #[must_use]
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        lock(&self.typed)
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Number of subscribers for the named signal `name`.
    #[must_use]
    pub fn named_subscriber_count(&self, name: &str) -> usize {
        lock(&self.named).get(name).map_or(0, Vec::len)
    }
}

/// Remove `id` from a handler map, dropping the key if it empties.
fn remove_subscription<K, H>(
    map: &mut HashMap<K, Vec<(SubscriptionId, H)>>,
    id: SubscriptionId,
) -> bool {
    let mut removed = false;
    map.retain(|_, subs| {
        if !removed
            && let Some(pos) = subs.iter().position(|(sid, _)| *sid == id)
        {
            subs.remove(pos);
            removed = true;
        }
        !subs.is_empty()
    });
    removed
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("typed_keys", &lock(&self.typed).len())
            .field("named_keys", &lock(&self.named).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct ScoreChanged {
        score: u32,
    }

    #[test]
    fn test_typed_publish_reaches_subscriber() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_by_handler = Arc::clone(&seen);
        bus.subscribe::<ScoreChanged>(move |event| {
            seen_by_handler.lock().unwrap().push(event.score);
        });

        bus.publish(&ScoreChanged { score: 7 });
        bus.publish(&ScoreChanged { score: 9 });

        assert_eq!(*seen.lock().unwrap(), vec![7, 9]);
    }

    #[test]
    fn test_typed_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            bus.subscribe::<ScoreChanged>(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }

        bus.publish(&ScoreChanged { score: 1 });
        assert_eq!(hits.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(&ScoreChanged { score: 1 });
        bus.publish_named("nobody-listens");
    }

    #[test]
    fn test_events_are_partitioned_by_type() {
        #[derive(Debug)]
        struct Other;

        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_in_handler = Arc::clone(&hits);
        bus.subscribe::<ScoreChanged>(move |_| {
            hits_in_handler.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish(&Other);
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unsubscribe_typed_stops_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_in_handler = Arc::clone(&hits);
        let id = bus.subscribe::<ScoreChanged>(move |_| {
            hits_in_handler.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish(&ScoreChanged { score: 1 });
        assert!(bus.unsubscribe(id));
        bus.publish(&ScoreChanged { score: 2 });

        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(bus.subscriber_count::<ScoreChanged>(), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_token_returns_false() {
        let bus = EventBus::new();
        let id = bus.subscribe::<ScoreChanged>(|_| {});
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_named_signal_roundtrip() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_in_handler = Arc::clone(&hits);
        let id = bus.subscribe_named("level.loaded", move || {
            hits_in_handler.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish_named("level.loaded");
        bus.publish_named("level.unloaded");
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        assert!(bus.unsubscribe(id));
        bus.publish_named("level.loaded");
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(bus.named_subscriber_count("level.loaded"), 0);
    }

    #[test]
    fn test_subscribe_during_dispatch_takes_effect_next_publish() {
        let bus = Arc::new(EventBus::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let bus_in_handler = Arc::clone(&bus);
        let late_hits_outer = Arc::clone(&late_hits);
        bus.subscribe::<ScoreChanged>(move |_| {
            let late_hits_inner = Arc::clone(&late_hits_outer);
            bus_in_handler.subscribe::<ScoreChanged>(move |_| {
                late_hits_inner.fetch_add(1, Ordering::Relaxed);
            });
        });

        bus.publish(&ScoreChanged { score: 1 });
        assert_eq!(late_hits.load(Ordering::Relaxed), 0);

        bus.publish(&ScoreChanged { score: 2 });
        assert_eq!(late_hits.load(Ordering::Relaxed), 1);
    }
}
