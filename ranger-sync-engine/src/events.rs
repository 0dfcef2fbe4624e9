//! Feed property change delivery.
//!
//! [`EventSource`] is the subscription port the dispatcher attaches to;
//! [`EventBus`] is the in-process implementation used by the daemon.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ranger_sync_core::FeedPropertyChangeEvent;

use crate::error::DispatchError;

/// Receives feed property change events.
pub trait FeedPropertyChangeListener: Send + Sync {
    fn notify(&self, event: &FeedPropertyChangeEvent) -> Result<(), DispatchError>;
}

/// Something listeners can attach to and detach from.
pub trait EventSource {
    fn subscribe(&self, listener: Arc<dyn FeedPropertyChangeListener>);

    /// Remove `listener` if it is subscribed; identity is by allocation.
    fn unsubscribe(&self, listener: &Arc<dyn FeedPropertyChangeListener>);
}

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Arc<dyn FeedPropertyChangeListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `event` to every subscribed listener in subscription order.
    ///
    /// Every listener is notified even when an earlier one fails; the
    /// first failure is returned. On success returns the number of
    /// listeners notified.
    pub fn publish(&self, event: &FeedPropertyChangeEvent) -> Result<usize, DispatchError> {
        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<_> = self.lock().clone();
        let mut first_error = None;
        for listener in &listeners {
            if let Err(err) = listener.notify(event) {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(listeners.len()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn FeedPropertyChangeListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSource for EventBus {
    fn subscribe(&self, listener: Arc<dyn FeedPropertyChangeListener>) {
        self.lock().push(listener);
    }

    fn unsubscribe(&self, listener: &Arc<dyn FeedPropertyChangeListener>) {
        self.lock().retain(|l| !same_listener(l, listener));
    }
}

fn same_listener(
    a: &Arc<dyn FeedPropertyChangeListener>,
    b: &Arc<dyn FeedPropertyChangeListener>,
) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ranger_sync_core::PropertySnapshot;

    use super::*;
    use crate::error::SyncError;

    struct Counting {
        seen: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl FeedPropertyChangeListener for Counting {
        fn notify(&self, event: &FeedPropertyChangeEvent) -> Result<(), DispatchError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DispatchError::new(
                    event.feed(),
                    SyncError::Validation("boom".to_string()),
                ));
            }
            Ok(())
        }
    }

    fn event() -> FeedPropertyChangeEvent {
        FeedPropertyChangeEvent {
            feed_category: "sales".to_string(),
            feed_name: "orders".to_string(),
            hadoop_security_group_names: None,
            old_properties: PropertySnapshot::default(),
            new_properties: PropertySnapshot::default(),
        }
    }

    #[test]
    fn failing_listener_does_not_starve_later_ones() {
        let bus = EventBus::new();
        let failing = Counting::new(true);
        let healthy = Counting::new(false);
        bus.subscribe(failing.clone());
        bus.subscribe(healthy.clone());

        let err = bus.publish(&event()).unwrap_err();

        assert_eq!(err.feed.to_string(), "sales.orders");
        assert_eq!(failing.seen.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let bus = EventBus::new();
        let a: Arc<dyn FeedPropertyChangeListener> = Counting::new(false);
        let b: Arc<dyn FeedPropertyChangeListener> = Counting::new(false);
        bus.subscribe(Arc::clone(&a));
        bus.subscribe(Arc::clone(&b));

        bus.unsubscribe(&a);

        assert_eq!(bus.listener_count(), 1);
        assert_eq!(bus.publish(&event()).expect("publish"), 1);
    }

    #[test]
    fn publish_without_listeners_is_a_no_op() {
        assert_eq!(EventBus::new().publish(&event()).expect("publish"), 0);
    }
}
