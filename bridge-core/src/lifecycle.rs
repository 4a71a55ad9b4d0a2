/*!
Host lifecycle events and the governor that turns them into eviction decisions.

The host reports creation and destruction of every object it manages, tracked or
not. From those coarse signals the [`LifecycleGovernor`] decides whether an
explicit clear may discard state (it must not during a transient teardown) and
whether persisted state left behind by a previous process should be wiped.
*/

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// A lifecycle notification from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An object was created. `restored` is true when the host is rebuilding it
    /// from saved state rather than starting fresh.
    Created { restored: bool },
    /// An object was torn down. `finishing` is true when it is gone for good and
    /// false when it is about to be recreated.
    Destroyed { finishing: bool },
}

/// Receiver of host lifecycle events
pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

/// Handle identifying one subscription on a [`LifecycleHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Host side of the lifecycle collaboration
pub trait LifecycleHost: Send + Sync {
    /// Start delivering events to `observer`
    fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> SubscriptionId;

    /// Stop delivering events for `id`. Returns false when `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-process lifecycle host that applications drive directly
///
/// # Example
/// ```rust
/// use bridge_core::LifecycleDispatcher;
///
/// let host = LifecycleDispatcher::new();
/// host.object_created(false);
/// host.object_destroyed(true);
/// assert_eq!(host.subscriber_count(), 0);
/// ```
#[derive(Default)]
pub struct LifecycleDispatcher {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn LifecycleObserver>)>>,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that an object was created
    pub fn object_created(&self, restored: bool) {
        self.dispatch(LifecycleEvent::Created { restored });
    }

    /// Report that an object was destroyed
    pub fn object_destroyed(&self, finishing: bool) {
        self.dispatch(LifecycleEvent::Destroyed { finishing });
    }

    /// Deliver `event` to every current subscriber
    ///
    /// Observers are called without the subscriber list locked, so an observer
    /// may subscribe or unsubscribe while handling an event.
    pub fn dispatch(&self, event: LifecycleEvent) {
        let observers: Vec<Arc<dyn LifecycleObserver>> = self
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        debug!(?event, subscribers = observers.len(), "Dispatching lifecycle event");
        for observer in observers {
            observer.on_event(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Arc<dyn LifecycleObserver>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleHost for LifecycleDispatcher {
    fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, observer));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }
}

impl fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Follow-up the governor asks its owner to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorAction {
    None,
    /// Wipe both store tiers and the identity map
    WipeAll,
}

/// Eviction gate driven by lifecycle events
#[derive(Debug, Clone, Default)]
pub struct LifecycleGovernor {
    eviction_permitted: bool,
    first_create_seen: bool,
}

impl LifecycleGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `event` and report what the owner must do in response
    pub fn handle(&mut self, event: &LifecycleEvent) -> GovernorAction {
        match *event {
            LifecycleEvent::Created { restored } => self.on_created(restored),
            LifecycleEvent::Destroyed { finishing } => {
                self.on_destroyed(finishing);
                GovernorAction::None
            }
        }
    }

    /// Any creation permits eviction. Only the first creation of the process can
    /// trigger a wipe, and only when the host is not restoring saved state.
    pub fn on_created(&mut self, restored: bool) -> GovernorAction {
        self.eviction_permitted = true;

        if self.first_create_seen {
            return GovernorAction::None;
        }
        self.first_create_seen = true;

        if restored {
            GovernorAction::None
        } else {
            GovernorAction::WipeAll
        }
    }

    /// A transient teardown suspends eviction until the next creation
    pub fn on_destroyed(&mut self, finishing: bool) {
        self.eviction_permitted = finishing;
    }

    pub fn eviction_permitted(&self) -> bool {
        self.eviction_permitted
    }

    pub fn first_create_seen(&self) -> bool {
        self.first_create_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl LifecycleObserver for RecordingObserver {
        fn on_event(&self, event: &LifecycleEvent) {
            self.events.lock().unwrap().push(*event);
        }
    }

    #[test]
    fn test_governor_initial_state() {
        let governor = LifecycleGovernor::new();
        assert!(!governor.eviction_permitted());
        assert!(!governor.first_create_seen());
    }

    #[test]
    fn test_fresh_first_create_wipes_once() {
        let mut governor = LifecycleGovernor::new();

        assert_eq!(governor.on_created(false), GovernorAction::WipeAll);
        assert!(governor.eviction_permitted());
        assert_eq!(governor.on_created(false), GovernorAction::None);
    }

    #[test]
    fn test_restored_first_create_does_not_wipe() {
        let mut governor = LifecycleGovernor::new();

        assert_eq!(governor.on_created(true), GovernorAction::None);
        assert!(governor.first_create_seen());
        // The first-create check is consumed even without a wipe
        assert_eq!(governor.on_created(false), GovernorAction::None);
    }

    #[test]
    fn test_destroy_sets_eviction_flag() {
        let mut governor = LifecycleGovernor::new();
        governor.on_created(true);

        governor.on_destroyed(false);
        assert!(!governor.eviction_permitted());

        governor.on_destroyed(true);
        assert!(governor.eviction_permitted());
    }

    #[test]
    fn test_create_after_transient_destroy_permits_eviction() {
        let mut governor = LifecycleGovernor::new();
        governor.handle(&LifecycleEvent::Created { restored: false });
        governor.handle(&LifecycleEvent::Destroyed { finishing: false });
        assert!(!governor.eviction_permitted());

        let action = governor.handle(&LifecycleEvent::Created { restored: true });
        assert_eq!(action, GovernorAction::None);
        assert!(governor.eviction_permitted());
    }

    #[test]
    fn test_dispatcher_delivers_to_subscribers() {
        let host = LifecycleDispatcher::new();
        let observer = Arc::new(RecordingObserver::default());
        host.subscribe(observer.clone());

        host.object_created(false);
        host.object_destroyed(true);

        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                LifecycleEvent::Created { restored: false },
                LifecycleEvent::Destroyed { finishing: true },
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let host = LifecycleDispatcher::new();
        let observer = Arc::new(RecordingObserver::default());
        let id = host.subscribe(observer.clone());

        assert!(host.unsubscribe(id));
        assert!(!host.unsubscribe(id));
        host.object_created(false);

        assert!(observer.events.lock().unwrap().is_empty());
        assert_eq!(host.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_ids_are_distinct() {
        let host = LifecycleDispatcher::new();
        let first = host.subscribe(Arc::new(RecordingObserver::default()));
        let second = host.subscribe(Arc::new(RecordingObserver::default()));

        assert_ne!(first, second);
        assert_eq!(host.subscriber_count(), 2);
    }
}
