/*!
The bridge engine: composes identity tracking, the carrier codec, the two-tier
store and the lifecycle governor behind one lock.

An engine subscribes to its lifecycle host when built and unsubscribes when
dropped. Caller callbacks always run with the lock released, so a callback may
call back into the engine.
*/

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use crate::carrier::{self, Carrier};
use crate::codec::{BlobCodec, EnvelopeCodec};
use crate::identity::{IdentityTracker, Target, Token};
use crate::lifecycle::{
    GovernorAction, LifecycleEvent, LifecycleGovernor, LifecycleHost, LifecycleObserver,
    SubscriptionId,
};
use crate::storage::PreferenceStore;
use crate::store::StateStore;
use crate::{Result, StateBlob};

#[cfg(feature = "metrics")]
use crate::observability::BridgeMetrics;

/// Collaborators an engine is bound to
pub struct BridgeContext {
    pub store: Arc<dyn PreferenceStore>,
    pub codec: Box<dyn BlobCodec>,
    pub host: Arc<dyn LifecycleHost>,
}

impl BridgeContext {
    /// Bind `store` and `host` with the default gzip envelope codec
    pub fn new(store: Arc<dyn PreferenceStore>, host: Arc<dyn LifecycleHost>) -> Self {
        Self {
            store,
            codec: Box::new(EnvelopeCodec::gzip()),
            host,
        }
    }

    pub fn with_codec<B: BlobCodec + 'static>(mut self, codec: B) -> Self {
        self.codec = Box::new(codec);
        self
    }
}

struct EngineState {
    tracker: IdentityTracker,
    store: StateStore,
    governor: LifecycleGovernor,
}

impl EngineState {
    fn apply(&mut self, event: &LifecycleEvent) {
        if self.governor.handle(event) == GovernorAction::WipeAll {
            #[cfg(feature = "metrics")]
            BridgeMetrics::global().record_startup_wipe();

            info!("Fresh start detected, wiping state left by a previous process");
            self.clear_all();
        }
    }

    fn clear_all(&mut self) {
        self.store.clear_all();
        self.tracker.clear();
    }
}

/// Lifecycle subscription feeding events into the engine's governor
struct GovernorObserver {
    state: Weak<Mutex<EngineState>>,
}

impl LifecycleObserver for GovernorObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        if let Some(state) = self.state.upgrade() {
            lock(&state).apply(event);
        }
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Save, restore and eviction logic for one initialised bridge
pub struct BridgeEngine {
    state: Arc<Mutex<EngineState>>,
    host: Arc<dyn LifecycleHost>,
    subscription: SubscriptionId,
}

impl BridgeEngine {
    /// Build an engine over `context` and subscribe it to the context's host
    pub fn new(context: BridgeContext) -> Self {
        let BridgeContext { store, codec, host } = context;
        let namespace = store.namespace().to_string();

        let state = Arc::new(Mutex::new(EngineState {
            tracker: IdentityTracker::new(),
            store: StateStore::new(store, codec),
            governor: LifecycleGovernor::new(),
        }));
        let observer = GovernorObserver {
            state: Arc::downgrade(&state),
        };
        let subscription = host.subscribe(Arc::new(observer));

        info!(namespace = %namespace, "Bridge engine initialized");
        Self {
            state,
            host,
            subscription,
        }
    }

    /// Save `target`'s state and record its token in `carrier`
    ///
    /// The token is written to the carrier before `produce` runs. If `produce`
    /// fails, its error is returned and nothing is stored.
    pub fn save<T, C, F>(&self, target: &Arc<T>, carrier: &mut C, produce: F) -> Result<()>
    where
        T: Target,
        C: Carrier + ?Sized,
        F: FnOnce(&mut StateBlob) -> Result<()>,
    {
        let token = {
            let mut state = self.lock();
            match state.tracker.get_token(target) {
                Some(token) => token,
                None => {
                    let token = Token::generate();
                    state.tracker.assign(target, token.clone());
                    token
                }
            }
        };
        carrier::write_token(carrier, T::declared_type_name(), &token);

        let mut blob = StateBlob::new();
        produce(&mut blob)?;

        #[cfg(feature = "metrics")]
        BridgeMetrics::global().record_save();

        debug!(%token, type_name = T::declared_type_name(), "Saving instance state");
        self.lock().store.put(&token, blob);
        Ok(())
    }

    /// Restore `target`'s state, handing the blob to `consume`
    ///
    /// A live association for `target` wins over the token in `carrier`. The
    /// entry is consumed before `consume` runs.
    ///
    /// # Returns
    /// Whether a blob was found and passed to `consume`
    pub fn restore<T, C, F>(&self, target: &Arc<T>, carrier: Option<&C>, consume: F) -> Result<bool>
    where
        T: Target,
        C: Carrier + ?Sized,
        F: FnOnce(StateBlob) -> Result<()>,
    {
        let type_name = T::declared_type_name();
        let blob = {
            let mut state = self.lock();
            let token = match state.tracker.get_token(target) {
                Some(token) => token,
                None => match carrier::read_token(carrier, type_name) {
                    Some(token) => token,
                    None => {
                        debug!(type_name, "No token to restore from");
                        return Ok(false);
                    }
                },
            };
            state.tracker.assign(target, token.clone());

            let blob = state.store.take(&token);
            debug!(%token, type_name, found = blob.is_some(), "Restoring instance state");
            blob
        };

        #[cfg(feature = "metrics")]
        BridgeMetrics::global().record_restore(blob.is_some());

        match blob {
            Some(blob) => {
                consume(blob)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Discard `target`'s state, unless a transient teardown is in progress
    pub fn clear<T: Target>(&self, target: &Arc<T>) {
        let mut state = self.lock();
        if !state.governor.eviction_permitted() {
            debug!(
                type_name = T::declared_type_name(),
                "Ignoring clear while eviction is suspended"
            );
            return;
        }

        if let Some(token) = state.tracker.remove(target) {
            state.store.clear(&token);
        }
    }

    /// Drop every tracked association and wipe both store tiers
    pub fn clear_all(&self) {
        self.lock().clear_all();
    }

    pub fn eviction_permitted(&self) -> bool {
        self.lock().governor.eviction_permitted()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock(&self.state)
    }
}

impl Drop for BridgeEngine {
    fn drop(&mut self) {
        self.host.unsubscribe(self.subscription);
    }
}

impl fmt::Debug for BridgeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BridgeEngine")
            .field("tracker", &state.tracker)
            .field("memory_entries", &state.store.memory_len())
            .field("governor", &state.governor)
            .finish()
    }
}
