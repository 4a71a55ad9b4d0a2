/*!
Public entry points of the state bridge.

A [`Bridge`] starts uninitialised. Every call except [`Bridge::clear_all`] requires
[`Bridge::initialize`] first; calling them earlier is a programming error and
panics, since carrying on would silently lose state.
*/

use std::sync::Arc;

use crate::carrier::Carrier;
use crate::config::BridgeConfig;
use crate::engine::{BridgeContext, BridgeEngine};
use crate::identity::Target;
use crate::lifecycle::LifecycleHost;
use crate::{Result, StateBlob};

/// Saves and restores object state outside the host's size-limited state channel
///
/// Owned by the application entry point and handed to whatever needs it.
///
/// # Example
/// ```rust
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use bridge_core::{Bridge, BridgeContext, LifecycleDispatcher, MemoryStore, Target};
///
/// struct Screen;
/// impl Target for Screen {}
///
/// let host = Arc::new(LifecycleDispatcher::new());
/// let mut bridge = Bridge::new();
/// bridge.initialize(BridgeContext::new(Arc::new(MemoryStore::default()), host.clone()));
///
/// let screen = Arc::new(Screen);
/// let mut carrier: BTreeMap<String, String> = BTreeMap::new();
/// bridge.save_instance_state(&screen, &mut carrier, |blob| blob.put("x", 1))?;
///
/// let recreated = Arc::new(Screen);
/// bridge.restore_instance_state(&recreated, Some(&carrier), |blob| {
///     assert_eq!(blob.get::<i64>("x"), Some(1));
///     Ok(())
/// })?;
/// # Ok::<(), bridge_core::BridgeError>(())
/// ```
#[derive(Debug, Default)]
pub struct Bridge {
    engine: Option<BridgeEngine>,
}

impl Bridge {
    /// Create an uninitialised bridge
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the bridge to `context`, replacing any engine bound earlier
    ///
    /// In-memory state held by a replaced engine is lost. Persisted state is kept
    /// and is picked up by the new engine when a matching token is restored.
    pub fn initialize(&mut self, context: BridgeContext) {
        self.engine = Some(BridgeEngine::new(context));
    }

    /// Build the context from `config` and initialise with it
    ///
    /// # Errors
    /// Invalid configuration or a store that cannot be opened
    pub fn initialize_from_config(
        &mut self,
        config: &BridgeConfig,
        host: Arc<dyn LifecycleHost>,
    ) -> Result<()> {
        let context = BridgeContext {
            store: config.open_store()?,
            codec: Box::new(config.build_codec()?),
            host,
        };
        self.initialize(context);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Discard `target`'s saved state, unless the host is recreating objects
    ///
    /// # Panics
    /// If the bridge has not been initialised
    pub fn clear<T: Target>(&self, target: &Arc<T>) {
        self.engine("clear").clear(target);
    }

    /// Discard all saved state in memory and on disk. A no-op before initialisation.
    pub fn clear_all(&self) {
        if let Some(engine) = &self.engine {
            engine.clear_all();
        }
    }

    /// Restore `target`'s state using the token recorded in `carrier`
    ///
    /// `consume` runs only when saved state is found, and the state is gone from
    /// the bridge once it has been handed over.
    ///
    /// A `None` carrier does not short-circuit: if `target` itself was saved
    /// earlier in this process, its live association is still used.
    ///
    /// # Returns
    /// Whether `consume` was invoked
    ///
    /// # Panics
    /// If the bridge has not been initialised
    pub fn restore_instance_state<T, C, F>(
        &self,
        target: &Arc<T>,
        carrier: Option<&C>,
        consume: F,
    ) -> Result<bool>
    where
        T: Target,
        C: Carrier + ?Sized,
        F: FnOnce(StateBlob) -> Result<()>,
    {
        self.engine("restore_instance_state")
            .restore(target, carrier, consume)
    }

    /// Save the state `produce` writes for `target` and record its token in `carrier`
    ///
    /// # Panics
    /// If the bridge has not been initialised
    pub fn save_instance_state<T, C, F>(
        &self,
        target: &Arc<T>,
        carrier: &mut C,
        produce: F,
    ) -> Result<()>
    where
        T: Target,
        C: Carrier + ?Sized,
        F: FnOnce(&mut StateBlob) -> Result<()>,
    {
        self.engine("save_instance_state")
            .save(target, carrier, produce)
    }

    /// Whether single-target clears currently take effect
    ///
    /// # Panics
    /// If the bridge has not been initialised
    pub fn eviction_permitted(&self) -> bool {
        self.engine("eviction_permitted").eviction_permitted()
    }

    fn engine(&self, operation: &str) -> &BridgeEngine {
        match &self.engine {
            Some(engine) => engine,
            None => panic!("You must first call initialize before calling {operation}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleDispatcher;
    use crate::storage::MemoryStore;
    use std::collections::BTreeMap;

    struct Screen;

    impl Target for Screen {}

    fn initialized_bridge() -> (Bridge, MemoryStore, Arc<LifecycleDispatcher>) {
        let disk = MemoryStore::new("test");
        let host = Arc::new(LifecycleDispatcher::new());
        let mut bridge = Bridge::new();
        bridge.initialize(BridgeContext::new(Arc::new(disk.clone()), host.clone()));
        (bridge, disk, host)
    }

    #[test]
    #[should_panic(expected = "You must first call initialize before calling save_instance_state")]
    fn test_save_before_initialize_panics() {
        let bridge = Bridge::new();
        let mut carrier: BTreeMap<String, String> = BTreeMap::new();
        let _ = bridge.save_instance_state(&Arc::new(Screen), &mut carrier, |_| Ok(()));
    }

    #[test]
    #[should_panic(expected = "restore_instance_state")]
    fn test_restore_before_initialize_panics() {
        let bridge = Bridge::new();
        let _ = bridge.restore_instance_state::<_, BTreeMap<String, String>, _>(
            &Arc::new(Screen),
            None,
            |_| Ok(()),
        );
    }

    #[test]
    #[should_panic(expected = "clear")]
    fn test_clear_before_initialize_panics() {
        Bridge::new().clear(&Arc::new(Screen));
    }

    #[test]
    fn test_clear_all_before_initialize_is_noop() {
        let bridge = Bridge::new();
        bridge.clear_all();
        assert!(!bridge.is_initialized());
    }

    #[test]
    fn test_reinitialize_replaces_engine() {
        let (mut bridge, disk, host) = initialized_bridge();
        let screen = Arc::new(Screen);
        let mut carrier: BTreeMap<String, String> = BTreeMap::new();
        bridge
            .save_instance_state(&screen, &mut carrier, |blob| blob.put("x", 1))
            .unwrap();

        bridge.initialize(BridgeContext::new(Arc::new(disk.clone()), host.clone()));
        assert_eq!(host.subscriber_count(), 1);

        // Memory tier is gone, the disk tier still answers
        let mut restored = None;
        bridge
            .restore_instance_state(&screen, Some(&carrier), |blob| {
                restored = blob.get::<i64>("x");
                Ok(())
            })
            .unwrap();
        assert_eq!(restored, Some(1));
    }

    #[test]
    fn test_initialize_from_config() {
        let mut bridge = Bridge::new();
        let host = Arc::new(LifecycleDispatcher::new());

        bridge
            .initialize_from_config(&BridgeConfig::in_memory("test"), host.clone())
            .unwrap();

        assert!(bridge.is_initialized());
        assert_eq!(host.subscriber_count(), 1);
        assert!(!bridge.eviction_permitted());
    }
}
