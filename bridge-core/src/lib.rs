/*!
# Bridge Core

Keeps the transient state of short-lived objects alive across their destruction
and recreation, without pushing large payloads through the host's size-limited
saved-state channel.

Only a small identity token travels in the host's carrier. The state itself is
kept in memory, mirrored to a persistent key-value store, and handed back to the
recreated object exactly once.

## Architecture

- [`IdentityTracker`] maps live objects to [`Token`]s by `Arc` identity, never
  keeping them alive
- [`carrier`] writes and reads the token in the caller's carrier
- [`StateStore`] holds blobs in memory and on disk behind a [`PreferenceStore`]
- [`LifecycleGovernor`] watches host lifecycle events to decide when clears may
  take effect and when stale state from a previous process must be wiped
- [`Bridge`] is the public facade over all of the above

## Usage

```rust
use std::collections::BTreeMap;
use std::sync::Arc;
use bridge_core::{Bridge, BridgeConfig, LifecycleDispatcher, Target};

struct SearchScreen;
impl Target for SearchScreen {
    fn declared_type_name() -> &'static str {
        "app.SearchScreen"
    }
}

let host = Arc::new(LifecycleDispatcher::new());
let mut bridge = Bridge::new();
bridge.initialize_from_config(&BridgeConfig::in_memory("screens"), host.clone())?;

// First screen of a fresh process
host.object_created(false);
let screen = Arc::new(SearchScreen);

// Rotation: save, tear down, recreate
let mut saved_state: BTreeMap<String, String> = BTreeMap::new();
bridge.save_instance_state(&screen, &mut saved_state, |blob| {
    blob.put("query", "weak references")
})?;
host.object_destroyed(false);
drop(screen);

host.object_created(true);
let recreated = Arc::new(SearchScreen);
bridge.restore_instance_state(&recreated, Some(&saved_state), |blob| {
    assert_eq!(blob.get::<String>("query").as_deref(), Some("weak references"));
    Ok(())
})?;
# Ok::<(), bridge_core::BridgeError>(())
```
*/

pub mod blob;
pub mod bridge;
pub mod carrier;
pub mod codec;
pub mod compression;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod metadata;
pub mod observability;
pub mod storage;
pub mod store;

#[cfg(test)]
mod error_tests;

pub use blob::StateBlob;
pub use bridge::Bridge;
pub use carrier::Carrier;
pub use codec::{BlobCodec, EnvelopeCodec};
pub use compression::{CompressionAdapter, GzipCompressor, NoCompression};
pub use config::{BridgeConfig, CompressionKind, StorageBackend};
pub use engine::{BridgeContext, BridgeEngine};
pub use error::{BridgeError, Result};
pub use identity::{IdentityTracker, Target, Token};
pub use lifecycle::{
    GovernorAction, LifecycleDispatcher, LifecycleEvent, LifecycleGovernor, LifecycleHost,
    LifecycleObserver, SubscriptionId,
};
pub use metadata::EntryMetadata;
pub use storage::{LocalFileStore, MemoryStore, PreferenceStore};
pub use store::StateStore;
