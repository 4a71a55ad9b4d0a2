//! Walks a screen through a rotation and a process restart, printing what the
//! bridge keeps where.
//!
//! Run with `RUST_LOG=bridge=debug cargo run --example rotation`.

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge_core::{Bridge, BridgeConfig, LifecycleDispatcher, PreferenceStore, Target};

struct InboxScreen {
    unread: Vec<u32>,
}

impl Target for InboxScreen {
    fn declared_type_name() -> &'static str {
        "demo.InboxScreen"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = std::env::temp_dir().join("bridge-rotation-demo");
    let config = BridgeConfig::local(&dir);
    let store = config.open_store()?;

    let host = Arc::new(LifecycleDispatcher::new());
    let mut bridge = Bridge::new();
    bridge.initialize_from_config(&config, host.clone())?;

    host.object_created(false);
    let screen = Arc::new(InboxScreen {
        unread: (1..=500).collect(),
    });

    let mut saved_state: BTreeMap<String, String> = BTreeMap::new();
    bridge.save_instance_state(&screen, &mut saved_state, |blob| {
        blob.put("unread", &screen.unread)
    })?;
    println!("carrier after save: {saved_state:?}");
    println!("persisted keys: {:?}", store.keys()?);

    // Rotation
    host.object_destroyed(false);
    drop(screen);
    host.object_created(true);

    let recreated = Arc::new(InboxScreen { unread: Vec::new() });
    let mut unread: Vec<u32> = Vec::new();
    bridge.restore_instance_state(&recreated, Some(&saved_state), |blob| {
        unread = blob.get("unread").unwrap_or_default();
        Ok(())
    })?;
    println!(
        "restored {} unread ids (screen started with {})",
        unread.len(),
        recreated.unread.len()
    );
    println!("persisted keys after restore: {:?}", store.keys()?);

    host.object_destroyed(true);
    bridge.clear(&recreated);
    Ok(())
}
