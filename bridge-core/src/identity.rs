/*!
Identity tracking for bridged objects.

Each tracked object is associated with a [`Token`] by the identity of its `Arc`
allocation, never by value. The tracker only keeps `Weak` handles, so tracking an
object never extends its lifetime; once every strong handle is gone the entry is
dead and is reclaimed on the next sweep.
*/

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier shared by an object and its recreated successors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Mint a fresh, globally unique token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An object whose transient state can be routed through the bridge.
///
/// The declared type name keys the token inside the tracking carrier, so it must
/// stay the same between the build that saved the carrier and the build that
/// restores it. The default uses [`std::any::type_name`], whose output is not
/// guaranteed across compiler releases; override it for long-lived carriers.
pub trait Target: Any + Send + Sync {
    fn declared_type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Address of the allocation behind an `Arc`, ignoring any pointer metadata
fn address_of<T: ?Sized>(ptr: *const T) -> usize {
    ptr as *const () as usize
}

struct TrackedEntry {
    target: Weak<dyn Any + Send + Sync>,
    token: Token,
}

impl TrackedEntry {
    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

/// Identity-keyed, non-owning association from live objects to tokens
#[derive(Default)]
pub struct IdentityTracker {
    entries: HashMap<usize, TrackedEntry>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token currently associated with `target`, if any
    pub fn get_token<T: Target>(&self, target: &Arc<T>) -> Option<Token> {
        self.entries
            .get(&address_of(Arc::as_ptr(target)))
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.token.clone())
    }

    /// Associate `target` with `token`, replacing any previous association.
    ///
    /// Dead entries are swept first so an address reused by a new allocation
    /// never inherits a stale token.
    pub fn assign<T: Target>(&mut self, target: &Arc<T>, token: Token) {
        self.sweep();
        let weak: Weak<T> = Arc::downgrade(target);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        self.entries.insert(
            address_of(Arc::as_ptr(target)),
            TrackedEntry {
                target: weak,
                token,
            },
        );
    }

    /// Drop the association for `target`, returning its token
    pub fn remove<T: Target>(&mut self, target: &Arc<T>) -> Option<Token> {
        let address = address_of(Arc::as_ptr(target));
        let entry = self.entries.remove(&address)?;
        entry.is_alive().then_some(entry.token)
    }

    /// Reclaim entries whose objects have been dropped. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_alive());
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of associations whose objects are still alive
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_alive()).count()
    }
}

impl fmt::Debug for IdentityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityTracker")
            .field("live", &self.live_count())
            .field("tracked", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Screen {
        title: &'static str,
    }

    impl Target for Screen {}

    struct NamedScreen;

    impl Target for NamedScreen {
        fn declared_type_name() -> &'static str {
            "app.NamedScreen"
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(Token::generate(), Token::generate());
    }

    #[test]
    fn test_assign_and_get() {
        let mut tracker = IdentityTracker::new();
        let screen = Arc::new(Screen { title: "home" });
        let token = Token::generate();

        tracker.assign(&screen, token.clone());
        assert_eq!(tracker.get_token(&screen), Some(token.clone()));

        // A clone of the Arc is the same object
        let same = Arc::clone(&screen);
        assert_eq!(tracker.get_token(&same), Some(token));
    }

    #[test]
    fn test_equal_values_are_tracked_independently() {
        let mut tracker = IdentityTracker::new();
        let first = Arc::new(Screen { title: "home" });
        let second = Arc::new(Screen { title: "home" });
        assert_eq!(*first, *second);

        tracker.assign(&first, Token::from("first"));
        assert_eq!(tracker.get_token(&second), None);

        tracker.assign(&second, Token::from("second"));
        assert_eq!(tracker.get_token(&first), Some(Token::from("first")));
        assert_eq!(tracker.get_token(&second), Some(Token::from("second")));
    }

    #[test]
    fn test_reassign_replaces_token() {
        let mut tracker = IdentityTracker::new();
        let screen = Arc::new(Screen { title: "home" });

        tracker.assign(&screen, Token::from("old"));
        tracker.assign(&screen, Token::from("new"));

        assert_eq!(tracker.get_token(&screen), Some(Token::from("new")));
        assert_eq!(tracker.live_count(), 1);
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let mut tracker = IdentityTracker::new();
        let screen = Arc::new(Screen { title: "home" });

        assert_eq!(tracker.remove(&screen), None);
    }

    #[test]
    fn test_remove_returns_token() {
        let mut tracker = IdentityTracker::new();
        let screen = Arc::new(Screen { title: "home" });
        tracker.assign(&screen, Token::from("t1"));

        assert_eq!(tracker.remove(&screen), Some(Token::from("t1")));
        assert_eq!(tracker.get_token(&screen), None);
    }

    #[test]
    fn test_tracking_does_not_extend_lifetime() {
        let mut tracker = IdentityTracker::new();
        let screen = Arc::new(Screen { title: "home" });
        let weak = Arc::downgrade(&screen);
        tracker.assign(&screen, Token::generate());

        drop(screen);

        assert!(weak.upgrade().is_none());
        assert_eq!(tracker.live_count(), 0);
        assert_eq!(tracker.sweep(), 1);
    }

    #[test]
    fn test_dropped_target_does_not_leak_token_to_new_allocation() {
        let mut tracker = IdentityTracker::new();
        for _ in 0..64 {
            let screen = Arc::new(Screen { title: "transient" });
            tracker.assign(&screen, Token::generate());
        }

        let fresh = Arc::new(Screen { title: "fresh" });
        assert_eq!(tracker.get_token(&fresh), None);
    }

    #[test]
    fn test_declared_type_name() {
        assert!(Screen::declared_type_name().ends_with("Screen"));
        assert_eq!(NamedScreen::declared_type_name(), "app.NamedScreen");
    }
}
