//! Session Manager
//!
//! Owns the one active session id the backend uses to scope a conversation.
//! Ids look like `session_<unix-millis>_<9 base36 chars>`.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Allocate a fresh session id (time prefix + random suffix)
pub fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Holds the current session id. Exactly one is active at a time.
#[derive(Debug, Clone)]
pub struct SessionManager {
    current: String,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            current: new_session_id(),
        }
    }

    /// Start from a known id (resuming, or in tests)
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { current: id.into() }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Discard the current id and allocate a new one. The new id never
    /// equals the one it replaces.
    pub fn reset(&mut self) -> &str {
        let mut next = new_session_id();
        while next == self.current {
            next = new_session_id();
        }
        tracing::info!(old = %self.current, new = %next, "Session id rotated");
        self.current = next;
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_id_shape() {
        let id = new_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_session_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_reset_changes_id() {
        let mut session = SessionManager::with_id("session_1_abc");
        let before = session.current().to_string();
        let after = session.reset().to_string();
        assert_ne!(before, after);
        assert_eq!(session.current(), after);
    }

    proptest! {
        #[test]
        fn prop_resets_never_repeat_an_id(resets in 1usize..50) {
            let mut session = SessionManager::new();
            let mut seen = HashSet::new();
            seen.insert(session.current().to_string());
            for _ in 0..resets {
                prop_assert!(seen.insert(session.reset().to_string()));
            }
        }
    }
}
