//! API key configuration and round-robin rotation.

use crate::error::{CopyStudioError, Result};

/// Environment variables checked for Gemini API keys, in order.
pub const KEY_ENV_VARS: [&str; 5] = [
    "GEMINI_KEY_1",
    "GEMINI_KEY_2",
    "GEMINI_KEY_3",
    "GEMINI_KEY_4",
    "GEMINI_KEY_5",
];

/// Hands out API keys in strict round-robin order, one per request.
///
/// Owns its cursor; the caller that performs generation requests holds
/// the single instance, so the rotation survives across batch runs.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    cursor: usize,
}

impl KeyRotator {
    /// Builds a rotator from a list of keys. Blank entries are dropped;
    /// an empty result is a fatal configuration error.
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .filter(|key| !key.trim().is_empty())
            .collect();

        if keys.is_empty() {
            return Err(CopyStudioError::Auth(format!(
                "no Gemini API key found: set {} through {}",
                KEY_ENV_VARS[0],
                KEY_ENV_VARS[KEY_ENV_VARS.len() - 1]
            )));
        }

        Ok(KeyRotator { keys, cursor: 0 })
    }

    /// Reads keys from `GEMINI_KEY_1` through `GEMINI_KEY_5`.
    pub fn from_env() -> Result<Self> {
        let keys = KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .collect();
        Self::new(keys)
    }

    /// Returns the next key in cyclic order.
    pub fn next_key(&mut self) -> &str {
        let key = &self.keys[self.cursor];
        self.cursor = (self.cursor + 1) % self.keys.len();
        key
    }

    /// Number of keys in rotation.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotator(keys: &[&str]) -> KeyRotator {
        KeyRotator::new(keys.iter().map(|k| k.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_round_robin_order() {
        let mut keys = rotator(&["a", "b", "c"]);
        let calls: Vec<String> = (0..7).map(|_| keys.next_key().to_string()).collect();
        assert_eq!(calls, ["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_cyclic_property() {
        // Call i and call i + len yield the same key, for every i.
        let mut keys = rotator(&["k1", "k2", "k3", "k4"]);
        let len = keys.key_count();
        let calls: Vec<String> = (0..len * 3).map(|_| keys.next_key().to_string()).collect();
        for i in 0..len * 2 {
            assert_eq!(calls[i], calls[i + len]);
        }
    }

    #[test]
    fn test_single_key() {
        let mut keys = rotator(&["only"]);
        assert_eq!(keys.next_key(), "only");
        assert_eq!(keys.next_key(), "only");
    }

    #[test]
    fn test_blank_keys_are_dropped() {
        let keys = rotator(&["a", "", "  ", "b"]);
        assert_eq!(keys.key_count(), 2);
    }

    #[test]
    fn test_no_keys_is_an_error() {
        let result = KeyRotator::new(vec!["".into(), "   ".into()]);
        assert!(matches!(result, Err(CopyStudioError::Auth(_))));
    }
}
