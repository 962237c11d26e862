//! Access key allow-list.
//!
//! Keys are stored upper-case; candidates are upper-cased before lookup, so
//! comparison is case-insensitive.

use std::collections::HashSet;

/// Compiled-in access keys.
pub(crate) const BUILTIN_KEYS: [&str; 52] = [
    "A7K2M9", "B3X8Q1", "C5N4T7", "D9R2W6", "E1H6P3", "F8J3L5", "G2V7Y4", "H6C1Z8",
    "J4M8D2", "K9T5F1", "L3W2B7", "M7Q6N4", "N1Z9G5", "P5D3R8", "Q8F7K2", "R2L4H9",
    "S6B1X3", "T9G8C6", "U3Y5J1", "V7P2M4", "W1K6T8", "X4R9D5", "Y8H3Q7", "Z2N7F6",
    "AB12CD", "EF34GH", "JK56LM", "NP78QR", "ST90UV", "WX13YZ", "QA7P3K", "MZ4R8T",
    "HX2C6V", "LB9N1W", "GD5J7S", "KF3T2Y", "PW8M4E", "RC1V9A", "TN6Q5H", "YJ2L8B",
    "UE7D3G", "VS4K9X", "ZM1F6C", "BH8W2N", "CJ5R7P", "DL3Y1Q", "FK9B4M", "GT6X8W",
    "HQ2Z5R", "JV7C1T", "KN4P6D", "LW8G3F",
];

/// Immutable set of valid access keys.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    keys: HashSet<String>,
}

impl KeyRegistry {
    /// The compiled-in allow-list.
    pub fn builtin() -> Self {
        Self::from_keys(BUILTIN_KEYS)
    }

    /// Build a registry from an arbitrary list. Entries are trimmed and
    /// upper-cased; blank entries are dropped.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keys }
    }

    /// Whether the upper-cased candidate is in the allow-list.
    pub fn is_valid_key(&self, candidate: &str) -> bool {
        self.keys.contains(&candidate.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
