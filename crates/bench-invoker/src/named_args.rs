//! Saved argument choices for a panel.
//!
//! A small name-to-arguments table the user can pick from instead of
//! retyping. Every table starts with `help = -h`.

use std::collections::BTreeMap;

/// Name of the entry every table is seeded with.
pub const HELP_KEY: &str = "help";

/// Arguments the help entry expands to.
pub const HELP_ARGS: &str = "-h";

/// Name-to-arguments table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedArgs {
    entries: BTreeMap<String, String>,
}

impl Default for NamedArgs {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        let _ = entries.insert(HELP_KEY.to_string(), HELP_ARGS.to_string());
        Self { entries }
    }
}

impl NamedArgs {
    /// Table holding only the help entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments stored under `key`. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key.trim())
            .map(String::as_str)
            .filter(|args| !args.is_empty())
    }

    /// Store trimmed `args` under trimmed `key`. A blank key is ignored.
    pub fn save(&mut self, key: &str, args: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        let _ = self.entries.insert(key.to_string(), args.trim().to_string());
        true
    }

    /// Remove the entry under `key`.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key.trim()).is_some()
    }

    /// Entry names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
