//! Bidirectional alias index.
//!
//! Maps an alias to exactly one canonical name and keeps the reverse
//! mapping so that all aliases of a name can be listed or dropped at once.
//! The catalog keeps one index for module aliases and the command table
//! keeps one per module for command aliases; the two are never merged.

use std::collections::HashMap;

use conch_types::error::{Result, ShellError};

/// Alias -> canonical name index with O(1) lookup.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    forward: HashMap<String, String>,
    reverse: HashMap<String, Vec<String>>,
}

impl AliasIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `alias` to `canonical`.
    ///
    /// Fails with `DuplicateAlias` if the alias is already mapped, even to
    /// the same canonical name.
    pub fn insert(&mut self, alias: &str, canonical: &str) -> Result<()> {
        if let Some(owner) = self.forward.get(alias) {
            return Err(ShellError::DuplicateAlias {
                alias: alias.to_string(),
                owner: owner.clone(),
            });
        }
        self.forward.insert(alias.to_string(), canonical.to_string());
        self.reverse
            .entry(canonical.to_string())
            .or_default()
            .push(alias.to_string());
        Ok(())
    }

    /// Canonical name for `alias`, if mapped.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.forward.get(alias).map(String::as_str)
    }

    /// Whether `alias` is mapped.
    pub fn contains(&self, alias: &str) -> bool {
        self.forward.contains_key(alias)
    }

    /// Aliases pointing at `canonical`, in insertion order.
    pub fn aliases_of(&self, canonical: &str) -> &[String] {
        self.reverse.get(canonical).map_or(&[], Vec::as_slice)
    }

    /// Drop every alias of `canonical`, returning them.
    pub fn remove_canonical(&mut self, canonical: &str) -> Vec<String> {
        let removed = self.reverse.remove(canonical).unwrap_or_default();
        for alias in &removed {
            self.forward.remove(alias);
        }
        removed
    }

    /// All `(alias, canonical)` pairs, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the index holds no aliases.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
