//! Cache store: the entry mapping plus the insertion-order key sequence.
//!
//! The key sequence is the only source of ordering. It drives render iteration
//! and decides which entries are oldest when capacity overflows. After every
//! mutation the mapping is pruned to exactly the keys in the sequence.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::entry::{CacheEntry, EntryPatch, Identification};
use crate::error::KeepAliveError;

/// Extracts the owner key the host assigned to a subtree's root.
pub type OwnerOf<C> = dyn Fn(&C) -> Option<String> + Send + Sync;

/// Owner keys selected for bulk removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    One(String),
    Many(Vec<String>),
}

impl RemoveTarget {
    /// Whether `owner` is one of the targeted owner keys.
    pub fn matches(&self, owner: &str) -> bool {
        match self {
            RemoveTarget::One(name) => name == owner,
            RemoveTarget::Many(names) => names.iter().any(|name| name == owner),
        }
    }
}

impl From<&str> for RemoveTarget {
    fn from(name: &str) -> Self {
        RemoveTarget::One(name.to_string())
    }
}

impl From<String> for RemoveTarget {
    fn from(name: String) -> Self {
        RemoveTarget::One(name)
    }
}

impl From<Vec<String>> for RemoveTarget {
    fn from(names: Vec<String>) -> Self {
        RemoveTarget::Many(names)
    }
}

impl From<&[&str]> for RemoveTarget {
    fn from(names: &[&str]) -> Self {
        RemoveTarget::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl TryFrom<&Value> for RemoveTarget {
    type Error = KeepAliveError;

    /// Accepts a string or an array of strings; anything else is a caller contract violation.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(RemoveTarget::One(name.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(KeepAliveError::InvalidArgument(format!(
                        "remove target list must contain only strings, found {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(RemoveTarget::Many),
            other => Err(KeepAliveError::InvalidArgument(format!(
                "remove target must be a string or an array of strings, found {other}"
            ))),
        }
    }
}

impl TryFrom<Value> for RemoveTarget {
    type Error = KeepAliveError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        RemoveTarget::try_from(&value)
    }
}

/// Ordered cache of retained entries.
#[derive(Debug)]
pub struct CacheStore<C> {
    /// All entries indexed by identification.
    entries: HashMap<Identification, CacheEntry<C>>,

    /// Identifications in first-insertion order.
    keys: Vec<Identification>,
}

impl<C> Default for CacheStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CacheStore<C> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            keys: Vec::new(),
        }
    }

    /// Insert a new entry or shallow-merge into an existing one.
    ///
    /// New identifications are appended to the key sequence; existing ones keep
    /// their position. Returns `true` when the entry was created.
    pub fn upsert(&mut self, identification: &str, patch: EntryPatch<C>) -> bool {
        let created = match self.entries.get_mut(identification) {
            Some(entry) => {
                entry.merge(patch);
                false
            }
            None => {
                if !self.keys.iter().any(|k| k == identification) {
                    self.keys.push(identification.to_string());
                }
                self.entries.insert(
                    identification.to_string(),
                    CacheEntry::new(identification, patch),
                );
                true
            }
        };

        self.repair();
        created
    }

    /// Remove every entry whose content's owner key is targeted.
    ///
    /// Returns the removed identifications in key order. Entries with no
    /// content, or whose owner cannot be derived, never match.
    pub fn remove_by_owner(
        &mut self,
        target: &RemoveTarget,
        owner_of: &OwnerOf<C>,
    ) -> Vec<Identification> {
        let matched: HashSet<Identification> = self
            .entries
            .values()
            .filter(|entry| {
                entry
                    .content
                    .as_ref()
                    .and_then(|content| owner_of(content))
                    .is_some_and(|owner| target.matches(&owner))
            })
            .map(|entry| entry.identification.clone())
            .collect();

        if matched.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::with_capacity(matched.len());
        self.keys.retain(|key| {
            if matched.contains(key) {
                removed.push(key.clone());
                false
            } else {
                true
            }
        });

        self.repair();
        debug!(removed = removed.len(), "Removed entries by owner");
        removed
    }

    /// Drop the oldest keys until at most `capacity` remain.
    ///
    /// Returns the evicted identifications, oldest first.
    pub fn evict_overflow(&mut self, capacity: usize) -> Vec<Identification> {
        let overflow = self.keys.len().saturating_sub(capacity);
        if overflow == 0 {
            return Vec::new();
        }

        let evicted: Vec<Identification> = self.keys.drain(..overflow).collect();
        self.repair();
        evicted
    }

    /// Prune mapping entries that are missing from the key sequence.
    ///
    /// Returns the number of entries dropped.
    fn repair(&mut self) -> usize {
        if self.entries.len() == self.keys.len() {
            return 0;
        }

        let live: HashSet<&str> = self.keys.iter().map(String::as_str).collect();
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id.as_str()));
        let pruned = before - self.entries.len();

        if self.entries.len() != self.keys.len() {
            warn!(
                entries = self.entries.len(),
                keys = self.keys.len(),
                "Key sequence references identifications with no entry"
            );
            let entries = &self.entries;
            self.keys.retain(|key| entries.contains_key(key));
        }

        pruned
    }

    pub fn get(&self, identification: &str) -> Option<&CacheEntry<C>> {
        self.entries.get(identification)
    }

    pub fn get_mut(&mut self, identification: &str) -> Option<&mut CacheEntry<C>> {
        self.entries.get_mut(identification)
    }

    pub fn contains(&self, identification: &str) -> bool {
        self.entries.contains_key(identification)
    }

    /// Identifications in first-insertion order.
    pub fn keys(&self) -> &[Identification] {
        &self.keys
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<C>> {
        self.keys.iter().filter_map(|key| self.entries.get(key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
