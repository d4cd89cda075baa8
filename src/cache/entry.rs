//! Cache entry types.
//!
//! An entry is one retained subtree registration. The provider never looks
//! inside `content`; it only decides whether to render it into the off-screen
//! surface on a given pass.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique key distinguishing one retained subtree from another.
pub type Identification = String;

/// Generate a fresh system-assigned identification.
pub fn new_identification() -> Identification {
    Uuid::new_v4().to_string()
}

/// Per-entry lifecycle state, advanced once per render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Rendered with live content.
    Mounted,
    /// Content was torn down on the last pass; the follow-up pass rebuilds it fresh.
    Updating,
    /// Deactivated. Still resident off-screen, pending reactivation.
    Unmounted,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Mounted => write!(f, "mounted"),
            Lifecycle::Updating => write!(f, "updating"),
            Lifecycle::Unmounted => write!(f, "unmounted"),
        }
    }
}

/// Callback the relocation layer runs when bringing a retained subtree back.
pub type ReactivateFn = Arc<dyn Fn() + Send + Sync>;

/// A single retained subtree.
///
/// `content` is whatever handle the host uses for a renderable subtree. Callers
/// that want the entry to share rather than own it should use an `Arc` for `C`.
#[derive(Clone, Serialize)]
pub struct CacheEntry<C> {
    pub identification: Identification,

    pub content: Option<C>,

    /// Caller's current intent: retain the subtree while deactivated.
    pub keep_alive: bool,

    pub lifecycle: Lifecycle,

    /// Whether this entry is the one currently meant to be visible.
    pub activated: bool,

    #[serde(skip)]
    pub reactivate: Option<ReactivateFn>,
}

impl<C> CacheEntry<C> {
    /// Create an entry from a patch, defaulting every field the patch leaves unset.
    pub fn new(identification: impl Into<Identification>, patch: EntryPatch<C>) -> Self {
        Self {
            identification: identification.into(),
            content: patch.content,
            keep_alive: patch.keep_alive.unwrap_or(true),
            lifecycle: patch.lifecycle.unwrap_or(Lifecycle::Mounted),
            activated: patch.activated.unwrap_or(true),
            reactivate: patch.reactivate,
        }
    }

    /// Shallow-merge a patch: every field the patch sets overrides the current value.
    pub fn merge(&mut self, patch: EntryPatch<C>) {
        if let Some(content) = patch.content {
            self.content = Some(content);
        }
        if let Some(keep_alive) = patch.keep_alive {
            self.keep_alive = keep_alive;
        }
        if let Some(lifecycle) = patch.lifecycle {
            self.lifecycle = lifecycle;
        }
        if let Some(activated) = patch.activated {
            self.activated = activated;
        }
        if let Some(reactivate) = patch.reactivate {
            self.reactivate = Some(reactivate);
        }
    }

    /// Run the caller-supplied reactivation callback, if any.
    pub fn invoke_reactivate(&self) -> bool {
        match &self.reactivate {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for CacheEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("identification", &self.identification)
            .field("content", &self.content)
            .field("keep_alive", &self.keep_alive)
            .field("lifecycle", &self.lifecycle)
            .field("activated", &self.activated)
            .field("reactivate", &self.reactivate.is_some())
            .finish()
    }
}

/// A partial entry passed to `set_cache`. Unset fields leave the entry untouched.
#[derive(Clone, Deserialize)]
pub struct EntryPatch<C> {
    #[serde(default)]
    pub content: Option<C>,
    #[serde(default)]
    pub keep_alive: Option<bool>,
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default)]
    pub activated: Option<bool>,
    #[serde(skip)]
    pub reactivate: Option<ReactivateFn>,
}

impl<C> Default for EntryPatch<C> {
    fn default() -> Self {
        Self {
            content: None,
            keep_alive: None,
            lifecycle: None,
            activated: None,
            reactivate: None,
        }
    }
}

impl<C> EntryPatch<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: C) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_activated(mut self, activated: bool) -> Self {
        self.activated = Some(activated);
        self
    }

    pub fn with_reactivate(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.reactivate = Some(Arc::new(callback));
        self
    }
}

impl<C: fmt::Debug> fmt::Debug for EntryPatch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPatch")
            .field("content", &self.content)
            .field("keep_alive", &self.keep_alive)
            .field("lifecycle", &self.lifecycle)
            .field("activated", &self.activated)
            .field("reactivate", &self.reactivate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_entry_defaults() {
        let entry: CacheEntry<&str> = CacheEntry::new("a", EntryPatch::new().with_content("view"));
        assert_eq!(entry.identification, "a");
        assert_eq!(entry.content, Some("view"));
        assert!(entry.keep_alive);
        assert_eq!(entry.lifecycle, Lifecycle::Mounted);
        assert!(entry.activated);
        assert!(entry.reactivate.is_none());
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut entry = CacheEntry::new(
            "a",
            EntryPatch::new().with_content("first").with_keep_alive(true),
        );
        entry.merge(EntryPatch::new().with_keep_alive(false));

        assert_eq!(entry.content, Some("first"));
        assert!(!entry.keep_alive);

        entry.merge(EntryPatch::new().with_content("second"));
        assert_eq!(entry.content, Some("second"));
        assert!(!entry.keep_alive);
    }

    #[test]
    fn test_reactivate_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let entry: CacheEntry<()> = CacheEntry::new(
            "a",
            EntryPatch::new().with_reactivate(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(entry.invoke_reactivate());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_patch_deserializes_from_partial_json() {
        let patch: EntryPatch<serde_json::Value> =
            serde_json::from_str(r#"{"keep_alive": false, "lifecycle": "unmounted"}"#).unwrap();
        assert!(patch.content.is_none());
        assert_eq!(patch.keep_alive, Some(false));
        assert_eq!(patch.lifecycle, Some(Lifecycle::Unmounted));
    }
}
