//! Per-entry lifecycle transitions.
//!
//! Each render pass asks [`resolve`] what to do with every entry, in key order.
//! An entry previously shown under `keep_alive == true` must not keep showing
//! stale content once the caller withdraws that intent: it is torn down for one
//! pass and rebuilt fresh on the forced follow-up pass.

use tracing::debug;

use crate::cache::entry::{CacheEntry, EntryPatch, Lifecycle};

/// What a render pass emits for a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDecision {
    /// Render the entry's content between the two sentinel markers.
    Render,
    /// Content withdrawn this pass; a follow-up pass must be scheduled.
    Skip,
    /// Nothing to render: the entry has no content.
    Empty,
}

impl RenderDecision {
    pub fn renders(&self) -> bool {
        matches!(self, RenderDecision::Render)
    }

    pub fn requires_follow_up(&self) -> bool {
        matches!(self, RenderDecision::Skip)
    }
}

/// Evaluate one entry for the current render pass, advancing its lifecycle.
pub fn resolve<C>(entry: &mut CacheEntry<C>) -> RenderDecision {
    if entry.content.is_none() {
        return RenderDecision::Empty;
    }

    match entry.lifecycle {
        Lifecycle::Mounted if !entry.keep_alive => {
            entry.lifecycle = Lifecycle::Updating;
            debug!(
                identification = %entry.identification,
                "keep_alive withdrawn, tearing down content"
            );
            RenderDecision::Skip
        }
        _ => RenderDecision::Render,
    }
}

/// Advance an entry that is receiving a `set_cache` call.
///
/// `Updating` only returns to `Mounted` through caller input, and only when the
/// patch does not pick a lifecycle itself.
pub fn on_set_cache<C>(entry: &mut CacheEntry<C>, patch: &EntryPatch<C>) {
    if patch.lifecycle.is_none() && entry.lifecycle == Lifecycle::Updating {
        entry.lifecycle = Lifecycle::Mounted;
    }
}

/// Deactivate an entry. Content stays in place so it can be resumed.
pub fn unactivate<C>(entry: &mut CacheEntry<C>) {
    entry.lifecycle = Lifecycle::Unmounted;
    entry.activated = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(keep_alive: bool) -> CacheEntry<&'static str> {
        CacheEntry::new(
            "a",
            EntryPatch::new()
                .with_content("view")
                .with_keep_alive(keep_alive),
        )
    }

    #[test]
    fn test_mounted_keep_alive_renders() {
        let mut e = entry(true);
        assert_eq!(resolve(&mut e), RenderDecision::Render);
        assert_eq!(e.lifecycle, Lifecycle::Mounted);
    }

    #[test]
    fn test_withdrawn_keep_alive_tears_down_then_rebuilds() {
        let mut e = entry(false);

        let first = resolve(&mut e);
        assert_eq!(first, RenderDecision::Skip);
        assert!(first.requires_follow_up());
        assert_eq!(e.lifecycle, Lifecycle::Updating);

        // Follow-up pass rebuilds without self-advancing the state.
        assert_eq!(resolve(&mut e), RenderDecision::Render);
        assert_eq!(e.lifecycle, Lifecycle::Updating);
    }

    #[test]
    fn test_set_cache_returns_updating_to_mounted() {
        let mut e = entry(false);
        resolve(&mut e);

        on_set_cache(&mut e, &EntryPatch::new());
        assert_eq!(e.lifecycle, Lifecycle::Mounted);
    }

    #[test]
    fn test_set_cache_respects_explicit_lifecycle() {
        let mut e = entry(false);
        e.lifecycle = Lifecycle::Unmounted;

        on_set_cache(&mut e, &EntryPatch::new());
        assert_eq!(e.lifecycle, Lifecycle::Unmounted);
    }

    #[test]
    fn test_unactivate_keeps_content() {
        let mut e = entry(true);
        unactivate(&mut e);

        assert_eq!(e.lifecycle, Lifecycle::Unmounted);
        assert!(!e.activated);
        assert_eq!(e.content, Some("view"));
        assert_eq!(resolve(&mut e), RenderDecision::Render);
    }

    #[test]
    fn test_empty_entry_renders_nothing() {
        let mut e: CacheEntry<&str> = CacheEntry::new("a", EntryPatch::new());
        assert_eq!(resolve(&mut e), RenderDecision::Empty);
        assert!(!RenderDecision::Empty.renders());
    }
}
