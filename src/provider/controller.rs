//! Provider controller: the keep-alive orchestrator.
//!
//! The provider is the central coordinator for retained subtrees. It:
//! - Owns the cache store and applies caller mutations to it
//! - Drives the lifecycle rule over every entry on each render pass
//! - Commits render passes to the off-screen surface it owns
//! - Emits a mount notification once an entry's subtree is resident
//! - Runs capacity eviction as a second phase after the inserting commit

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::entry::{CacheEntry, EntryPatch, Identification};
use crate::cache::evictor::Evictor;
use crate::cache::lifecycle::{self, RenderDecision};
use crate::cache::store::{CacheStore, OwnerOf, RemoveTarget};
use crate::cache::new_identification;
use crate::config::{Matcher, ProviderConfig};
use crate::error::Result;
use crate::notify::NotificationChannel;
use crate::provider::scheduler::{RenderQueue, Task};
use crate::provider::surface::{RenderFrame, RenderSurface, RenderedEntry};

/// What a [`Provider::flush`] observed while draining the task queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Render passes committed to the surface.
    pub render_passes: u64,
    /// Identifications removed by the capacity bound, oldest first.
    pub evicted: Vec<Identification>,
    /// Identifications removed by owner key.
    pub removed: Vec<Identification>,
    /// Identifications whose mount notification fired.
    pub mounted: Vec<Identification>,
    /// Identifications whose content was withdrawn for a pass.
    pub torn_down: Vec<Identification>,
}

/// Keep-alive provider over subtree handles of type `C`.
pub struct Provider<C> {
    identification: Identification,

    /// Ordered entries.
    store: CacheStore<C>,

    /// Capacity bound applied by `EvictOverflow` tasks.
    evictor: Evictor,

    /// Pending render and eviction work.
    queue: RenderQueue,

    /// Off-screen target every pass commits to.
    surface: Box<dyn RenderSurface<C>>,

    /// Mount notifications, shared with every handle.
    notifications: NotificationChannel,

    /// Owner key extractor for bulk removal.
    owner_of: Arc<OwnerOf<C>>,

    /// Cleared on teardown; shared so handles can read it without the provider lock.
    existed: Arc<AtomicBool>,

    /// Identifications resident in the surface since their last mount notification.
    resident: HashSet<Identification>,

    /// Render passes committed since creation; numbers each frame.
    passes: u64,

    include: Option<Matcher>,
    exclude: Option<Matcher>,
}

impl<C> Provider<C> {
    /// Create a provider with the given configuration.
    ///
    /// `owner_of` extracts the owner key used by [`Provider::remove_cache`].
    pub fn new(
        config: &ProviderConfig,
        owner_of: impl Fn(&C) -> Option<String> + Send + Sync + 'static,
        surface: Box<dyn RenderSurface<C>>,
    ) -> Self {
        let identification = config
            .identification
            .clone()
            .unwrap_or_else(new_identification);

        info!(
            provider = %identification,
            max = ?config.max,
            "Keep-alive provider created"
        );

        Self {
            identification,
            store: CacheStore::new(),
            evictor: Evictor::new(config.max),
            queue: RenderQueue::new(),
            surface,
            notifications: NotificationChannel::new(),
            owner_of: Arc::new(owner_of),
            existed: Arc::new(AtomicBool::new(true)),
            resident: HashSet::new(),
            passes: 0,
            include: config.include.clone(),
            exclude: config.exclude.clone(),
        }
    }

    /// Insert or shallow-merge an entry and schedule the render that commits it.
    ///
    /// When the entry is new, capacity eviction is queued behind that render.
    /// Returns `true` when the entry was created.
    pub fn set_cache(&mut self, identification: &str, patch: EntryPatch<C>) -> bool {
        if self.torn_down("set_cache") {
            return false;
        }

        if let Some(entry) = self.store.get_mut(identification) {
            lifecycle::on_set_cache(entry, &patch);
        }

        let created = self.store.upsert(identification, patch);
        self.queue.schedule(Task::Render);
        if created {
            self.queue.schedule(Task::EvictOverflow);
        }

        debug!(
            provider = %self.identification,
            identification,
            created,
            entries = self.store.len(),
            "set_cache"
        );
        created
    }

    /// Remove every entry whose owner key is targeted, then schedule a render.
    pub fn remove_cache(&mut self, target: &RemoveTarget) -> Vec<Identification> {
        if self.torn_down("remove_cache") {
            return Vec::new();
        }

        let removed = self.store.remove_by_owner(target, self.owner_of.as_ref());
        self.queue.schedule(Task::Render);

        debug!(
            provider = %self.identification,
            ?target,
            removed = removed.len(),
            "remove_cache"
        );
        removed
    }

    /// Dynamic form of [`Provider::remove_cache`].
    ///
    /// Fails with `InvalidArgument` unless `target` is a string or an array of strings.
    pub fn remove_cache_value(&mut self, target: &Value) -> Result<Vec<Identification>> {
        let target = RemoveTarget::try_from(target)?;
        Ok(self.remove_cache(&target))
    }

    /// Deactivate an entry, keeping its content for later resumption.
    ///
    /// Unknown identifications are ignored and no entry is created.
    pub fn unactivate(&mut self, identification: &str) -> bool {
        if self.torn_down("unactivate") {
            return false;
        }

        match self.store.get_mut(identification) {
            Some(entry) => {
                lifecycle::unactivate(entry);
                debug!(provider = %self.identification, identification, "unactivate");
                true
            }
            None => {
                warn!(
                    provider = %self.identification,
                    identification,
                    "unactivate called for unknown identification, ignoring"
                );
                false
            }
        }
    }

    pub fn is_existed(&self) -> bool {
        self.existed.load(Ordering::Acquire)
    }

    /// Shared existence flag for collaborators that outlive a borrow of the provider.
    pub fn existence_flag(&self) -> Arc<AtomicBool> {
        self.existed.clone()
    }

    fn torn_down(&self, operation: &str) -> bool {
        let torn_down = !self.is_existed();
        if torn_down {
            warn!(
                provider = %self.identification,
                operation,
                "Provider torn down, ignoring mutation"
            );
        }
        torn_down
    }

    /// Drain pending tasks in order, the way the host commit cycle would, then
    /// emit a mount notification for every id the drain made resident.
    pub fn flush(&mut self) -> FlushReport {
        let report = self.drain();
        self.notifications.emit_mounted(&report.mounted);
        report
    }

    /// Drain pending tasks without notifying.
    ///
    /// Callers that hold the provider behind a lock emit `report.mounted` once
    /// the lock is released, so subscribers can read the provider.
    pub(crate) fn drain(&mut self) -> FlushReport {
        let mut report = FlushReport::default();

        if !self.is_existed() {
            let dropped = self.queue.clear();
            if dropped > 0 {
                warn!(provider = %self.identification, dropped, "Provider torn down, dropping tasks");
            }
            return report;
        }

        while let Some(task) = self.queue.next() {
            match task {
                Task::Render => self.render_pass(&mut report),
                Task::EvictOverflow => {
                    let evicted = self.evictor.enforce(&mut self.store);
                    if !evicted.is_empty() {
                        report.evicted.extend(evicted);
                        self.queue.schedule(Task::Render);
                    }
                }
            }
        }

        report
    }

    /// Run one render pass over every entry in key order and commit it.
    fn render_pass(&mut self, report: &mut FlushReport) {
        self.passes += 1;

        let keys: Vec<Identification> = self.store.keys().to_vec();
        let mut decisions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.store.get_mut(&key) {
                let decision = lifecycle::resolve(entry);
                decisions.push((key, decision));
            }
        }

        let entries: Vec<RenderedEntry<'_, C>> = decisions
            .iter()
            .filter(|(_, decision)| decision.renders())
            .filter_map(|(key, _)| {
                let content = self.store.get(key)?.content.as_ref()?;
                Some(RenderedEntry {
                    identification: key,
                    content,
                    fresh: !self.resident.contains(key),
                })
            })
            .collect();

        let frame = RenderFrame {
            pass: self.passes,
            entries,
        };

        self.surface.commit(&frame);
        drop(frame);

        if !self.surface.is_attached() {
            self.surface.attach();
            debug!(provider = %self.identification, "Off-screen surface attached");
        }

        let mut follow_up = false;
        for (key, decision) in decisions {
            follow_up |= decision.requires_follow_up();
            match decision {
                RenderDecision::Render => {
                    if self.resident.insert(key.clone()) {
                        report.mounted.push(key);
                    }
                }
                RenderDecision::Skip => {
                    self.resident.remove(&key);
                    report.torn_down.push(key);
                }
                RenderDecision::Empty => {
                    self.resident.remove(&key);
                }
            }
        }

        let store = &self.store;
        self.resident.retain(|id| store.contains(id));
        report.render_passes += 1;

        if follow_up {
            self.queue.schedule(Task::Render);
        }

        debug!(
            provider = %self.identification,
            pass = self.passes,
            entries = self.store.len(),
            follow_up,
            "Render pass committed"
        );
    }

    /// Tear the provider down: clear the existence flag and release the surface.
    pub fn teardown(&mut self) {
        if !self.existed.swap(false, Ordering::AcqRel) {
            return;
        }

        self.queue.clear();
        self.resident.clear();
        if self.surface.is_attached() {
            self.surface.detach();
        }

        info!(
            provider = %self.identification,
            entries = self.store.len(),
            "Keep-alive provider torn down"
        );
    }

    pub fn identification(&self) -> &str {
        &self.identification
    }

    pub fn store(&self) -> &CacheStore<C> {
        &self.store
    }

    pub fn get(&self, identification: &str) -> Option<&CacheEntry<C>> {
        self.store.get(identification)
    }

    pub fn keys(&self) -> &[Identification] {
        self.store.keys()
    }

    pub fn notifications(&self) -> &NotificationChannel {
        &self.notifications
    }

    pub fn capacity(&self) -> Option<usize> {
        self.evictor.capacity()
    }

    pub fn include(&self) -> Option<&Matcher> {
        self.include.as_ref()
    }

    pub fn exclude(&self) -> Option<&Matcher> {
        self.exclude.as_ref()
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.pending()
    }

    pub fn surface_attached(&self) -> bool {
        self.surface.is_attached()
    }
}

impl<C> Drop for Provider<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::Lifecycle;
    use crate::provider::surface::MemorySurface;

    fn provider(max: Option<usize>) -> (Provider<String>, MemorySurface) {
        let surface = MemorySurface::new();
        let config = ProviderConfig {
            identification: Some("root".into()),
            max,
            ..Default::default()
        };
        let provider = Provider::new(
            &config,
            |content: &String| content.split('/').next().map(str::to_string),
            Box::new(surface.clone()),
        );
        (provider, surface)
    }

    fn view(owner: &str) -> EntryPatch<String> {
        EntryPatch::new().with_content(format!("{owner}/view"))
    }

    #[test]
    fn test_surface_attached_on_first_commit() {
        let (mut p, surface) = provider(None);
        assert!(!p.surface_attached());

        p.set_cache("a", view("x"));
        assert!(!p.surface_attached());

        p.flush();
        assert!(p.surface_attached());
        assert_eq!(surface.commits(), 1);
        assert_eq!(surface.resident(), vec!["a".to_string()]);
    }

    #[test]
    fn test_mount_event_once_per_mount() {
        let (mut p, _) = provider(None);
        p.set_cache("a", view("x"));
        let first = p.flush();
        assert_eq!(first.mounted, vec!["a".to_string()]);

        p.set_cache("a", EntryPatch::new().with_activated(true));
        let second = p.flush();
        assert_eq!(second.render_passes, 1);
        assert!(second.mounted.is_empty());
    }

    #[test]
    fn test_new_entry_is_not_evicted_by_its_own_insert() {
        let (mut p, _) = provider(Some(1));
        p.set_cache("a", view("x"));
        p.flush();
        p.set_cache("b", view("y"));
        let report = p.flush();

        assert_eq!(report.evicted, vec!["a".to_string()]);
        assert_eq!(p.keys(), ["b"]);
        // Insert pass, then the pass reflecting the eviction.
        assert_eq!(report.render_passes, 2);
    }

    #[test]
    fn test_unknown_unactivate_creates_nothing() {
        let (mut p, _) = provider(None);
        assert!(!p.unactivate("ghost"));
        assert!(p.store().is_empty());
        assert_eq!(p.pending_tasks(), 0);
    }

    #[test]
    fn test_unactivated_entry_stays_resident() {
        let (mut p, surface) = provider(None);
        p.set_cache("a", view("x"));
        p.flush();

        assert!(p.unactivate("a"));
        p.set_cache("b", view("y"));
        p.flush();

        let entry = p.get("a").unwrap();
        assert_eq!(entry.lifecycle, Lifecycle::Unmounted);
        assert_eq!(surface.resident(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_remove_cache_value_rejects_numbers() {
        let (mut p, _) = provider(None);
        p.set_cache("a", view("x"));
        p.flush();

        assert!(p.remove_cache_value(&serde_json::json!(42)).is_err());
        assert_eq!(p.keys(), ["a"]);
        assert_eq!(
            p.remove_cache_value(&serde_json::json!("x")).unwrap(),
            vec!["a".to_string()]
        );
    }

    #[test]
    fn test_teardown_detaches_and_stops_rendering() {
        let (mut p, surface) = provider(None);
        p.set_cache("a", view("x"));
        p.flush();
        let commits = surface.commits();

        p.teardown();
        assert!(!p.is_existed());
        assert!(!surface.snapshot().attached);

        assert!(!p.set_cache("b", view("y")));
        assert!(p.remove_cache(&RemoveTarget::from("x")).is_empty());
        assert!(!p.unactivate("a"));
        let report = p.flush();
        assert_eq!(report, FlushReport::default());
        assert_eq!(surface.commits(), commits);
        assert_eq!(p.keys(), ["a"]);
        assert!(p.get("a").unwrap().activated);
    }

    #[test]
    fn test_flush_notifies_after_draining() {
        let (mut p, _) = provider(None);
        let mut rx = p
            .notifications()
            .subscribe_channel(crate::notify::EventKey::mounted("a"));

        p.set_cache("a", view("x"));
        assert!(rx.try_recv().is_err());

        let report = p.flush();
        assert_eq!(report.mounted, vec!["a".to_string()]);
        assert!(rx.try_recv().unwrap().is_empty());
    }
}
