//! Provider handle: the configuration channel handed to descendant consumers.
//!
//! Consumers never hold the provider directly. They get a cloneable handle that
//! exposes the cache view, the mutation API, the notification channel, and the
//! include/exclude matchers. Each mutation applies its change and flushes,
//! standing in for the host's render/commit cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::entry::{CacheEntry, EntryPatch, Identification};
use crate::cache::store::RemoveTarget;
use crate::config::Matcher;
use crate::error::Result;
use crate::notify::NotificationChannel;
use crate::provider::controller::{FlushReport, Provider};

/// Thread-safe wrapper around the provider.
pub type SharedProvider<C> = Arc<RwLock<Provider<C>>>;

pub struct ProviderHandle<C> {
    provider: SharedProvider<C>,
    identification: Identification,
    existed: Arc<AtomicBool>,
    notifications: NotificationChannel,
    include: Option<Matcher>,
    exclude: Option<Matcher>,
}

impl<C> Clone for ProviderHandle<C> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            identification: self.identification.clone(),
            existed: self.existed.clone(),
            notifications: self.notifications.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

impl<C> ProviderHandle<C> {
    /// Wrap a provider for sharing with consumers.
    pub fn new(provider: Provider<C>) -> Self {
        Self {
            identification: provider.identification().to_string(),
            existed: provider.existence_flag(),
            notifications: provider.notifications().clone(),
            include: provider.include().cloned(),
            exclude: provider.exclude().cloned(),
            provider: Arc::new(RwLock::new(provider)),
        }
    }

    pub fn provider_identification(&self) -> &str {
        &self.identification
    }

    pub fn is_existed(&self) -> bool {
        self.existed.load(Ordering::Acquire)
    }

    pub fn notification_channel(&self) -> &NotificationChannel {
        &self.notifications
    }

    pub fn include(&self) -> Option<&Matcher> {
        self.include.as_ref()
    }

    pub fn exclude(&self) -> Option<&Matcher> {
        self.exclude.as_ref()
    }

    pub fn shared(&self) -> SharedProvider<C> {
        self.provider.clone()
    }

    pub async fn keys(&self) -> Vec<Identification> {
        self.provider.read().await.keys().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.provider.read().await.store().len()
    }

    /// Whether the off-screen surface (the store element) is attached.
    pub async fn surface_attached(&self) -> bool {
        self.provider.read().await.surface_attached()
    }

    pub async fn set_cache(&self, identification: &str, patch: EntryPatch<C>) -> FlushReport {
        if !self.guard("set_cache") {
            return FlushReport::default();
        }

        let report = {
            let mut provider = self.provider.write().await;
            provider.set_cache(identification, patch);
            provider.drain()
        };
        self.notifications.emit_mounted(&report.mounted);
        report
    }

    pub async fn remove_cache(&self, target: impl Into<RemoveTarget>) -> FlushReport {
        if !self.guard("remove_cache") {
            return FlushReport::default();
        }

        let target = target.into();
        let report = {
            let mut provider = self.provider.write().await;
            let removed = provider.remove_cache(&target);
            FlushReport {
                removed,
                ..provider.drain()
            }
        };
        self.notifications.emit_mounted(&report.mounted);
        report
    }

    /// Remove by a dynamically typed target; fails with `InvalidArgument` on a bad shape.
    pub async fn remove_cache_value(&self, target: &Value) -> Result<FlushReport> {
        let target = RemoveTarget::try_from(target)?;
        Ok(self.remove_cache(target).await)
    }

    /// Returns `false` when the identification is unknown or the provider is gone.
    pub async fn unactivate(&self, identification: &str) -> bool {
        if !self.guard("unactivate") {
            return false;
        }

        self.provider.write().await.unactivate(identification)
    }

    pub async fn teardown(&self) {
        self.provider.write().await.teardown();
    }

    fn guard(&self, operation: &str) -> bool {
        let existed = self.is_existed();
        if !existed {
            warn!(
                provider = %self.identification,
                operation,
                "Provider torn down, ignoring mutation"
            );
        }
        existed
    }
}

impl<C: Clone> ProviderHandle<C> {
    /// Snapshot of the cache in key order.
    pub async fn cache(&self) -> Vec<CacheEntry<C>> {
        self.provider.read().await.store().iter().cloned().collect()
    }

    pub async fn get(&self, identification: &str) -> Option<CacheEntry<C>> {
        self.provider.read().await.get(identification).cloned()
    }
}
