//! Integration tests for the two-phase capacity eviction.

use keep_alive_cache::cache::EntryPatch;
use keep_alive_cache::config::ProviderConfig;
use keep_alive_cache::provider::{MemorySurface, Provider};

fn provider(max: Option<usize>) -> (Provider<&'static str>, MemorySurface) {
    let surface = MemorySurface::new();
    let config = ProviderConfig {
        max,
        ..Default::default()
    };
    let provider = Provider::new(
        &config,
        |content: &&'static str| Some(content.to_string()),
        Box::new(surface.clone()),
    );
    (provider, surface)
}

fn insert_all(p: &mut Provider<&'static str>, ids: &[&'static str]) {
    for id in ids {
        p.set_cache(id, EntryPatch::new().with_content(*id));
        p.flush();
    }
}

#[test]
fn test_fifo_eviction_with_max_two() {
    let (mut p, surface) = provider(Some(2));
    insert_all(&mut p, &["a", "b", "c"]);

    assert_eq!(p.keys(), ["b", "c"]);
    assert!(p.get("a").is_none());
    assert_eq!(p.store().len(), 2);
    assert_eq!(surface.resident(), vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_batched_inserts_settle_to_capacity() {
    let (mut p, _) = provider(Some(2));
    for id in ["a", "b", "c"] {
        p.set_cache(id, EntryPatch::new().with_content(id));
    }
    let report = p.flush();

    assert_eq!(report.evicted, vec!["a".to_string()]);
    assert_eq!(p.keys(), ["b", "c"]);
}

#[test]
fn test_eviction_is_insertion_order_not_access_order() {
    let (mut p, _) = provider(Some(2));
    insert_all(&mut p, &["a", "b"]);

    // Touching "a" does not refresh its position.
    p.set_cache("a", EntryPatch::new().with_activated(true));
    p.flush();
    insert_all(&mut p, &["c"]);

    assert_eq!(p.keys(), ["b", "c"]);
}

#[test]
fn test_updates_to_existing_entries_never_evict() {
    let (mut p, _) = provider(Some(2));
    insert_all(&mut p, &["a", "b"]);

    p.set_cache("b", EntryPatch::new().with_content("b2"));
    let report = p.flush();

    assert!(report.evicted.is_empty());
    assert_eq!(p.keys(), ["a", "b"]);
}

#[test]
fn test_eviction_commits_insert_before_removal() {
    let (mut p, surface) = provider(Some(1));
    insert_all(&mut p, &["a"]);
    let before = surface.commits();

    p.set_cache("b", EntryPatch::new().with_content("b"));
    let report = p.flush();

    // Phase 1 commits both entries; phase 2 evicts and commits again.
    assert_eq!(report.render_passes, 2);
    assert_eq!(report.mounted, vec!["b".to_string()]);
    assert_eq!(report.evicted, vec!["a".to_string()]);
    assert_eq!(surface.commits(), before + 2);
    assert_eq!(p.keys(), ["b"]);
}

#[test]
fn test_zero_max_disables_eviction() {
    let (mut p, _) = provider(Some(0));
    let ids: Vec<&'static str> = vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"];
    insert_all(&mut p, &ids);

    assert_eq!(p.capacity(), None);
    assert_eq!(p.keys().len(), ids.len());
}

#[test]
fn test_unset_max_disables_eviction() {
    let (mut p, _) = provider(None);
    let ids: Vec<&'static str> = vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"];
    insert_all(&mut p, &ids);

    assert_eq!(p.keys().len(), ids.len());
}

#[test]
fn test_default_max_is_ten() {
    let (mut p, _) = provider(ProviderConfig::default().max);
    let ids: Vec<&'static str> = vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"];
    insert_all(&mut p, &ids);

    assert_eq!(p.keys().len(), 10);
    assert_eq!(p.keys()[0], "c");
}
