//! Off-screen render surface.
//!
//! Every retained subtree is rendered into a single detached surface owned by
//! the provider. It stays invisible until the relocation layer moves a subtree
//! into the visible slot. The surface is attached after the provider's first
//! commit and detached on teardown.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::cache::entry::Identification;

/// One entry emitted by a render pass, bracketed by its sentinel markers.
#[derive(Debug)]
pub struct RenderedEntry<'a, C> {
    pub identification: &'a str,
    pub content: &'a C,
    /// Not resident from an earlier commit: the host builds a new instance.
    pub fresh: bool,
}

/// The output of a single render pass, in key order.
#[derive(Debug)]
pub struct RenderFrame<'a, C> {
    pub pass: u64,
    pub entries: Vec<RenderedEntry<'a, C>>,
}

impl<C> RenderFrame<'_, C> {
    /// Identifications rendered by this frame, in key order.
    pub fn identifications(&self) -> Vec<Identification> {
        self.entries
            .iter()
            .map(|e| e.identification.to_string())
            .collect()
    }
}

/// A detached rendering target.
pub trait RenderSurface<C>: Send + Sync {
    /// Create the surface and append it to the host's persistent anchor.
    fn attach(&mut self);

    /// Commit a render pass. Returns once the frame's subtrees are stable.
    fn commit(&mut self, frame: &RenderFrame<'_, C>);

    /// Detach from the anchor and release the surface.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;
}

/// Observable state of a [`MemorySurface`].
#[derive(Debug, Default, Clone, Serialize)]
pub struct SurfaceState {
    pub attached: bool,
    pub commits: u64,
    /// Identifications rendered by the last committed frame, in order.
    pub resident: Vec<Identification>,
    /// Identifications the last frame asked to rebuild fresh.
    pub rebuilt: Vec<Identification>,
}

/// In-memory surface that records what each commit placed off-screen.
///
/// Clones share state, so a caller can keep one to observe the surface after
/// handing another to the provider.
#[derive(Debug, Default, Clone)]
pub struct MemorySurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SurfaceState {
        self.state().clone()
    }

    pub fn commits(&self) -> u64 {
        self.state().commits
    }

    pub fn resident(&self) -> Vec<Identification> {
        self.state().resident.clone()
    }
}

impl<C> RenderSurface<C> for MemorySurface {
    fn attach(&mut self) {
        self.state().attached = true;
    }

    fn commit(&mut self, frame: &RenderFrame<'_, C>) {
        let mut state = self.state();
        state.commits += 1;
        state.resident = frame.identifications();
        state.rebuilt = frame
            .entries
            .iter()
            .filter(|e| e.fresh)
            .map(|e| e.identification.to_string())
            .collect();
    }

    fn detach(&mut self) {
        let mut state = self.state();
        state.attached = false;
        state.resident.clear();
        state.rebuilt.clear();
    }

    fn is_attached(&self) -> bool {
        self.state().attached
    }
}
