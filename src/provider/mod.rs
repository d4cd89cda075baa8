//! Keep-alive provider.
//!
//! - [`controller`]: `Provider`, the orchestrator owning store, surface, and queue
//! - [`scheduler`]: Explicit render/eviction task queue
//! - [`surface`]: Off-screen render surface trait and an in-memory implementation
//! - [`handle`]: Cloneable handle exposed to descendant consumers

pub mod controller;
pub mod handle;
pub mod scheduler;
pub mod surface;

pub use controller::{FlushReport, Provider};
pub use handle::{ProviderHandle, SharedProvider};
pub use surface::{MemorySurface, RenderFrame, RenderSurface, RenderedEntry};
