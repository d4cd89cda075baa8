//! keep-alive-cache: retains rendered UI subtrees off-screen.
//!
//! A provider keeps every registered subtree rendered into a detached
//! off-screen surface so that switching away from a view and back does not
//! destroy its internal state. Retention is bounded by a FIFO capacity, and a
//! keyed notification channel tells the relocation layer when an entry's
//! off-screen subtree has committed and can be moved into view.

pub mod cache;
pub mod config;
pub mod error;
pub mod notify;
pub mod provider;
pub mod server;

pub use error::KeepAliveError;
