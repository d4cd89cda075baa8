//! Error types for the keep-alive provider.
//!
//! Cache operations are best-effort and total over their input domain. The only
//! failure a caller can observe is a contract violation on the dynamic remove
//! surface, which is raised synchronously and never swallowed.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeepAliveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, KeepAliveError>;
