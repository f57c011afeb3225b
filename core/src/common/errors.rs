//! Unified error handling for the metadata cache

use thiserror::Error;

use crate::cloud::adapter::RemoteError;

/// Main error type for cache operations.
///
/// The kernel bridge is expected to map these onto errno values; the cache
/// itself never panics on them.
#[derive(Error, Debug)]
pub enum CacheError {
	/// A path or id could not be resolved, locally or remotely. Carries the
	/// deepest prefix (or the id) that failed, for diagnostics.
	#[error("not found: {0}")]
	NotFound(String),

	/// A remote call was needed but no credentials are available.
	#[error("credentials required to fetch {0}")]
	AuthRequired(String),

	/// The remote adapter failed; the message is passed through verbatim.
	#[error("remote drive error: {0}")]
	Remote(#[from] RemoteError),

	/// A tree invariant was found violated. The operation was aborted
	/// without mutating state.
	#[error("tree structure violation: {0}")]
	Structural(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
