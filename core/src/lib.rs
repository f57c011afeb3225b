//! cumulus-core
//!
//! The metadata cache and delta-synchronization core behind a mounted
//! remote drive. The kernel bridge resolves paths and ids against
//! [`DriveCache`]; a background actor keeps the cache current by polling
//! the remote change feed. File content never passes through here, only
//! tree structure and names.

mod cache;
mod cloud;
mod common;
mod config;
mod domain;

pub use cache::DriveCache;
pub use cloud::{
	adapter::{
		ChildSet, DeletedFacet, DeltaPage, FolderFacet, ItemRecord, ParentReference,
		RemoteAdapter, RemoteError,
	},
	delta::{run_actor, PollOutcome},
	graph::{GraphAdapter, TokenSource},
};
pub use common::errors::{CacheError, Result};
pub use config::{SyncConfig, CURSOR_LATEST};
pub use domain::item::Item;
