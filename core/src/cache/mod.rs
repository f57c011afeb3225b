//! DriveCache - the metadata cache the kernel bridge talks to
//!
//! The cache keeps an in-memory tree of [`Item`]s keyed by server id,
//! populated lazily from the remote drive and kept current by the delta
//! synchronizer. Construction fetches the root once; everything below it is
//! fetched on first traversal.

mod children;
mod resolve;
mod tree;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
	cloud::{adapter::RemoteAdapter, delta},
	common::errors::Result,
	config::SyncConfig,
	domain::{item::Item, registry::Registry},
};

pub struct DriveCache {
	registry: Registry,
	adapter: Arc<dyn RemoteAdapter>,
	config: SyncConfig,
}

impl DriveCache {
	/// Fetch the drive root through `adapter` and build a cache around it.
	pub async fn new(adapter: Arc<dyn RemoteAdapter>, config: SyncConfig) -> Result<Arc<Self>> {
		let record = adapter.get_root().await?;
		let root = Item::from_record(&record);
		// The remote may report a parent for its root object; ours is the
		// top of the tree, so the link is dropped.
		root.write().parent_id.clear();
		Ok(Self::assemble(Arc::new(root), adapter, config))
	}

	fn assemble(root: Arc<Item>, adapter: Arc<dyn RemoteAdapter>, config: SyncConfig) -> Arc<Self> {
		let registry = Registry::new(root, config.initial_cursor.clone());
		Arc::new(Self {
			registry,
			adapter,
			config,
		})
	}

	/// Pure registry lookup; never calls the remote.
	pub fn get_id(&self, id: &str) -> Option<Arc<Item>> {
		self.registry.get(id)
	}

	pub fn root(&self) -> Arc<Item> {
		self.registry.root()
	}

	/// Id the root was registered under; fixed for the cache's lifetime.
	pub fn root_id(&self) -> &str {
		self.registry.root_id()
	}

	pub fn delta_cursor(&self) -> String {
		self.registry.delta_cursor()
	}

	/// Drain the delta feed once: poll until the remote hands back a
	/// terminal cursor (or a transport error stops the cycle).
	pub async fn sync_once(&self) -> delta::PollOutcome {
		let mut outcome = delta::poll_deltas(self).await;
		while outcome == delta::PollOutcome::Continue {
			outcome = delta::poll_deltas(self).await;
		}
		outcome
	}

	/// Spawn the background delta synchronizer. It runs until `shutdown` is
	/// cancelled (in practice, process exit).
	pub fn spawn_delta_actor(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
		tokio::spawn(delta::run_actor(self.clone(), shutdown))
	}

	pub(crate) fn registry(&self) -> &Registry {
		&self.registry
	}

	pub(crate) fn adapter(&self) -> &dyn RemoteAdapter {
		self.adapter.as_ref()
	}

	pub(crate) fn config(&self) -> &SyncConfig {
		&self.config
	}

	/// Best-effort path of `item`, for diagnostics. Walks parent links as
	/// far as the registry knows them; the walk is depth-capped so a
	/// transiently inconsistent tree cannot hang it.
	pub(crate) fn path_of(&self, item: &Arc<Item>) -> String {
		let mut parent_id = item.parent_id();
		if parent_id.is_empty() {
			return "/".to_string();
		}

		let mut segments = vec![item.name()];
		for _ in 0..128 {
			let Some(parent) = self.registry.get(&parent_id) else {
				break;
			};
			parent_id = parent.parent_id();
			if parent_id.is_empty() {
				break;
			}
			segments.push(parent.name());
		}

		let mut path = String::new();
		for segment in segments.iter().rev() {
			path.push('/');
			path.push_str(segment);
		}
		path
	}

	#[cfg(test)]
	pub(crate) fn offline(
		root: Item,
		adapter: Arc<dyn RemoteAdapter>,
		config: SyncConfig,
	) -> Arc<Self> {
		Self::assemble(Arc::new(root), adapter, config)
	}
}
