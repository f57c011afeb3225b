//! Identifier registry - the process-wide id → item table
//!
//! The registry is the only component that indexes items by id, and it makes
//! no judgments about tree shape: linking and unlinking children is the tree
//! maintainer's job. Lookups take no locks beyond the map's own shards and
//! never touch the remote.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::item::Item;

pub(crate) struct Registry {
	items: DashMap<String, Arc<Item>>,
	root: Arc<Item>,
	root_id: String,
	/// Opaque resume token for the delta feed. Written only by the delta
	/// synchronizer; readable by anyone.
	delta_cursor: RwLock<String>,
}

impl Registry {
	pub(crate) fn new(root: Arc<Item>, initial_cursor: String) -> Self {
		let root_id = root.id();
		let items = DashMap::new();
		items.insert(root_id.clone(), root.clone());
		Self {
			items,
			root,
			root_id,
			delta_cursor: RwLock::new(initial_cursor),
		}
	}

	pub(crate) fn get(&self, id: &str) -> Option<Arc<Item>> {
		self.items.get(id).map(|entry| entry.value().clone())
	}

	/// Idempotent overwrite; last writer wins.
	pub(crate) fn store(&self, id: &str, item: Arc<Item>) {
		self.items.insert(id.to_string(), item);
	}

	/// Drop the mapping for `id`. Parent linkage is untouched.
	pub(crate) fn remove(&self, id: &str) {
		self.items.remove(id);
	}

	pub(crate) fn root(&self) -> Arc<Item> {
		self.root.clone()
	}

	pub(crate) fn root_id(&self) -> &str {
		&self.root_id
	}

	pub(crate) fn delta_cursor(&self) -> String {
		self.delta_cursor.read().clone()
	}

	pub(crate) fn set_delta_cursor(&self, cursor: &str) {
		*self.delta_cursor.write() = cursor.to_string();
	}
}
