//! Children provider - lazy population of directory listings
//!
//! A directory's child list is fetched from the remote at most once; the
//! transition from unpopulated to populated is a one-way commit, and every
//! later read is served from the registry.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, warn};

use super::DriveCache;
use crate::{
	common::errors::{CacheError, Result},
	domain::item::{name_key, Item},
};

impl DriveCache {
	/// Children of the directory `id`, keyed by lowercased name.
	///
	/// Non-directories yield an empty map rather than an error, so a
	/// traversal that guessed wrong about a segment stays cheap. Child ids
	/// that no longer resolve are silently skipped.
	pub async fn get_children_id(&self, id: &str) -> Result<HashMap<String, Arc<Item>>> {
		let Some(item) = self.registry().get(id) else {
			return Err(CacheError::NotFound(id.to_string()));
		};

		if !item.is_dir() {
			warn!(id, "children requested for a non-directory item");
			return Ok(HashMap::new());
		}

		if let Some(ids) = item.children() {
			return Ok(self.collect_children(&ids));
		}

		if !self.adapter().has_credentials() {
			return Err(CacheError::AuthRequired(self.path_of(&item)));
		}

		let fetched = self.adapter().get_children(id).await?;
		debug!(id, count = fetched.value.len(), "fetched directory listing");

		let mut item_state = item.write();
		if item_state.children.is_some() {
			// Another task populated this directory while we were fetching;
			// its commit wins and ours is discarded.
			drop(item_state);
			let ids = item.children().unwrap_or_default();
			return Ok(self.collect_children(&ids));
		}

		let mut map = HashMap::with_capacity(fetched.value.len());
		let mut child_ids = Vec::with_capacity(fetched.value.len());
		// Cached items the remote has since moved under this directory;
		// re-homed after the commit so the stale parent's lock is never
		// taken while this directory's is held.
		let mut moved_here = Vec::new();
		let dir_id = item_state.id.clone();
		for record in &fetched.value {
			if child_ids.iter().any(|existing| existing == &record.id) {
				continue;
			}
			// A record for the directory itself cannot be its own child.
			if record.id == dir_id {
				warn!(id, "listing reported the directory as its own child");
				continue;
			}
			// An id we already track keeps its item, so references handed
			// out earlier stay valid and local renames survive.
			let child = match self.registry().get(&record.id) {
				Some(existing) => {
					let known_parent = existing.parent_id();
					if known_parent != dir_id {
						moved_here.push((existing.clone(), known_parent));
					}
					existing
				}
				None => {
					let child = Arc::new(Item::from_record(record));
					self.registry().store(&record.id, child.clone());
					child
				}
			};
			child_ids.push(record.id.clone());
			if child.is_dir() {
				item_state.subdir_count += 1;
			}
			map.insert(name_key(&child.name()), child);
		}
		item_state.children = Some(child_ids);
		drop(item_state);

		for (child, stale_parent_id) in moved_here {
			debug!(
				id = %child.id(),
				%stale_parent_id,
				new_parent_id = %dir_id,
				"listing re-homed a child the remote moved here"
			);
			self.relink_child(&child, &stale_parent_id, &dir_id);
		}

		Ok(map)
	}

	/// Convenience composition of [`get`](DriveCache::get) and
	/// [`get_children_id`](DriveCache::get_children_id).
	pub async fn get_children_path(&self, path: &str) -> Result<HashMap<String, Arc<Item>>> {
		let item = self.get(path).await?;
		let id = item.id();
		self.get_children_id(&id).await
	}

	fn collect_children(&self, ids: &[String]) -> HashMap<String, Arc<Item>> {
		let mut map = HashMap::with_capacity(ids.len());
		for id in ids {
			if let Some(child) = self.registry().get(id) {
				map.insert(name_key(&child.name()), child);
			}
		}
		map
	}
}
