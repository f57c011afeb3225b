//! Path resolver - POSIX paths on top of the id-keyed tree
//!
//! Paths are walked from the root one segment at a time, populating missing
//! directory listings on demand. Segment comparison is case-insensitive;
//! the case the server reported is what callers get back.

use std::sync::Arc;

use tracing::warn;

use super::DriveCache;
use crate::{
	common::errors::{CacheError, Result},
	domain::item::{name_key, Item},
};

/// Split a normalized path into its directory and basename parts.
fn split_path(path: &str) -> (&str, &str) {
	let trimmed = path.trim_end_matches('/');
	match trimmed.rfind('/') {
		Some(0) => ("/", &trimmed[1..]),
		Some(position) => (&trimmed[..position], &trimmed[position + 1..]),
		None => ("/", trimmed),
	}
}

impl DriveCache {
	/// Resolve `path` to an item, fetching unpopulated directories along the
	/// way. `"/"` resolves to the root without any remote traffic.
	pub async fn get(&self, path: &str) -> Result<Arc<Item>> {
		let trimmed = path.trim_end_matches('/');
		let mut current = self.registry().root();
		let mut walked = String::new();

		for segment in trimmed.split('/').filter(|segment| !segment.is_empty()) {
			let current_id = current.id();
			let children = self.get_children_id(&current_id).await?;
			match children.get(&name_key(segment)) {
				Some(child) => {
					walked.push('/');
					walked.push_str(segment);
					current = child.clone();
				}
				None => return Err(CacheError::NotFound(format!("{walked}/{segment}"))),
			}
		}

		Ok(current)
	}

	/// Attach `item` under the directory part of `path`. Fails with
	/// `NotFound`, touching nothing, when that directory cannot be
	/// resolved.
	///
	/// Resolving `dir` only lists its ancestors, so the target directory
	/// itself may still be unpopulated; its real listing is fetched here
	/// first, because a local child appended to an unfetched directory
	/// would otherwise pass for the remote's complete child set.
	pub async fn insert(&self, path: &str, item: Arc<Item>) -> Result<()> {
		let (dir, _) = split_path(path);
		let parent = self.get(dir).await?;
		if !parent.is_dir() {
			return Err(CacheError::Structural(format!(
				"insert target {dir} is not a directory"
			)));
		}

		let parent_id = parent.id();
		self.get_children_id(&parent_id).await?;

		item.write().parent_id = parent_id;
		let id = item.id();
		self.insert_id(&id, item);
		Ok(())
	}

	/// Resolve `path` and remove the item it names.
	pub async fn delete(&self, path: &str) -> Result<()> {
		let item = self.get(path).await?;
		let id = item.id();
		self.delete_id(&id);
		Ok(())
	}

	/// Move an item between paths, renaming it when the basename changes.
	///
	/// Modeled as delete-then-reinsert; the item keeps its id and shared
	/// reference. If the reinsert fails the original location is restored
	/// best-effort.
	pub async fn move_path(&self, old_path: &str, new_path: &str) -> Result<()> {
		let item = self.get(old_path).await?;
		let original_name = item.name();

		self.delete(old_path).await?;

		let (_, new_name) = split_path(new_path);
		if new_name != original_name {
			item.set_name(new_name);
		}

		if let Err(error) = self.insert(new_path, item.clone()).await {
			warn!(%error, old_path, new_path, "move failed, rolling back");
			item.set_name(&original_name);
			if let Err(rollback) = self.insert(old_path, item).await {
				warn!(
					%rollback,
					old_path, "rollback failed, item stays registered but unlinked"
				);
			}
			return Err(error);
		}

		Ok(())
	}
}
