//! Tree maintainer - structural invariants across insert, delete and
//! id-rename
//!
//! These operations are pure registry/tree work: they never touch the
//! remote and never block on I/O. Parent/child linkage is always mutated
//! under the parent's exclusive lock, and where a child lock is needed too
//! it is taken after the parent's.

use std::sync::Arc;

use tracing::warn;

use super::DriveCache;
use crate::{
	common::errors::{CacheError, Result},
	domain::item::Item,
};

impl DriveCache {
	/// Register `item` under `id` and link it into its parent's child list.
	///
	/// A missing parent is tolerated: the item stays registered but
	/// orphaned until a later fetch or delta reconnects it. The same goes
	/// for a parent whose own listing was never fetched: a local append
	/// must not make an unpopulated directory look populated, so the item
	/// is left unlinked rather than seeding a child list the remote never
	/// confirmed. Re-inserting an id already linked is a no-op.
	pub fn insert_id(&self, id: &str, item: Arc<Item>) {
		self.registry().store(id, item.clone());

		let parent_id = item.parent_id();
		if parent_id.is_empty() {
			// Root case: nothing to link.
			return;
		}
		if parent_id == id {
			warn!(id, "item claims to be its own parent; leaving it unlinked");
			return;
		}

		let Some(parent) = self.registry().get(&parent_id) else {
			warn!(id, %parent_id, "inserting item before its parent is known");
			return;
		};

		let mut parent_state = parent.write();
		let Some(children) = parent_state.children.as_mut() else {
			warn!(
				id,
				%parent_id,
				"parent listing is unpopulated; leaving the item unlinked"
			);
			return;
		};
		if children.iter().any(|child| child == id) {
			return;
		}
		children.push(id.to_string());

		let mut item_state = item.write();
		if item.is_dir() {
			parent_state.subdir_count += 1;
		}
		// Keep both representations of the link consistent.
		item_state.parent_id = parent_state.id.clone();
	}

	/// Unlink `id` from its parent and drop it from the registry.
	pub fn delete_id(&self, id: &str) {
		let Some(item) = self.registry().get(id) else {
			// Stale mapping or already gone either way.
			self.registry().remove(id);
			return;
		};

		let parent_id = item.parent_id();
		if !parent_id.is_empty() {
			if let Some(parent) = self.registry().get(&parent_id) {
				let mut parent_state = parent.write();
				if let Some(children) = parent_state.children.as_mut() {
					if let Some(position) = children.iter().position(|child| child == id) {
						children.remove(position);
						if item.is_dir() {
							parent_state.subdir_count = parent_state.subdir_count.saturating_sub(1);
						}
					}
				}
			}
		}

		self.registry().remove(id);
	}

	/// Rename an item's id in place, preserving its position in the
	/// parent's child order and the shared reference itself. This is how a
	/// provisional local id becomes the canonical server-assigned one.
	pub fn move_id(&self, old_id: &str, new_id: &str) -> Result<()> {
		let item = match self.registry().get(old_id) {
			Some(item) => item,
			// The rename may already have happened; that is not an error.
			None => self
				.registry()
				.get(new_id)
				.ok_or_else(|| CacheError::NotFound(old_id.to_string()))?,
		};

		let parent_id = item.parent_id();
		match self.registry().get(&parent_id) {
			Some(parent) if !parent_id.is_empty() => {
				let mut parent_state = parent.write();
				if let Some(children) = parent_state.children.as_mut() {
					if let Some(slot) = children.iter_mut().find(|child| **child == old_id) {
						*slot = new_id.to_string();
					}
				}
				item.write().id = new_id.to_string();
			}
			_ => {
				item.write().id = new_id.to_string();
			}
		}

		self.registry().remove(old_id);
		self.registry().store(new_id, item);
		Ok(())
	}

	/// Re-home a child the remote now reports under a different directory:
	/// unlink it from the stale parent and point it at the new one.
	///
	/// The stale parent's lock and the child's are taken one after the
	/// other, never nested, so this cannot order-invert against a
	/// concurrent populate holding the new parent's lock.
	pub(crate) fn relink_child(&self, child: &Arc<Item>, stale_parent_id: &str, new_parent_id: &str) {
		if !stale_parent_id.is_empty() {
			if let Some(stale_parent) = self.registry().get(stale_parent_id) {
				let child_id = child.id();
				let mut parent_state = stale_parent.write();
				if let Some(children) = parent_state.children.as_mut() {
					if let Some(position) = children.iter().position(|id| *id == child_id) {
						children.remove(position);
						if child.is_dir() {
							parent_state.subdir_count = parent_state.subdir_count.saturating_sub(1);
						}
					}
				}
			}
		}

		child.write().parent_id = new_parent_id.to_string();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use pretty_assertions::assert_eq;

	use crate::{
		cache::DriveCache,
		cloud::adapter::{testing::NullAdapter, ItemRecord},
		config::SyncConfig,
		domain::item::Item,
	};

	fn cache() -> Arc<DriveCache> {
		let root = Item::from_record(&ItemRecord::dir("root", "root", None));
		root.write().children = Some(Vec::new());
		DriveCache::offline(root, Arc::new(NullAdapter), SyncConfig::default())
	}

	/// Insert a fetched-looking item; directories come pre-populated so
	/// further children can be linked beneath them.
	fn insert(cache: &DriveCache, record: ItemRecord) -> Arc<Item> {
		let item = Arc::new(Item::from_record(&record));
		if item.is_dir() {
			item.write().children = Some(Vec::new());
		}
		cache.insert_id(&record.id, item.clone());
		item
	}

	/// Every registered child must appear in its parent's list exactly once.
	fn assert_linked_once(cache: &DriveCache, parent_id: &str, child_id: &str) {
		let parent = cache.get_id(parent_id).unwrap();
		let hits = parent
			.children()
			.unwrap_or_default()
			.into_iter()
			.filter(|id| id == child_id)
			.count();
		assert_eq!(hits, 1, "child {child_id} linked {hits} times");
	}

	#[test]
	fn insert_links_and_counts() {
		let cache = cache();
		insert(&cache, ItemRecord::dir("D1", "Documents", Some("root")));
		insert(&cache, ItemRecord::file("F1", "notes.txt", Some("root")));

		assert_linked_once(&cache, "root", "D1");
		assert_linked_once(&cache, "root", "F1");
		assert_eq!(cache.root().subdir_count(), 1);
	}

	#[test]
	fn insert_is_idempotent() {
		let cache = cache();
		let item = Arc::new(Item::from_record(&ItemRecord::dir("D1", "Docs", Some("root"))));
		for _ in 0..3 {
			cache.insert_id("D1", item.clone());
		}
		assert_linked_once(&cache, "root", "D1");
		assert_eq!(cache.root().subdir_count(), 1);
	}

	#[tracing_test::traced_test]
	#[test]
	fn insert_with_unknown_parent_registers_orphan() {
		let cache = cache();
		let item = insert(&cache, ItemRecord::file("F9", "lost.txt", Some("nowhere")));
		assert!(cache.get_id("F9").is_some());
		assert_eq!(item.parent_id(), "nowhere");
		assert_eq!(cache.root().children(), Some(vec![]));
		assert!(logs_contain("inserting item before its parent is known"));
	}

	#[test]
	fn insert_into_an_unpopulated_parent_stays_unlinked() {
		let cache = cache();
		// Linked under the root, but its own listing was never fetched.
		let dir = Arc::new(Item::from_record(&ItemRecord::dir("D1", "Docs", Some("root"))));
		cache.insert_id("D1", dir.clone());
		assert_eq!(dir.children(), None);

		let item = insert(&cache, ItemRecord::file("F1", "a.txt", Some("D1")));

		// Registered but not linked: the directory must not start looking
		// populated before its real listing arrives.
		assert!(cache.get_id("F1").is_some());
		assert_eq!(dir.children(), None);
		assert_eq!(dir.subdir_count(), 0);
		assert_eq!(item.parent_id(), "D1");
	}

	#[test]
	fn relink_moves_a_child_between_parents() {
		let cache = cache();
		let old_home = insert(&cache, ItemRecord::dir("D1", "Old", Some("root")));
		let new_home = insert(&cache, ItemRecord::dir("D2", "New", Some("root")));
		let child = insert(&cache, ItemRecord::dir("C1", "Shared", Some("D1")));
		assert_eq!(old_home.subdir_count(), 1);

		cache.relink_child(&child, "D1", "D2");

		assert!(old_home.children().unwrap().is_empty());
		assert_eq!(old_home.subdir_count(), 0);
		assert_eq!(child.parent_id(), "D2");
	}

	#[test]
	fn delete_restores_parent_state() {
		let cache = cache();
		insert(&cache, ItemRecord::dir("D1", "Docs", Some("root")));
		insert(&cache, ItemRecord::file("F1", "a.txt", Some("root")));

		let before_children = cache.root().children().unwrap();
		let before_subdirs = cache.root().subdir_count();

		insert(&cache, ItemRecord::dir("D2", "Temp", Some("root")));
		cache.delete_id("D2");

		assert_eq!(cache.root().children().unwrap(), before_children);
		assert_eq!(cache.root().subdir_count(), before_subdirs);
		assert!(cache.get_id("D2").is_none());
	}

	#[test]
	fn delete_of_unknown_id_is_harmless() {
		let cache = cache();
		cache.delete_id("ghost");
		assert!(cache.get_id("ghost").is_none());
	}

	#[test]
	fn move_id_preserves_reference_and_order() {
		let cache = cache();
		insert(&cache, ItemRecord::file("F1", "a.txt", Some("root")));
		let item = insert(&cache, ItemRecord::file("local-1", "b.txt", Some("root")));
		insert(&cache, ItemRecord::file("F3", "c.txt", Some("root")));

		cache.move_id("local-1", "srv-7").unwrap();

		let moved = cache.get_id("srv-7").unwrap();
		assert!(Arc::ptr_eq(&moved, &item));
		assert_eq!(moved.id(), "srv-7");
		assert!(cache.get_id("local-1").is_none());
		assert_eq!(
			cache.root().children().unwrap(),
			vec!["F1".to_string(), "srv-7".to_string(), "F3".to_string()]
		);
	}

	#[test]
	fn move_id_twice_is_not_an_error() {
		let cache = cache();
		insert(&cache, ItemRecord::file("local-1", "a.txt", Some("root")));
		cache.move_id("local-1", "srv-1").unwrap();
		// Second attempt falls back to the new id.
		cache.move_id("local-1", "srv-1").unwrap();
		assert_eq!(cache.get_id("srv-1").unwrap().id(), "srv-1");
	}

	#[test]
	fn move_id_of_missing_item_fails() {
		let cache = cache();
		assert!(cache.move_id("a", "b").is_err());
	}

	#[test]
	fn concurrent_inserts_link_once() {
		let cache = cache();
		let item = Arc::new(Item::from_record(&ItemRecord::dir("D1", "Docs", Some("root"))));

		std::thread::scope(|scope| {
			for _ in 0..8 {
				let cache = &cache;
				let item = item.clone();
				scope.spawn(move || cache.insert_id("D1", item));
			}
		});

		assert_linked_once(&cache, "root", "D1");
		assert_eq!(cache.root().subdir_count(), 1);
	}
}
