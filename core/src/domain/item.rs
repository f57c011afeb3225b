//! Item - one node of the in-memory drive tree
//!
//! An Item is shared: the registry holds the authoritative `Arc`, parents
//! refer to children by id only, and every mutable field lives behind the
//! item's own reader/writer lock. Whenever an operation needs both a parent
//! and a child lock, the parent's is acquired first.

use parking_lot::{RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::cloud::adapter::ItemRecord;

/// Mutable fields of an [`Item`], guarded by its lock.
#[derive(Debug)]
pub(crate) struct ItemState {
	/// Server-assigned id. Reassigned in place when a provisional local id
	/// is reconciled to its canonical one.
	pub(crate) id: String,
	/// Display name; case is preserved, path lookups compare lowercased.
	pub(crate) name: String,
	/// Id of the containing directory; empty only for the root.
	pub(crate) parent_id: String,
	/// Child ids in remote listing order. `None` means "never fetched",
	/// which is distinct from an empty directory.
	pub(crate) children: Option<Vec<String>>,
	/// Number of ids in `children` that are directories.
	pub(crate) subdir_count: u32,
}

/// In-memory node representing one remote object (file or directory).
#[derive(Debug)]
pub struct Item {
	is_dir: bool,
	state: RwLock<ItemState>,
}

impl Item {
	/// Build an item from a remote record. Children start unpopulated.
	pub fn from_record(record: &ItemRecord) -> Self {
		Self {
			is_dir: record.is_dir(),
			state: RwLock::new(ItemState {
				id: record.id.clone(),
				name: record.name.clone(),
				parent_id: record.parent_id().unwrap_or_default().to_string(),
				children: None,
				subdir_count: 0,
			}),
		}
	}

	/// Build an item created locally, before the server has seen it. It gets
	/// a provisional id; a locally created directory has no remote content,
	/// so it is born populated and empty.
	pub fn new_local(name: &str, is_dir: bool) -> Self {
		Self {
			is_dir,
			state: RwLock::new(ItemState {
				id: format!("local-{}", Uuid::new_v4()),
				name: name.to_string(),
				parent_id: String::new(),
				children: is_dir.then(Vec::new),
				subdir_count: 0,
			}),
		}
	}

	pub fn id(&self) -> String {
		self.state.read().id.clone()
	}

	pub fn name(&self) -> String {
		self.state.read().name.clone()
	}

	pub fn parent_id(&self) -> String {
		self.state.read().parent_id.clone()
	}

	pub fn is_dir(&self) -> bool {
		self.is_dir
	}

	/// Rename the item. Touches only this item, never tree structure;
	/// re-linking is the tree maintainer's job.
	pub fn set_name(&self, name: &str) {
		self.state.write().name = name.to_string();
	}

	/// Snapshot of the child id list, `None` while unpopulated.
	pub fn children(&self) -> Option<Vec<String>> {
		self.state.read().children.clone()
	}

	pub fn subdir_count(&self) -> u32 {
		self.state.read().subdir_count
	}

	pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ItemState> {
		self.state.write()
	}
}

/// Key used for name lookups within a directory. The remote namespace is
/// case-insensitive, so children are mapped by lowercased name while the
/// item keeps the server-reported case for display.
pub(crate) fn name_key(name: &str) -> String {
	name.to_lowercase()
}
