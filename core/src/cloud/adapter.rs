//! Remote drive adapter boundary
//!
//! The cache never talks HTTP itself; it goes through [`RemoteAdapter`].
//! The records here mirror the wire shape of the drive API (camelCase JSON,
//! facet objects marking directories and tombstones), so an adapter can
//! deserialize responses straight into them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by a remote adapter. These pass through the cache
/// verbatim; retry and backoff are the adapter's business.
#[derive(Error, Debug)]
pub enum RemoteError {
	#[error("remote credentials are missing or expired")]
	Unauthenticated,

	#[error("http transport failure: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("remote api returned {status}: {message}")]
	Api { status: u16, message: String },

	#[error("malformed remote payload: {0}")]
	Payload(#[from] serde_json::Error),
}

/// One item as reported by the remote service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub parent_reference: Option<ParentReference>,
	/// Present iff the item is a directory.
	#[serde(default)]
	pub folder: Option<FolderFacet>,
	/// Present iff the record is a tombstone.
	#[serde(default)]
	pub deleted: Option<DeletedFacet>,
	#[serde(default)]
	pub last_modified_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
	pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
	#[serde(default)]
	pub child_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFacet {
	#[serde(default)]
	pub state: Option<String>,
}

impl ItemRecord {
	/// A plain file record, mostly useful to adapters and tests.
	pub fn file(id: &str, name: &str, parent: Option<&str>) -> Self {
		Self {
			id: id.to_string(),
			name: name.to_string(),
			parent_reference: parent.map(|id| ParentReference { id: id.to_string() }),
			folder: None,
			deleted: None,
			last_modified_date_time: None,
		}
	}

	/// A directory record.
	pub fn dir(id: &str, name: &str, parent: Option<&str>) -> Self {
		Self {
			folder: Some(FolderFacet::default()),
			..Self::file(id, name, parent)
		}
	}

	/// A deletion tombstone for `id`.
	pub fn tombstone(id: &str, parent: &str) -> Self {
		Self {
			deleted: Some(DeletedFacet {
				state: Some("deleted".to_string()),
			}),
			..Self::file(id, "", Some(parent))
		}
	}

	pub fn is_dir(&self) -> bool {
		self.folder.is_some()
	}

	pub fn is_tombstone(&self) -> bool {
		self.deleted.is_some()
	}

	pub fn parent_id(&self) -> Option<&str> {
		self.parent_reference.as_ref().map(|p| p.id.as_str())
	}
}

/// Response of a children listing: `{ "value": [ ... ] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildSet {
	#[serde(default)]
	pub value: Vec<ItemRecord>,
}

/// One page of the delta feed. On success exactly one of `next_link`
/// (more pages follow) or `delta_link` (terminal cursor) is populated,
/// both as absolute URLs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaPage {
	#[serde(default)]
	pub value: Vec<ItemRecord>,
	#[serde(default, rename = "@odata.nextLink")]
	pub next_link: Option<String>,
	#[serde(default, rename = "@odata.deltaLink")]
	pub delta_link: Option<String>,
}

/// Interface the cache consumes to reach the remote drive.
///
/// Implementations own authentication, timeouts and retries. The cache asks
/// [`has_credentials`](RemoteAdapter::has_credentials) before attempting any
/// lazy fetch so it can fail with a clean diagnostic instead of a 401.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
	fn has_credentials(&self) -> bool;

	/// Fetch the drive root. Called once, when the cache is constructed.
	async fn get_root(&self) -> Result<ItemRecord, RemoteError>;

	/// List the children of a directory by id.
	async fn get_children(&self, id: &str) -> Result<ChildSet, RemoteError>;

	/// Fetch one page of the change feed at `cursor`.
	async fn poll_delta(&self, cursor: &str) -> Result<DeltaPage, RemoteError>;
}
