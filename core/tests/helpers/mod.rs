//! Shared fixtures: a scripted in-memory remote drive
#![allow(dead_code)]

use std::{
	collections::{HashMap, VecDeque},
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Arc, Mutex,
	},
};

use async_trait::async_trait;
use cumulus_core::{
	ChildSet, DeltaPage, DriveCache, ItemRecord, RemoteAdapter, RemoteError, SyncConfig,
};

pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Route cache logs through a test subscriber. Honors `RUST_LOG`.
pub fn init_logs() {
	use std::sync::Once;
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.init();
	});
}

pub enum DeltaScript {
	Page(DeltaPage),
	Fail(u16),
}

/// In-memory stand-in for the remote drive. Children listings are served
/// from a scripted tree, delta pages from a queue, and every remote call is
/// counted so tests can assert how lazy the cache really is.
///
/// `get_root` succeeds regardless of the auth flag: cache construction is
/// modeled as happening before credentials may go away.
pub struct MockDrive {
	authed: AtomicBool,
	root: ItemRecord,
	children: Mutex<HashMap<String, Vec<ItemRecord>>>,
	deltas: Mutex<VecDeque<DeltaScript>>,
	children_calls: AtomicUsize,
	delta_calls: AtomicUsize,
	cursors_seen: Mutex<Vec<String>>,
}

impl MockDrive {
	pub fn new() -> Self {
		Self {
			authed: AtomicBool::new(true),
			root: ItemRecord::dir("root", "root", None),
			children: Mutex::new(HashMap::new()),
			deltas: Mutex::new(VecDeque::new()),
			children_calls: AtomicUsize::new(0),
			delta_calls: AtomicUsize::new(0),
			cursors_seen: Mutex::new(Vec::new()),
		}
	}

	pub fn set_authed(&self, authed: bool) {
		self.authed.store(authed, Ordering::SeqCst);
	}

	pub fn add_dir(&self, parent: &str, id: &str, name: &str) {
		let mut children = self.children.lock().unwrap();
		children
			.entry(parent.to_string())
			.or_default()
			.push(ItemRecord::dir(id, name, Some(parent)));
		children.entry(id.to_string()).or_default();
	}

	pub fn add_file(&self, parent: &str, id: &str, name: &str) {
		self.children
			.lock()
			.unwrap()
			.entry(parent.to_string())
			.or_default()
			.push(ItemRecord::file(id, name, Some(parent)));
	}

	pub fn push_delta_page(&self, page: DeltaPage) {
		self.deltas.lock().unwrap().push_back(DeltaScript::Page(page));
	}

	pub fn push_delta_error(&self, status: u16) {
		self.deltas.lock().unwrap().push_back(DeltaScript::Fail(status));
	}

	pub fn children_fetches(&self) -> usize {
		self.children_calls.load(Ordering::SeqCst)
	}

	pub fn delta_fetches(&self) -> usize {
		self.delta_calls.load(Ordering::SeqCst)
	}

	pub fn cursors_seen(&self) -> Vec<String> {
		self.cursors_seen.lock().unwrap().clone()
	}
}

#[async_trait]
impl RemoteAdapter for MockDrive {
	fn has_credentials(&self) -> bool {
		self.authed.load(Ordering::SeqCst)
	}

	async fn get_root(&self) -> Result<ItemRecord, RemoteError> {
		Ok(self.root.clone())
	}

	async fn get_children(&self, id: &str) -> Result<ChildSet, RemoteError> {
		self.children_calls.fetch_add(1, Ordering::SeqCst);
		let value = self
			.children
			.lock()
			.unwrap()
			.get(id)
			.cloned()
			.unwrap_or_default();
		Ok(ChildSet { value })
	}

	async fn poll_delta(&self, cursor: &str) -> Result<DeltaPage, RemoteError> {
		self.delta_calls.fetch_add(1, Ordering::SeqCst);
		self.cursors_seen.lock().unwrap().push(cursor.to_string());

		match self.deltas.lock().unwrap().pop_front() {
			Some(DeltaScript::Page(page)) => Ok(page),
			Some(DeltaScript::Fail(status)) => Err(RemoteError::Api {
				status,
				message: "scripted failure".to_string(),
			}),
			// An idle feed: nothing changed, same terminal cursor again.
			None => Ok(DeltaPage {
				delta_link: Some(format!("{GRAPH_BASE}/me/drive/root/delta?token=idle")),
				..DeltaPage::default()
			}),
		}
	}
}

/// `/Documents/readme.txt`, `/Documents/Reports` and `/Music` on a fresh
/// mock drive.
pub fn standard_drive() -> Arc<MockDrive> {
	let drive = Arc::new(MockDrive::new());
	drive.add_dir("root", "docs", "Documents");
	drive.add_dir("root", "music", "Music");
	drive.add_file("docs", "readme", "readme.txt");
	drive.add_dir("docs", "reports", "Reports");
	drive
}

pub async fn cache_for(drive: &Arc<MockDrive>) -> Arc<DriveCache> {
	DriveCache::new(drive.clone(), SyncConfig::default())
		.await
		.expect("mock root fetch cannot fail")
}

/// A terminal delta page pointing the cursor at `token`.
pub fn terminal_page(records: Vec<ItemRecord>, token: &str) -> DeltaPage {
	DeltaPage {
		value: records,
		delta_link: Some(format!("{GRAPH_BASE}/me/drive/root/delta?token={token}")),
		..DeltaPage::default()
	}
}

/// A continuation delta page pointing at the next page `token`.
pub fn continuation_page(records: Vec<ItemRecord>, token: &str) -> DeltaPage {
	DeltaPage {
		value: records,
		next_link: Some(format!("{GRAPH_BASE}/me/drive/root/delta?token={token}")),
		..DeltaPage::default()
	}
}
