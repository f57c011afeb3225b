//! Delta synchronizer - applies the remote change feed to the cache
//!
//! One long-lived task per cache. Each cycle drains the feed page by page
//! until the remote hands back a terminal cursor, then sleeps for the
//! configured interval. The cursor always advances past applied pages, so a
//! restart of the loop resumes where it left off.

use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::adapter::ItemRecord;
use crate::cache::DriveCache;

/// What a single poll decided about the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
	/// More pages are pending; poll again immediately.
	Continue,
	/// Terminal cursor reached (or a transport error was logged); wait for
	/// the next interval.
	Stop,
}

/// Background loop driving [`DriveCache::sync_once`] forever.
pub async fn run_actor(cache: Arc<DriveCache>, shutdown: CancellationToken) {
	let poll_interval = cache.config().poll_interval();
	info!(?poll_interval, "delta synchronizer started");

	let mut ticker = interval(poll_interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
	// The first tick completes immediately; consume it so the loop below
	// polls right away and then settles into the configured cadence.
	ticker.tick().await;

	loop {
		cache.sync_once().await;

		tokio::select! {
			_ = shutdown.cancelled() => {
				info!("delta synchronizer stopping");
				return;
			}
			_ = ticker.tick() => {}
		}
	}
}

/// Fetch and apply one page of the change feed at the current cursor.
pub(crate) async fn poll_deltas(cache: &DriveCache) -> PollOutcome {
	let cursor = cache.delta_cursor();
	let page = match cache.adapter().poll_delta(&cursor).await {
		Ok(page) => page,
		Err(error) => {
			error!(%error, %cursor, "delta poll failed, waiting for the next cycle");
			return PollOutcome::Stop;
		}
	};

	// The remote may repeat an id within a page; only its last record
	// reflects the item's current state.
	for record in dedup_last_wins(page.value) {
		apply_delta(cache, &record);
	}

	let base_url = &cache.config().base_url;
	if let Some(next) = page.next_link {
		cache.registry().set_delta_cursor(strip_cursor(&next, base_url));
		PollOutcome::Continue
	} else if let Some(terminal) = page.delta_link {
		cache
			.registry()
			.set_delta_cursor(strip_cursor(&terminal, base_url));
		PollOutcome::Stop
	} else {
		error!("delta page carried neither a next page nor a terminal cursor");
		PollOutcome::Stop
	}
}

/// Reconcile one change record with local state.
fn apply_delta(cache: &DriveCache, record: &ItemRecord) {
	let Some(parent_id) = record.parent_id() else {
		// The drive root itself showing up in the feed.
		return;
	};

	if cache.get_id(parent_id).is_none() {
		// Unknown subtree; it will be fetched lazily if anyone looks.
		debug!(id = %record.id, parent_id, "skipping delta below unknown parent");
		return;
	}

	if record.is_tombstone() {
		debug!(id = %record.id, "applying remote deletion");
		cache.delete_id(&record.id);
	}

	// TODO: reconcile non-tombstone changes (renames, moves, metadata) in
	// place instead of waiting for the next listing fetch of the parent.
}

/// Delta links arrive as absolute URLs; only the part after the API base is
/// worth keeping as the cursor.
fn strip_cursor<'a>(link: &'a str, base_url: &str) -> &'a str {
	link.strip_prefix(base_url).unwrap_or(link)
}

fn dedup_last_wins(records: Vec<ItemRecord>) -> Vec<ItemRecord> {
	let mut seen = std::collections::HashSet::new();
	let mut kept: Vec<ItemRecord> = records
		.into_iter()
		.rev()
		.filter(|record| seen.insert(record.id.clone()))
		.collect();
	kept.reverse();
	kept
}
