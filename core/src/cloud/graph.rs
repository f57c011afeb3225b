//! Reference [`RemoteAdapter`] backed by a Graph-style HTTP API
//!
//! Token acquisition and refresh stay outside this crate; the adapter pulls
//! a bearer token from a [`TokenSource`] on every request. No retries here
//! either, so transport failures reach the cache verbatim.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::adapter::{ChildSet, DeltaPage, ItemRecord, RemoteAdapter, RemoteError};

/// Where the adapter gets its bearer token. `None` means "no credentials
/// right now" and turns remote access into a clean [`RemoteError::Unauthenticated`].
pub trait TokenSource: Send + Sync {
	fn access_token(&self) -> Option<String>;
}

/// A fixed token, mostly for tests and short-lived tools.
impl TokenSource for String {
	fn access_token(&self) -> Option<String> {
		(!self.is_empty()).then(|| self.clone())
	}
}

pub struct GraphAdapter {
	http: reqwest::Client,
	base_url: String,
	tokens: Arc<dyn TokenSource>,
}

impl GraphAdapter {
	pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self {
			http: reqwest::Client::new(),
			base_url,
			tokens,
		}
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Cursors are stored relative to the base URL; "latest" is the
	/// sentinel asking the feed to start from the drive's current state.
	fn delta_url(&self, cursor: &str) -> String {
		if cursor.starts_with("http") {
			cursor.to_string()
		} else if cursor.starts_with('/') {
			self.endpoint(cursor)
		} else {
			self.endpoint(&format!("/me/drive/root/delta?token={cursor}"))
		}
	}

	async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, RemoteError> {
		let token = self
			.tokens
			.access_token()
			.ok_or(RemoteError::Unauthenticated)?;

		let response = self.http.get(url).bearer_auth(token).send().await?;
		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(RemoteError::Api {
				status: status.as_u16(),
				message,
			});
		}

		let body = response.text().await?;
		Ok(serde_json::from_str(&body)?)
	}
}

#[async_trait]
impl RemoteAdapter for GraphAdapter {
	fn has_credentials(&self) -> bool {
		self.tokens.access_token().is_some()
	}

	async fn get_root(&self) -> Result<ItemRecord, RemoteError> {
		self.get_json(self.endpoint("/me/drive/root")).await
	}

	async fn get_children(&self, id: &str) -> Result<ChildSet, RemoteError> {
		self.get_json(self.endpoint(&format!("/me/drive/items/{id}/children")))
			.await
	}

	async fn poll_delta(&self, cursor: &str) -> Result<DeltaPage, RemoteError> {
		self.get_json(self.delta_url(cursor)).await
	}
}
