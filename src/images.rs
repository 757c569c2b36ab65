use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::STEAM_SEARCH_URL;

/// Looks up a cover image for an offer that arrived without one.
///
/// Resolution is best effort: a lookup failure downgrades the notification
/// to plain text, it never blocks the offer.
#[async_trait]
pub trait ResolveImage: Send + Sync {
    async fn resolve(&self, title: &str) -> Option<String>;
}

/// Image lookup backed by the Steam store search endpoint.
pub struct SteamImageResolver {
    http: Client,
    country: String,
}

impl SteamImageResolver {
    pub fn new(http: Client, country: impl Into<String>) -> Self {
        Self {
            http,
            country: country.into(),
        }
    }

    async fn search(&self, title: &str) -> Result<Option<String>> {
        let response: StoreSearchResponse = self
            .http
            .get(STEAM_SEARCH_URL)
            .query(&[("term", title), ("l", "english"), ("cc", &self.country)])
            .send()
            .await
            .context("store search request failed")?
            .error_for_status()
            .context("store search request rejected")?
            .json()
            .await
            .context("store search payload did not match the expected schema")?;
        Ok(response
            .items
            .into_iter()
            .find_map(|item| item.tiny_image))
    }
}

#[async_trait]
impl ResolveImage for SteamImageResolver {
    async fn resolve(&self, title: &str) -> Option<String> {
        match self.search(title).await {
            Ok(url) => url,
            Err(e) => {
                debug!("Image search failed for \"{title}\": {e:#}");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoreSearchResponse {
    #[serde(default)]
    items: Vec<StoreSearchItem>,
}

#[derive(Debug, Deserialize)]
struct StoreSearchItem {
    tiny_image: Option<String>,
}
