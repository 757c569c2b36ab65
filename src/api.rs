use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{EPIC_PROMOTIONS_URL, USER_AGENT};

/// Build the shared HTTP client used for every upstream call.
///
/// One bounded timeout covers connection and body; a slow upstream surfaces
/// as an ordinary per-source failure, never a hung run.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

/// Client for the storefront's free-promotions catalog.
pub struct EpicApi {
    http: Client,
    locale: String,
    country: String,
}

impl EpicApi {
    pub fn new(http: Client, locale: &str, country: &str) -> Self {
        Self {
            http,
            locale: locale.to_string(),
            country: country.to_string(),
        }
    }

    /// Fetch the current promotional catalog for the configured country.
    ///
    /// Returns every catalog element; eligibility filtering (active giveaway,
    /// price confirmed zero) is the normalizer's job, not the client's.
    pub async fn promotions(&self) -> Result<Vec<EpicElement>> {
        let response: EpicPromotionsResponse = self
            .http
            .get(EPIC_PROMOTIONS_URL)
            .query(&[
                ("locale", self.locale.as_str()),
                ("country", self.country.as_str()),
                ("allowCountries", self.country.as_str()),
            ])
            .send()
            .await
            .context("promotions request failed")?
            .error_for_status()
            .context("promotions request rejected")?
            .json()
            .await
            .context("promotions payload did not match the catalog schema")?;

        let elements = response.data.catalog.search_store.elements;
        debug!("Fetched {} storefront catalog elements", elements.len());
        Ok(elements)
    }
}

#[derive(Debug, Deserialize)]
struct EpicPromotionsResponse {
    data: EpicData,
}

#[derive(Debug, Deserialize)]
struct EpicData {
    #[serde(rename = "Catalog")]
    catalog: EpicCatalog,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpicCatalog {
    search_store: EpicSearchStore,
}

#[derive(Debug, Deserialize)]
struct EpicSearchStore {
    #[serde(default)]
    elements: Vec<EpicElement>,
}

/// One catalog element. Price and promotion blocks are optional in the wire
/// format: non-giveaway elements routinely omit them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicElement {
    pub id: String,
    pub title: String,
    pub price: Option<EpicPrice>,
    pub promotions: Option<EpicPromotions>,
    #[serde(default)]
    pub key_images: Vec<EpicKeyImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicPrice {
    pub total_price: Option<EpicTotalPrice>,
}

/// Prices arrive in minor units (kuruş/cents); `discount_price == 0` is the
/// giveaway signal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicTotalPrice {
    pub discount_price: Option<i64>,
    pub original_price: Option<i64>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicPromotions {
    pub promotional_offers: Option<Vec<EpicPromoGroup>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicPromoGroup {
    pub promotional_offers: Option<Vec<EpicPromoWindow>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicPromoWindow {
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpicKeyImage {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Option<String>,
}

/// Client for the social listing feed of community-reported giveaways.
pub struct FeedApi {
    http: Client,
    url: Url,
}

impl FeedApi {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Fetch the most recent posts from the listing.
    pub async fn recent_posts(&self) -> Result<Vec<FeedPost>> {
        let listing: FeedListing = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .context("feed request failed")?
            .error_for_status()
            .context("feed request rejected")?
            .json()
            .await
            .context("feed payload did not match the listing schema")?;

        let posts: Vec<FeedPost> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect();
        debug!("Fetched {} feed posts", posts.len());
        Ok(posts)
    }
}

#[derive(Debug, Deserialize)]
struct FeedListing {
    data: FeedListingData,
}

#[derive(Debug, Deserialize)]
struct FeedListingData {
    #[serde(default)]
    children: Vec<FeedChild>,
}

#[derive(Debug, Deserialize)]
struct FeedChild {
    data: FeedPost,
}

/// One listing post. The core only consumes id, title and link URL.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPost {
    pub id: String,
    pub title: String,
    pub url: String,
}
