use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::api::{EpicApi, FeedApi};
use crate::images::ResolveImage;
use crate::normalize;
use crate::types::Offer;

/// One upstream catalog of potentially free games.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable display name, used in logs and the report status block.
    fn name(&self) -> &str;

    /// Fetch the current batch of eligible offers. An `Err` marks this
    /// source as failed for the scan; other sources are unaffected.
    async fn fetch(&self) -> Result<Vec<Offer>>;
}

/// Attach a cover image to an offer that arrived without one.
///
/// The lookup uses the raw upstream title, not the escaped offer title,
/// so search terms stay free of Markdown backslashes.
async fn enrich(mut offer: Offer, raw_title: &str, resolver: &dyn ResolveImage) -> Offer {
    if offer.image_url.is_none() {
        offer.image_url = resolver.resolve(raw_title).await;
    }
    offer
}

/// Weekly giveaways from the Epic Games catalog.
pub struct EpicSource {
    api: EpicApi,
    claim_url: String,
    resolver: Arc<dyn ResolveImage>,
}

impl EpicSource {
    pub fn new(
        api: EpicApi,
        claim_url: impl Into<String>,
        resolver: Arc<dyn ResolveImage>,
    ) -> Self {
        Self {
            api,
            claim_url: claim_url.into(),
            resolver,
        }
    }
}

#[async_trait]
impl Source for EpicSource {
    fn name(&self) -> &str {
        "Epic Games"
    }

    async fn fetch(&self) -> Result<Vec<Offer>> {
        let elements = self.api.promotions().await?;
        let mut offers = Vec::new();
        for element in &elements {
            let Some(offer) = normalize::epic_offer(element, &self.claim_url) else {
                continue;
            };
            offers.push(enrich(offer, &element.title, self.resolver.as_ref()).await);
        }
        debug!(
            "Epic catalog: {} elements, {} currently free",
            elements.len(),
            offers.len()
        );
        Ok(offers)
    }
}

/// Community-reported giveaways from the aggregator feed.
pub struct FeedSource {
    api: FeedApi,
    resolver: Arc<dyn ResolveImage>,
}

impl FeedSource {
    pub fn new(api: FeedApi, resolver: Arc<dyn ResolveImage>) -> Self {
        Self { api, resolver }
    }
}

#[async_trait]
impl Source for FeedSource {
    fn name(&self) -> &str {
        "Reddit"
    }

    async fn fetch(&self) -> Result<Vec<Offer>> {
        let posts = self.api.recent_posts().await?;
        let mut offers = Vec::new();
        for post in &posts {
            let Some(offer) = normalize::feed_offer(post) else {
                continue;
            };
            offers.push(enrich(offer, &post.title, self.resolver.as_ref()).await);
        }
        debug!(
            "Feed: {} posts, {} look like live giveaways",
            posts.len(),
            offers.len()
        );
        Ok(offers)
    }
}
