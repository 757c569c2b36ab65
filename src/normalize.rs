use chrono::{DateTime, Utc};

use crate::api::{EpicElement, EpicKeyImage, EpicPromoWindow, EpicTotalPrice, FeedPost};
use crate::types::{Currency, Offer, Platform};

/// Characters the sink's MarkdownV2 dialect treats as markup.
const MARKDOWN_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Ordered platform detection rules; first match wins. The order is policy:
/// it must stay stable so the same input classifies identically run-to-run.
const PLATFORM_RULES: &[(Platform, &[&str])] = &[
    (Platform::EpicGames, &["epic"]),
    (Platform::Steam, &["steam"]),
    (Platform::Gog, &["gog"]),
    (Platform::Ubisoft, &["ubisoft", "uplay"]),
    (Platform::ItchIo, &["itch.io", "itch"]),
    (Platform::Amazon, &["amazon", "prime gaming"]),
];

/// Feed posts must carry one of these to count as a claimable offer.
const FREE_KEYWORDS: &[&str] = &["100% off", "free", "giveaway"];

/// Feed posts carrying any of these are dropped even when a free keyword
/// matches (dead links, partial giveaways, test builds).
const EXCLUDED_KEYWORDS: &[&str] = &["expired", "ended", "dlc", "beta", "demo"];

/// Minor units per major unit in storefront prices (kuruş/cents).
const PRICE_SCALE: f64 = 100.0;

/// Key image kinds usable as a notification cover, in payload order.
const COVER_IMAGE_KINDS: &[&str] = &["OfferImageWide", "Thumbnail"];

/// Escape every MarkdownV2-reserved character so untrusted text can be
/// embedded in a message without breaking the markup. Applied once here;
/// the sink never escapes.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_RESERVED.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Classify free text against the ordered platform rule table.
/// Best-effort: case-insensitive substring match, unknown storefronts land
/// on [`Platform::Other`].
pub fn detect_platform(text: &str) -> Platform {
    let lower = text.to_lowercase();
    for (platform, keywords) in PLATFORM_RULES {
        if keywords.iter().any(|keyword| lower.contains(keyword)) {
            return *platform;
        }
    }
    Platform::Other
}

/// Map one storefront catalog element to an [`Offer`].
///
/// Returns `None` when the element is not an active giveaway: no promotional
/// window, or a discount price other than exactly zero. That is eligibility
/// filtering, not an error; ineligible elements are dropped silently.
pub fn epic_offer(element: &EpicElement, claim_url: &str) -> Option<Offer> {
    let window = active_window(element)?;
    let total = element.price.as_ref()?.total_price.as_ref()?;
    // The giveaway must be confirmed free; an absent discount field is not
    // confirmation.
    if total.discount_price != Some(0) {
        return None;
    }

    let (original_price, currency) = original_price(total);
    Some(Offer {
        id: format!("epic_{}", element.id),
        title: escape_markdown(&element.title),
        original_price,
        currency,
        platform: Platform::EpicGames,
        claim_url: claim_url.to_string(),
        image_url: cover_image(&element.key_images),
        expires_at: promotion_end(window),
    })
}

/// Map one feed post to an [`Offer`].
///
/// Eligibility is keyword-based: the title must contain a free-offer keyword
/// and none of the excluded ones. The feed publishes no prices, so the offer
/// carries amount `0.0` with [`Currency::Unknown`] and no expiry.
pub fn feed_offer(post: &FeedPost) -> Option<Offer> {
    let lower = post.title.to_lowercase();
    if !FREE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return None;
    }
    if EXCLUDED_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return None;
    }

    Some(Offer {
        id: format!("feed_{}", post.id),
        title: escape_markdown(&post.title),
        original_price: 0.0,
        currency: Currency::Unknown,
        platform: detect_platform(&post.title),
        claim_url: post.url.clone(),
        image_url: None,
        expires_at: None,
    })
}

/// First concrete promotion window, if the element is being given away now.
fn active_window(element: &EpicElement) -> Option<&EpicPromoWindow> {
    element
        .promotions
        .as_ref()?
        .promotional_offers
        .as_ref()?
        .iter()
        .flat_map(|group| group.promotional_offers.iter().flatten())
        .next()
}

/// Pre-promotion price in major units. A missing figure normalizes to zero
/// with an unknown currency rather than failing the offer.
fn original_price(total: &EpicTotalPrice) -> (f64, Currency) {
    match total.original_price {
        Some(minor) => {
            let amount = round2(minor as f64 / PRICE_SCALE);
            let currency = Currency::from_code(total.currency_code.as_deref().unwrap_or(""));
            (amount, currency)
        }
        None => (0.0, Currency::Unknown),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First key image usable as a cover, in payload order (matches the
/// storefront's own ordering preference).
fn cover_image(images: &[EpicKeyImage]) -> Option<String> {
    images
        .iter()
        .find(|image| COVER_IMAGE_KINDS.contains(&image.kind.as_str()))
        .and_then(|image| image.url.clone())
}

fn promotion_end(window: &EpicPromoWindow) -> Option<DateTime<Utc>> {
    let raw = window.end_date.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|end| end.with_timezone(&Utc))
}
