use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::normalize::escape_markdown;
use crate::types::Offer;
use crate::TELEGRAM_API_BASE;

/// Delivers one announcement per offer. An `Err` means the offer was not
/// delivered and must not be recorded; it will be retried on the next scan.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send(&self, offer: &Offer) -> Result<()>;
}

/// MarkdownV2 announcement text for an offer.
///
/// The title arrives pre-escaped; everything composed here (price, expiry,
/// platform label) is escaped at this boundary.
pub fn offer_message(offer: &Offer) -> String {
    let mut message = format!("*\\[{}\\]*", offer.title);

    let mut body: Vec<String> = Vec::new();
    if offer.original_price > 0.0 {
        body.push(format!(
            "💰 *Old price:* {} {}",
            escape_markdown(&format!("{:.2}", offer.original_price)),
            offer.currency.code()
        ));
    }
    if let Some(expires_at) = offer.expires_at {
        body.push(format!(
            "⏳ *Ends:* {}",
            escape_markdown(&expires_at.format("%d %B %H:%M UTC").to_string())
        ));
    }
    if !body.is_empty() {
        message.push_str("\n\n");
        message.push_str(&body.join("\n"));
    }

    message.push_str("\n\n🎮 Platform: ");
    message.push_str(&escape_markdown(offer.platform.label()));
    message
}

/// Inline keyboard with a single claim button pointing at the offer page.
fn claim_keyboard(offer: &Offer) -> serde_json::Value {
    serde_json::json!({
        "inline_keyboard": [[{
            "text": format!("🎮 Claim on {}", offer.platform.label()),
            "url": offer.claim_url,
        }]]
    })
}

/// Announcement sink backed by the Telegram Bot API.
pub struct TelegramNotifier {
    http: Client,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http: Client, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.token)
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<()> {
        let response: TelegramResponse = self
            .http
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?
            .json()
            .await
            .with_context(|| format!("telegram {method} response was not valid JSON"))?;
        if !response.ok {
            bail!(
                "telegram {method} rejected: {}",
                response
                    .description
                    .unwrap_or_else(|| "no description".to_string())
            );
        }
        Ok(())
    }

    async fn send_photo(&self, offer: &Offer, photo: &str) -> Result<()> {
        self.call(
            "sendPhoto",
            serde_json::json!({
                "chat_id": self.chat_id,
                "photo": photo,
                "caption": offer_message(offer),
                "parse_mode": "MarkdownV2",
                "reply_markup": claim_keyboard(offer),
            }),
        )
        .await
    }

    async fn send_text(&self, offer: &Offer) -> Result<()> {
        self.call(
            "sendMessage",
            serde_json::json!({
                "chat_id": self.chat_id,
                "text": offer_message(offer),
                "parse_mode": "MarkdownV2",
                "reply_markup": claim_keyboard(offer),
            }),
        )
        .await
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn send(&self, offer: &Offer) -> Result<()> {
        if let Some(photo) = &offer.image_url {
            match self.send_photo(offer, photo).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Photo announcement for {} failed: {e:#}; falling back to text",
                        offer.id
                    );
                }
            }
        }
        self.send_text(offer).await
    }
}

/// Sink for dry runs. Logs what would have been announced and reports
/// success, so the scan path can be exercised without a bot token.
pub struct LogNotifier;

#[async_trait]
impl Notify for LogNotifier {
    async fn send(&self, offer: &Offer) -> Result<()> {
        info!("[dry-run] Would announce {} ({})", offer.title, offer.id);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}
