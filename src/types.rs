use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// A single free-to-claim game promotion discovered from an upstream source.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    /// Stable identifier, unique per source namespace (`epic_…`, `feed_…`).
    /// Never reused once it has been ledgered.
    pub id: String,
    /// Display title, already escaped for the sink's MarkdownV2 dialect.
    pub title: String,
    /// Pre-promotion price in major units, rounded to two decimals.
    /// `0.0` when the source publishes no figure.
    pub original_price: f64,
    pub currency: Currency,
    pub platform: Platform,
    /// Where the user redeems the offer.
    pub claim_url: String,
    /// Cover image, native to the source or found by the image resolver.
    pub image_url: Option<String>,
    /// End of the promotion window, when the source publishes one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Offer {
    /// Ledger row for this offer, stamped with the discovery date.
    pub fn ledger_entry(&self, discovered_at: NaiveDate) -> LedgerEntry {
        LedgerEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            amount: self.original_price,
            currency: self.currency,
            discovered_at,
        }
    }
}

/// Currencies the ledger keeps separate running totals for.
///
/// `Unknown` covers sources that confirm an offer is free without quoting a
/// pre-promotion price; such entries carry amount `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Currency {
    Tl,
    Usd,
    Unknown,
}

impl Currency {
    /// Code as it appears in ledger lines and messages.
    pub fn code(self) -> &'static str {
        match self {
            Currency::Tl => "TL",
            Currency::Usd => "USD",
            Currency::Unknown => "Free",
        }
    }

    /// Parse a currency code from a ledger line or an upstream payload.
    /// Accepts the ISO `TRY` the storefront reports for lira prices.
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "TL" | "TRY" => Currency::Tl,
            "USD" => Currency::Usd,
            _ => Currency::Unknown,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Store/platform an offer is claimed on, detected from source metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    EpicGames,
    Steam,
    Gog,
    Ubisoft,
    ItchIo,
    Amazon,
    Other,
}

impl Platform {
    /// Human-facing label, used in messages and claim buttons.
    pub fn label(self) -> &'static str {
        match self {
            Platform::EpicGames => "Epic Games",
            Platform::Steam => "Steam",
            Platform::Gog => "GOG",
            Platform::Ubisoft => "Ubisoft",
            Platform::ItchIo => "itch.io",
            Platform::Amazon => "Amazon",
            Platform::Other => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One persisted ledger row: an offer that was successfully notified.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub currency: Currency,
    pub discovered_at: NaiveDate,
}

/// Per-source outcome of one scan run. Independent between sources: one
/// source failing never changes another source's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// At least one new offer was delivered this run.
    Found,
    /// The source was scanned cleanly and produced nothing new.
    NoneFound,
    /// The source was unreachable or returned a malformed payload.
    Failed,
}

impl ScanStatus {
    /// Symbol used in the report's status block.
    pub fn symbol(self) -> &'static str {
        match self {
            ScanStatus::Found => "✅",
            ScanStatus::NoneFound => "❌",
            ScanStatus::Failed => "⚠️",
        }
    }
}
