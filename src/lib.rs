pub mod api;
pub mod config;
pub mod engine;
pub mod images;
pub mod ledger;
pub mod normalize;
pub mod notify;
pub mod report;
pub mod sources;
pub mod types;

/// Epic free-games promotions endpoint (public, no auth required)
pub const EPIC_PROMOTIONS_URL: &str =
    "https://store-site-backend-static.ak.epicgames.com/freeGamesPromotions";

/// Epic store page listing the current giveaways; `{locale}` is substituted
/// from config, e.g. `tr` or `en-US`
pub const EPIC_FREE_GAMES_URL: &str = "https://store.epicgames.com/{locale}/free-games";

/// Default community feed of giveaway reports across stores
pub const FEED_URL: &str = "https://www.reddit.com/r/FreeGameFindings/new.json?limit=50";

/// Steam store search endpoint, used to look up cover images
pub const STEAM_SEARCH_URL: &str = "https://store.steampowered.com/api/storesearch";

/// Telegram Bot API base URL
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// User agent for all upstream requests; some feeds reject the default one
pub const USER_AGENT: &str = concat!("freegame-watch/", env!("CARGO_PKG_VERSION"));
