use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use freegame_watch::api::{build_client, EpicApi, FeedApi};
use freegame_watch::config::{AppConfig, CONFIG_PATH};
use freegame_watch::engine;
use freegame_watch::images::{ResolveImage, SteamImageResolver};
use freegame_watch::notify::{LogNotifier, Notify, TelegramNotifier};
use freegame_watch::report;
use freegame_watch::sources::{EpicSource, FeedSource, Source};
use freegame_watch::EPIC_FREE_GAMES_URL;

#[derive(Parser)]
#[command(name = "watch", about = "Free game watcher and Telegram announcer")]
struct Args {
    /// Config file path
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Report file path (overrides the config)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Scan and log findings without announcing or touching the report
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;
    info!("Loaded config from {}", args.config.display());

    let report_path = args
        .report
        .unwrap_or_else(|| PathBuf::from(&config.settings.report_path));
    let feed_url: Url = config
        .settings
        .feed_url
        .parse()
        .with_context(|| format!("invalid feed url {}", config.settings.feed_url))?;

    let http = build_client(Duration::from_secs(config.settings.http_timeout_secs))?;
    let resolver: Arc<dyn ResolveImage> = Arc::new(SteamImageResolver::new(
        http.clone(),
        config.settings.epic_country.clone(),
    ));

    let claim_url = EPIC_FREE_GAMES_URL.replace("{locale}", &config.settings.epic_locale);
    let sources: Vec<Box<dyn Source>> = vec![
        Box::new(EpicSource::new(
            EpicApi::new(
                http.clone(),
                &config.settings.epic_locale,
                &config.settings.epic_country,
            ),
            claim_url,
            Arc::clone(&resolver),
        )),
        Box::new(FeedSource::new(
            FeedApi::new(http.clone(), feed_url),
            Arc::clone(&resolver),
        )),
    ];

    let sink: Box<dyn Notify> = if args.dry_run {
        info!("Dry run: announcements are logged, nothing is sent");
        Box::new(LogNotifier)
    } else {
        let (token, chat_id) = config.telegram_credentials()?;
        Box::new(TelegramNotifier::new(http, token, chat_id))
    };

    let mut ledger = report::load(&report_path)?;
    info!(
        "Loaded {} known offer(s) from {}",
        ledger.len(),
        report_path.display()
    );

    let now = chrono::Utc::now();
    let statuses = engine::run_scan(&mut ledger, &sources, sink.as_ref(), now.date_naive()).await;
    for (source, status) in &statuses {
        info!("{source}: {status:?}");
    }

    if args.dry_run {
        info!("Dry run: report left untouched");
    } else {
        report::store(&report_path, &ledger, &statuses, now)?;
        info!(
            "Report with {} offer(s) written to {}",
            ledger.len(),
            report_path.display()
        );
    }

    Ok(())
}
