use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::notify::Notify;
use crate::sources::Source;
use crate::types::ScanStatus;

/// Run one scan across all sources, announcing and recording every offer
/// the ledger has not seen before. Returns one status per source name.
///
/// Sources are isolated from each other: a failing fetch marks that source
/// `Failed` and the scan moves on.
pub async fn run_scan(
    ledger: &mut Ledger,
    sources: &[Box<dyn Source>],
    sink: &dyn Notify,
    today: NaiveDate,
) -> BTreeMap<String, ScanStatus> {
    let mut statuses = BTreeMap::new();
    for source in sources {
        let status = scan_source(ledger, source.as_ref(), sink, today).await;
        statuses.insert(source.name().to_string(), status);
    }
    statuses
}

/// Scan a single source.
///
/// An offer enters the ledger only after its announcement was delivered;
/// a delivery failure leaves it unrecorded so the next scan retries it.
async fn scan_source(
    ledger: &mut Ledger,
    source: &dyn Source,
    sink: &dyn Notify,
    today: NaiveDate,
) -> ScanStatus {
    let offers = match source.fetch().await {
        Ok(offers) => offers,
        Err(e) => {
            warn!("{} scan failed: {e:#}", source.name());
            return ScanStatus::Failed;
        }
    };

    let mut delivered = 0usize;
    for offer in offers {
        if ledger.contains(&offer.id) {
            debug!("Skipping {} (already announced)", offer.id);
            continue;
        }
        if let Err(e) = sink.send(&offer).await {
            warn!(
                "Announcement of {} failed, left for the next scan: {e:#}",
                offer.id
            );
            continue;
        }
        match ledger.record(offer.ledger_entry(today)) {
            Ok(()) => {
                info!("Announced {} ({})", offer.title, offer.id);
                delivered += 1;
            }
            // Unreachable after the contains check above, but a delivered
            // announcement must never abort the scan.
            Err(e) => warn!("{} announced but not recorded: {e}", offer.id),
        }
    }

    if delivered > 0 {
        ScanStatus::Found
    } else {
        ScanStatus::NoneFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, Offer, Platform};
    use anyhow::{anyhow, bail, Result};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    fn offer(id: &str, title: &str, price: f64, currency: Currency) -> Offer {
        Offer {
            id: id.to_string(),
            title: title.to_string(),
            original_price: price,
            currency,
            platform: Platform::EpicGames,
            claim_url: "https://store.epicgames.com/tr/free-games".to_string(),
            image_url: None,
            expires_at: None,
        }
    }

    struct StaticSource {
        name: &'static str,
        offers: Vec<Offer>,
    }

    #[async_trait]
    impl Source for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<Vec<Offer>> {
            Ok(self.offers.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl Source for FailingSource {
        fn name(&self) -> &str {
            "Broken"
        }

        async fn fetch(&self) -> Result<Vec<Offer>> {
            Err(anyhow!("upstream timed out"))
        }
    }

    struct MockSink {
        sent: Mutex<Vec<String>>,
        reject: HashSet<String>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject: HashSet::new(),
            }
        }

        fn rejecting(ids: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject: ids.iter().map(|id| id.to_string()).collect(),
            }
        }

        fn sent_ids(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notify for MockSink {
        async fn send(&self, offer: &Offer) -> Result<()> {
            if self.reject.contains(&offer.id) {
                bail!("chat unavailable");
            }
            self.sent.lock().unwrap().push(offer.id.clone());
            Ok(())
        }
    }

    fn single(source: StaticSource) -> Vec<Box<dyn Source>> {
        vec![Box::new(source)]
    }

    // ── first scan ─────────────────────────────────────────────────

    #[tokio::test]
    async fn first_scan_announces_and_records() {
        let mut ledger = Ledger::new();
        let sources = single(StaticSource {
            name: "Epic Games",
            offers: vec![offer("epic_123", "Test Game", 19.99, Currency::Tl)],
        });
        let sink = MockSink::new();

        let statuses = run_scan(&mut ledger, &sources, &sink, today()).await;

        assert_eq!(statuses["Epic Games"], ScanStatus::Found);
        assert_eq!(sink.sent_ids(), vec!["epic_123"]);
        assert!(ledger.contains("epic_123"));
        assert!(approx_eq(ledger.totals()[&Currency::Tl], 19.99));
        let entry = &ledger.entries()[0];
        assert_eq!(entry.title, "Test Game");
        assert_eq!(entry.discovered_at, today());
    }

    #[tokio::test]
    async fn rescan_of_known_offers_is_silent() {
        let mut ledger = Ledger::new();
        let sources = single(StaticSource {
            name: "Epic Games",
            offers: vec![offer("epic_123", "Test Game", 19.99, Currency::Tl)],
        });

        run_scan(&mut ledger, &sources, &MockSink::new(), today()).await;
        let before = ledger.entries().to_vec();

        let sink = MockSink::new();
        let statuses = run_scan(&mut ledger, &sources, &sink, today()).await;

        assert_eq!(statuses["Epic Games"], ScanStatus::NoneFound);
        assert!(sink.sent_ids().is_empty());
        assert_eq!(ledger.entries(), before.as_slice());
    }

    #[tokio::test]
    async fn empty_source_reports_none_found() {
        let mut ledger = Ledger::new();
        let sources = single(StaticSource {
            name: "Reddit",
            offers: Vec::new(),
        });

        let statuses = run_scan(&mut ledger, &sources, &MockSink::new(), today()).await;

        assert_eq!(statuses["Reddit"], ScanStatus::NoneFound);
        assert!(ledger.is_empty());
    }

    // ── failure isolation ──────────────────────────────────────────

    #[tokio::test]
    async fn failing_source_does_not_block_others() {
        let mut ledger = Ledger::new();
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(FailingSource),
            Box::new(StaticSource {
                name: "Epic Games",
                offers: vec![offer("epic_123", "Test Game", 19.99, Currency::Tl)],
            }),
        ];

        let statuses = run_scan(&mut ledger, &sources, &MockSink::new(), today()).await;

        assert_eq!(statuses["Broken"], ScanStatus::Failed);
        assert_eq!(statuses["Epic Games"], ScanStatus::Found);
        assert!(ledger.contains("epic_123"));
    }

    #[tokio::test]
    async fn undelivered_offer_stays_out_of_ledger_and_is_retried() {
        let mut ledger = Ledger::new();
        let sources = single(StaticSource {
            name: "Epic Games",
            offers: vec![
                offer("epic_1", "Refused", 5.00, Currency::Tl),
                offer("epic_2", "Accepted", 7.50, Currency::Tl),
            ],
        });

        let flaky = MockSink::rejecting(&["epic_1"]);
        let statuses = run_scan(&mut ledger, &sources, &flaky, today()).await;

        // The delivered offer still counts as a find.
        assert_eq!(statuses["Epic Games"], ScanStatus::Found);
        assert_eq!(flaky.sent_ids(), vec!["epic_2"]);
        assert!(!ledger.contains("epic_1"));
        assert!(ledger.contains("epic_2"));
        assert!(approx_eq(ledger.totals()[&Currency::Tl], 7.50));

        // Next scan picks the refused offer up again.
        let healthy = MockSink::new();
        run_scan(&mut ledger, &sources, &healthy, today()).await;
        assert_eq!(healthy.sent_ids(), vec!["epic_1"]);
        assert!(ledger.contains("epic_1"));
        assert!(approx_eq(ledger.totals()[&Currency::Tl], 12.50));
    }

    #[tokio::test]
    async fn source_with_only_failed_deliveries_reports_none_found() {
        let mut ledger = Ledger::new();
        let sources = single(StaticSource {
            name: "Epic Games",
            offers: vec![offer("epic_1", "Refused", 5.00, Currency::Tl)],
        });

        let statuses = run_scan(
            &mut ledger,
            &sources,
            &MockSink::rejecting(&["epic_1"]),
            today(),
        )
        .await;

        assert_eq!(statuses["Epic Games"], ScanStatus::NoneFound);
        assert!(ledger.is_empty());
    }

    // ── dedup invariants ───────────────────────────────────────────

    #[tokio::test]
    async fn duplicate_id_within_one_fetch_is_announced_once() {
        let mut ledger = Ledger::new();
        let sources = single(StaticSource {
            name: "Reddit",
            offers: vec![
                offer("feed_abc", "Repost", 0.0, Currency::Unknown),
                offer("feed_abc", "Repost", 0.0, Currency::Unknown),
            ],
        });
        let sink = MockSink::new();

        run_scan(&mut ledger, &sources, &sink, today()).await;

        assert_eq!(sink.sent_ids(), vec!["feed_abc"]);
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn offer_known_from_another_source_is_not_reannounced() {
        let mut ledger = Ledger::new();
        ledger
            .record(offer("epic_123", "Test Game", 19.99, Currency::Tl).ledger_entry(today()))
            .unwrap();

        let sources = single(StaticSource {
            name: "Epic Games",
            offers: vec![offer("epic_123", "Test Game", 19.99, Currency::Tl)],
        });
        let sink = MockSink::new();

        let statuses = run_scan(&mut ledger, &sources, &sink, today()).await;

        assert_eq!(statuses["Epic Games"], ScanStatus::NoneFound);
        assert!(sink.sent_ids().is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn running_totals_stay_consistent_across_scans() {
        let mut ledger = Ledger::new();
        let first = single(StaticSource {
            name: "Epic Games",
            offers: vec![
                offer("epic_1", "One", 19.99, Currency::Tl),
                offer("epic_2", "Two", 4.99, Currency::Usd),
            ],
        });
        let second = single(StaticSource {
            name: "Epic Games",
            offers: vec![
                offer("epic_1", "One", 19.99, Currency::Tl),
                offer("epic_3", "Three", 10.00, Currency::Tl),
            ],
        });

        run_scan(&mut ledger, &first, &MockSink::new(), today()).await;
        run_scan(&mut ledger, &second, &MockSink::new(), today()).await;

        assert_eq!(ledger.len(), 3);
        assert!(approx_eq(ledger.totals()[&Currency::Tl], 29.99));
        assert!(approx_eq(ledger.totals()[&Currency::Usd], 4.99));
        assert_eq!(ledger.recomputed_totals(), *ledger.totals());
    }
}
