use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::ledger::Ledger;
use crate::types::{Currency, LedgerEntry, ScanStatus};

/// Date format of entry lines, e.g. `[25-08-2026]`.
const ENTRY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Timestamp format of the `Last scan:` line.
const SCAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render the full report: totals per currency, every ledger entry in
/// discovery order, the last-scan timestamp and one status line per source.
///
/// Deterministic: identical inputs produce byte-identical output, so the
/// only thing that changes between runs with no new offers is `now`.
pub fn render(
    ledger: &Ledger,
    statuses: &BTreeMap<String, ScanStatus>,
    now: DateTime<Utc>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    let totals: Vec<String> = ledger
        .totals()
        .iter()
        .filter(|(_, total)| **total > 0.0)
        .map(|(currency, total)| format!("Total saved: {total:.2} {}", currency.code()))
        .collect();
    if !totals.is_empty() {
        lines.extend(totals);
        lines.push(String::new());
    }

    if !ledger.is_empty() {
        lines.extend(ledger.entries().iter().map(entry_line));
        lines.push(String::new());
    }

    lines.push(format!("Last scan: {}", now.format(SCAN_TIME_FORMAT)));
    for (source, status) in statuses {
        lines.push(format!("{source}: {}", status.symbol()));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Rebuild a [`Ledger`] from persisted report text.
///
/// Only entry lines are parsed; totals, the status block and any free text
/// are ignored, as is every line that does not match the entry pattern.
/// Totals come back recomputed from the recovered entries, which keeps them
/// consistent even if the totals section was edited by hand.
pub fn parse(text: &str) -> Ledger {
    let mut ledger = Ledger::new();
    for line in text.lines() {
        let Some(entry) = parse_entry_line(line) else {
            continue;
        };
        if let Err(e) = ledger.record(entry) {
            warn!("Report contains a {e}; keeping the first occurrence");
        }
    }
    ledger
}

/// Load the ledger from the report file. A missing file is an empty ledger,
/// not an error: the first run starts from nothing.
pub fn load(path: &Path) -> Result<Ledger> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Ledger::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read report {}", path.display()));
        }
    };
    Ok(parse(&text))
}

/// Rewrite the full report file. The text goes to a sibling temp file first
/// and is renamed into place, so a crash mid-write cannot truncate the
/// previous ledger.
pub fn store(
    path: &Path,
    ledger: &Ledger,
    statuses: &BTreeMap<String, ScanStatus>,
    now: DateTime<Utc>,
) -> Result<()> {
    let text = render(ledger, statuses, now);
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &text)
        .with_context(|| format!("failed to write report {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace report {}", path.display()))?;
    Ok(())
}

/// One `"<title> | <amount> <currency> (ID:<id>) [<date>]"` line.
fn entry_line(entry: &LedgerEntry) -> String {
    format!(
        "{} | {:.2} {} (ID:{}) [{}]",
        entry.title,
        entry.amount,
        entry.currency.code(),
        entry.id,
        entry.discovered_at.format(ENTRY_DATE_FORMAT)
    )
}

/// Parse one entry line; `None` for anything that does not match.
///
/// Markers are matched right-to-left so titles containing ` | ` or ` (ID:`
/// cannot shift the field boundaries.
fn parse_entry_line(line: &str) -> Option<LedgerEntry> {
    let (head, tail) = line.rsplit_once(" (ID:")?;
    let (id, date_part) = tail.split_once(')')?;
    if id.is_empty() {
        return None;
    }
    let date_str = date_part.trim().strip_prefix('[')?.strip_suffix(']')?;
    let discovered_at = NaiveDate::parse_from_str(date_str, ENTRY_DATE_FORMAT).ok()?;

    let (title, price_part) = head.rsplit_once(" | ")?;
    let (amount_str, code) = price_part.split_once(' ')?;
    let amount = amount_str.parse::<f64>().ok()?;

    Some(LedgerEntry {
        id: id.to_string(),
        title: title.to_string(),
        amount,
        currency: Currency::from_code(code),
        discovered_at,
    })
}
