//! Probe: upstream source payloads
//!
//! Hits the Epic promotions endpoint, the community feed and the store
//! search, and documents:
//! - Response shapes and field lists
//! - Which catalog elements count as currently free
//! - Promotion window nesting (promotionalOffers groups)
//! - keyImages types present in the wild
//! - Image search hit rate for real titles

use anyhow::Result;
use freegame_watch::{EPIC_PROMOTIONS_URL, FEED_URL, STEAM_SEARCH_URL, USER_AGENT};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    println!("=== Probe: upstream sources ===");
    println!();

    // 1. Epic promotions payload shape
    println!("--- 1. Epic promotions (locale=tr, country=TR) ---");
    let resp = client
        .get(EPIC_PROMOTIONS_URL)
        .query(&[("locale", "tr"), ("country", "TR"), ("allowCountries", "TR")])
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    let elements = body["data"]["Catalog"]["searchStore"]["elements"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    println!("Element count: {}", elements.len());
    if let Some(first) = elements.first() {
        println!("\nFields present on first element:");
        if let Some(obj) = first.as_object() {
            for key in obj.keys() {
                println!("  - {}", key);
            }
        }
        println!("\nPrice block:");
        println!("{}", serde_json::to_string_pretty(&first["price"])?);
    }
    println!();

    // 2. Which elements look free right now
    println!("--- 2. Free right now (discountPrice == 0, active window) ---");
    for element in &elements {
        let title = element["title"].as_str().unwrap_or("?");
        let discount = element["price"]["totalPrice"]["discountPrice"].as_i64();
        let windows: Vec<&Value> = element["promotions"]["promotionalOffers"]
            .as_array()
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|g| g["promotionalOffers"].as_array())
                    .flatten()
                    .collect()
            })
            .unwrap_or_default();
        println!(
            "  {title}: discountPrice={discount:?} windows={} end={:?}",
            windows.len(),
            windows.first().map(|w| w["endDate"].as_str())
        );
    }
    println!();

    // 3. keyImages types in the wild
    println!("--- 3. keyImages types ---");
    for element in elements.iter().take(5) {
        let title = element["title"].as_str().unwrap_or("?");
        let kinds: Vec<&str> = element["keyImages"]
            .as_array()
            .map(|images| {
                images
                    .iter()
                    .filter_map(|i| i["type"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        println!("  {title}: {kinds:?}");
    }
    println!();

    // 4. Community feed listing shape
    println!("--- 4. Community feed ---");
    let resp = client.get(FEED_URL).send().await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    let children = body["data"]["children"].as_array().cloned().unwrap_or_default();
    println!("Post count: {}", children.len());
    if let Some(first) = children.first() {
        println!("\nFields present on first post data:");
        if let Some(obj) = first["data"].as_object() {
            for key in obj.keys().take(25) {
                println!("  - {}", key);
            }
        }
    }
    println!("\nSample titles:");
    for child in children.iter().take(10) {
        println!("  {}", child["data"]["title"].as_str().unwrap_or("?"));
    }
    println!();

    // 5. Store search for a known title
    println!("--- 5. Store search (term=Portal) ---");
    let resp = client
        .get(STEAM_SEARCH_URL)
        .query(&[("term", "Portal"), ("l", "english"), ("cc", "TR")])
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    let items = body["items"].as_array().cloned().unwrap_or_default();
    println!("Item count: {}", items.len());
    for item in items.iter().take(3) {
        println!(
            "  {} tiny_image={}",
            item["name"].as_str().unwrap_or("?"),
            item["tiny_image"].as_str().is_some()
        );
    }
    println!();

    println!("=== Probe complete ===");
    Ok(())
}
