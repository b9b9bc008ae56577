use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cardprice_scraper::{
    pipeline::work, BuylistEntry, CardId, CardQuery, Condition, InventoryEntry, MatchError,
    Matcher, MergePolicy, QuantityMerge, RawRow, Scraper, ScraperConfig, ScraperError, Seller,
    Source, Storefront, Vendor,
};

const NAMES: [&str; 4] = ["Lightning Bolt", "Counterspell", "Dark Ritual", "Token Elemental"];

/// 在庫ページを模したソース（ページ 3 は常に失敗）
struct DemoInventory;

#[async_trait]
impl Source for DemoInventory {
    type Item = usize;
    type Entry = InventoryEntry;

    async fn discover(&self) -> Result<Vec<usize>, ScraperError> {
        Ok(work::pages(120, 20))
    }

    async fn fetch(&self, page: &usize) -> Result<Vec<RawRow<InventoryEntry>>, ScraperError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if *page == 3 {
            return Err(ScraperError::Fetch(format!("page {}: 503 Service Unavailable", page)));
        }
        let rows = NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                RawRow::new(
                    CardQuery::new(*name, "Demo Set").with_number(i.to_string()),
                    InventoryEntry::new(
                        Condition::NM,
                        1.0 + i as f64,
                        format!("https://demo.test/p/{}", page),
                    )
                    .with_quantity(1),
                )
            })
            .collect();
        Ok(rows)
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Relaxed(QuantityMerge::Sum)
    }
}

struct DemoBuylist;

#[async_trait]
impl Source for DemoBuylist {
    type Item = usize;
    type Entry = BuylistEntry;

    async fn discover(&self) -> Result<Vec<usize>, ScraperError> {
        Ok(work::offsets(300, 100))
    }

    async fn fetch(&self, offset: &usize) -> Result<Vec<RawRow<BuylistEntry>>, ScraperError> {
        let name = NAMES[offset / 100 % NAMES.len()];
        Ok(vec![RawRow::new(
            CardQuery::new(name, "Demo Set"),
            BuylistEntry::new(Condition::NM, 0.5, "https://demo.test/buy").with_sell_price(1.25),
        )])
    }
}

struct DemoMatcher;

impl Matcher for DemoMatcher {
    fn match_card(&self, query: &CardQuery) -> Result<CardId, MatchError> {
        if query.name.starts_with("Token") {
            return Err(MatchError::Unsupported);
        }
        let slug = query.name.to_lowercase().replace(' ', "-");
        Ok(CardId::new(format!("{}-{}", slug, query.edition)))
    }
}

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = ScraperConfig::new("Demo Games", "DG")
        .with_max_concurrency(3)
        .with_progress_interval(Duration::from_millis(100))
        .with_log_callback(Arc::new(|line: &str| println!("callback: {}", line)));

    let shop = Storefront::new(DemoInventory, DemoBuylist, Arc::new(DemoMatcher), config);

    println!("=== Fixture Scrape ===");

    match shop.inventory().await {
        Ok(snapshot) => {
            println!(
                "在庫: {} cards, {} entries",
                snapshot.record.len(),
                snapshot.record.entry_count()
            );
            for (id, entries) in snapshot.record.iter() {
                println!("  {} -> {:?}", id, entries);
            }
        }
        Err(e) => eprintln!("エラー: {}", e),
    }

    match shop.buylist().await {
        Ok(snapshot) => println!("買取: {} cards", snapshot.record.len()),
        Err(e) => eprintln!("エラー: {}", e),
    }

    match serde_json::to_string_pretty(&shop.info()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("エラー: {}", e),
    }
}
