//! カード価格スクレイパーライブラリ
//!
//! - 各ベンダーの販売在庫 (inventory) と買取価格 (buylist) を取得
//! - ワーカープールで並列取得し、単一の集約タスクでレコードにマージ
//!
//! # 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cardprice_scraper::{ScraperConfig, Seller, SourceScraper};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new("Example Games", "EG").with_max_concurrency(4);
//!     let scraper = SourceScraper::new(ExampleInventory::new(), Arc::new(MyMatcher), config);
//!
//!     let snapshot = scraper.inventory().await.unwrap();
//!     println!("cards: {}, at {}", snapshot.record.len(), snapshot.timestamp);
//! }
//! ```

pub mod config;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod record;
pub mod scraper;
pub mod service;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型をリエクスポート
pub use config::ScraperConfig;
pub use error::{MatchError, MergeError, ScraperError};
pub use log::{LogCallback, Logger};
pub use pipeline::{ScrapeReport, WorkerStats};
pub use scraper::{ScrapeState, ScraperInfo, SourceScraper, Storefront};
pub use service::{ScrapeRequest, ScrapeResult, ScraperService};
pub use traits::{Matcher, RawRow, Scraper, Seller, Source, Vendor};

// Record 関連の型もリエクスポート
pub use record::{
    BuylistEntry, BuylistRecord, CardId, CardQuery, Condition, Entry, InventoryEntry,
    InventoryRecord, MergePolicy, QuantityMerge, Record, RecordKind, Snapshot, UniqueMode,
};
