//! スクレイパー本体
//!
//! レコードは初回アクセス時に一度だけスクレイプし、以降はキャッシュを返す。
//! 同時に呼ばれた場合も実行は1回で、後続の呼び出しは完了を待つ。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::pipeline::{self, ScrapeReport};
use crate::record::{BuylistEntry, Entry, InventoryEntry, RecordKind, Snapshot};
use crate::traits::{Matcher, Scraper, Seller, Source, Vendor};

/// スクレイパーのメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperInfo {
    pub name: String,
    pub shorthand: String,
    pub inventory_timestamp: Option<DateTime<Utc>>,
    pub buylist_timestamp: Option<DateTime<Utc>>,
    pub no_quantity_inventory: bool,
    pub multi_seller: bool,
}

impl ScraperInfo {
    fn from_config(config: &ScraperConfig) -> Self {
        Self {
            name: config.name.clone(),
            shorthand: config.shorthand.clone(),
            inventory_timestamp: None,
            buylist_timestamp: None,
            no_quantity_inventory: config.no_quantity_inventory,
            multi_seller: config.multi_seller,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    NotStarted,
    InProgress,
    Done,
}

struct Completed<E> {
    snapshot: Arc<Snapshot<E>>,
    report: ScrapeReport,
}

/// 1ソース（在庫 or 買取）分のスクレイパー
pub struct SourceScraper<S: Source> {
    source: Arc<S>,
    matcher: Arc<dyn Matcher>,
    config: ScraperConfig,
    completed: OnceCell<Completed<S::Entry>>,
    running: AtomicBool,
}

// 呼び出し側の future が途中で破棄されても InProgress が残らないようにする
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<S: Source> SourceScraper<S> {
    pub fn new(source: S, matcher: Arc<dyn Matcher>, config: ScraperConfig) -> Self {
        Self {
            source: Arc::new(source),
            matcher,
            config,
            completed: OnceCell::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn state(&self) -> ScrapeState {
        if self.completed.initialized() {
            ScrapeState::Done
        } else if self.running.load(Ordering::SeqCst) {
            ScrapeState::InProgress
        } else {
            ScrapeState::NotStarted
        }
    }

    /// 初回はスクレイプを実行し、以降は同じスナップショットを返す
    ///
    /// 失敗した場合はキャッシュされず、次の呼び出しで再実行される。
    pub async fn snapshot(&self) -> Result<Arc<Snapshot<S::Entry>>, ScraperError> {
        let disabled = match <S::Entry as Entry>::KIND {
            RecordKind::Inventory => self.config.skip_inventory,
            RecordKind::Buylist => self.config.skip_buylist,
        };
        if disabled {
            return Err(ScraperError::PhaseDisabled(<S::Entry as Entry>::KIND.as_str()));
        }

        let completed = self
            .completed
            .get_or_try_init(|| async {
                let _guard = RunningGuard::enter(&self.running);
                let (record, report) =
                    pipeline::run(self.source.clone(), self.matcher.clone(), &self.config).await?;
                Ok::<_, ScraperError>(Completed {
                    snapshot: Arc::new(Snapshot::new(record)),
                    report,
                })
            })
            .await?;
        Ok(completed.snapshot.clone())
    }

    /// 直近のスクレイプのサマリ
    pub fn report(&self) -> Option<&ScrapeReport> {
        self.completed.get().map(|c| &c.report)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.completed.get().map(|c| c.snapshot.timestamp)
    }
}

impl<S: Source> Scraper for SourceScraper<S> {
    fn info(&self) -> ScraperInfo {
        let mut info = ScraperInfo::from_config(&self.config);
        match <S::Entry as Entry>::KIND {
            RecordKind::Inventory => info.inventory_timestamp = self.timestamp(),
            RecordKind::Buylist => info.buylist_timestamp = self.timestamp(),
        }
        info
    }
}

#[async_trait]
impl<S: Source<Entry = InventoryEntry>> Seller for SourceScraper<S> {
    async fn inventory(&self) -> Result<Arc<Snapshot<InventoryEntry>>, ScraperError> {
        self.snapshot().await
    }
}

#[async_trait]
impl<S: Source<Entry = BuylistEntry>> Vendor for SourceScraper<S> {
    async fn buylist(&self) -> Result<Arc<Snapshot<BuylistEntry>>, ScraperError> {
        self.snapshot().await
    }
}

/// 在庫と買取の両方を持つベンダー
pub struct Storefront<I, B>
where
    I: Source<Entry = InventoryEntry>,
    B: Source<Entry = BuylistEntry>,
{
    inventory: SourceScraper<I>,
    buylist: SourceScraper<B>,
}

impl<I, B> Storefront<I, B>
where
    I: Source<Entry = InventoryEntry>,
    B: Source<Entry = BuylistEntry>,
{
    pub fn new(inventory: I, buylist: B, matcher: Arc<dyn Matcher>, config: ScraperConfig) -> Self {
        Self {
            inventory: SourceScraper::new(inventory, matcher.clone(), config.clone()),
            buylist: SourceScraper::new(buylist, matcher, config),
        }
    }

    pub fn inventory_state(&self) -> ScrapeState {
        self.inventory.state()
    }

    pub fn buylist_state(&self) -> ScrapeState {
        self.buylist.state()
    }
}

impl<I, B> Scraper for Storefront<I, B>
where
    I: Source<Entry = InventoryEntry>,
    B: Source<Entry = BuylistEntry>,
{
    fn info(&self) -> ScraperInfo {
        let mut info = ScraperInfo::from_config(self.inventory.config());
        info.inventory_timestamp = self.inventory.timestamp();
        info.buylist_timestamp = self.buylist.timestamp();
        info
    }
}

#[async_trait]
impl<I, B> Seller for Storefront<I, B>
where
    I: Source<Entry = InventoryEntry>,
    B: Source<Entry = BuylistEntry>,
{
    async fn inventory(&self) -> Result<Arc<Snapshot<InventoryEntry>>, ScraperError> {
        self.inventory.snapshot().await
    }
}

#[async_trait]
impl<I, B> Vendor for Storefront<I, B>
where
    I: Source<Entry = InventoryEntry>,
    B: Source<Entry = BuylistEntry>,
{
    async fn buylist(&self) -> Result<Arc<Snapshot<BuylistEntry>>, ScraperError> {
        self.buylist.snapshot().await
    }
}
