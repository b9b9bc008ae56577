use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use tower::Service;
use tracing::info;

use crate::error::ScraperError;
use crate::record::{BuylistEntry, InventoryEntry, RecordKind, Snapshot};
use crate::traits::{Seller, Vendor};

/// スクレイピングリクエスト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub kind: RecordKind,
}

impl ScrapeRequest {
    pub fn inventory() -> Self {
        Self {
            kind: RecordKind::Inventory,
        }
    }

    pub fn buylist() -> Self {
        Self {
            kind: RecordKind::Buylist,
        }
    }
}

/// スクレイピング結果
#[derive(Debug, Clone)]
pub enum ScrapeResult {
    Inventory(Arc<Snapshot<InventoryEntry>>),
    Buylist(Arc<Snapshot<BuylistEntry>>),
}

impl ScrapeResult {
    pub fn kind(&self) -> RecordKind {
        match self {
            ScrapeResult::Inventory(_) => RecordKind::Inventory,
            ScrapeResult::Buylist(_) => RecordKind::Buylist,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ScrapeResult::Inventory(s) => s.timestamp,
            ScrapeResult::Buylist(s) => s.timestamp,
        }
    }

    pub fn entry_count(&self) -> usize {
        match self {
            ScrapeResult::Inventory(s) => s.record.entry_count(),
            ScrapeResult::Buylist(s) => s.record.entry_count(),
        }
    }
}

/// tower::Serviceを実装したスクレイパーサービス
#[derive(Clone, Default)]
pub struct ScraperService {
    seller: Option<Arc<dyn Seller>>,
    vendor: Option<Arc<dyn Vendor>>,
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seller(mut self, seller: Arc<dyn Seller>) -> Self {
        self.seller = Some(seller);
        self
    }

    pub fn with_vendor(mut self, vendor: Arc<dyn Vendor>) -> Self {
        self.vendor = Some(vendor);
        self
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("スクレイピングリクエスト受信: kind={}", req.kind.as_str());

        let seller = self.seller.clone();
        let vendor = self.vendor.clone();

        Box::pin(async move {
            let result = match req.kind {
                RecordKind::Inventory => {
                    let seller = seller.ok_or(ScraperError::PhaseDisabled("inventory"))?;
                    ScrapeResult::Inventory(seller.inventory().await?)
                }
                RecordKind::Buylist => {
                    let vendor = vendor.ok_or(ScraperError::PhaseDisabled("buylist"))?;
                    ScrapeResult::Buylist(vendor.buylist().await?)
                }
            };

            info!(
                "スクレイピング完了: kind={}, entries={}, at={}",
                result.kind().as_str(),
                result.entry_count(),
                result.timestamp()
            );

            Ok(result)
        })
    }
}
