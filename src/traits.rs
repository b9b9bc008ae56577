use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{MatchError, ScraperError};
use crate::record::{BuylistEntry, CardId, CardQuery, Entry, InventoryEntry, MergePolicy, Snapshot};
use crate::scraper::ScraperInfo;

/// 取得した1行（正規化前の問い合わせ + オファー本体）
#[derive(Debug, Clone)]
pub struct RawRow<E> {
    pub query: CardQuery,
    pub entry: E,
}

impl<E> RawRow<E> {
    pub fn new(query: CardQuery, entry: E) -> Self {
        Self { query, entry }
    }
}

/// ベンダーごとのデータ取得処理
#[async_trait]
pub trait Source: Send + Sync + 'static {
    /// ページ番号・オフセット・カテゴリURLなど
    type Item: Debug + Send + Sync + 'static;
    type Entry: Entry;

    /// 作業一覧を列挙。失敗した場合スクレイプ全体を中断する
    async fn discover(&self) -> Result<Vec<Self::Item>, ScraperError>;

    /// 1作業分を取得・解析する
    async fn fetch(&self, item: &Self::Item) -> Result<Vec<RawRow<Self::Entry>>, ScraperError>;

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Plain
    }
}

/// カード名の正規化（外部のカードDBとの照合）
pub trait Matcher: Send + Sync + 'static {
    fn match_card(&self, query: &CardQuery) -> Result<CardId, MatchError>;

    /// 進捗ログ用の表示名。解決できなくてもよい
    fn display_name(&self, _id: &CardId) -> Option<String> {
        None
    }
}

pub trait Scraper: Send + Sync {
    fn info(&self) -> ScraperInfo;
}

/// 販売在庫を提供するスクレイパー
#[async_trait]
pub trait Seller: Scraper {
    /// 初回呼び出しでスクレイプし、以降はキャッシュを返す
    async fn inventory(&self) -> Result<Arc<Snapshot<InventoryEntry>>, ScraperError>;
}

/// 買取価格を提供するスクレイパー
#[async_trait]
pub trait Vendor: Scraper {
    async fn buylist(&self) -> Result<Arc<Snapshot<BuylistEntry>>, ScraperError>;
}
