use thiserror::Error;

use crate::record::{CardId, EntryKey};

#[derive(Error, Debug)]
pub enum ScraperError {
    /// 作業一覧の取得に失敗（スクレイプ全体を中断）
    #[error("セットアップエラー: {0}")]
    Setup(String),

    #[error("取得エラー: {0}")]
    Fetch(String),

    #[error("解析エラー: {0}")]
    Parse(String),

    #[error("フェーズが無効化されています: {0}")]
    PhaseDisabled(&'static str),

    #[error("ワーカー異常終了: {0}")]
    Worker(String),

    #[error("マージエラー: {0}")]
    Merge(#[from] MergeError),
}

/// 正規化（カード名マッチング）の失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// 対象外のカード。ログ不要
    #[error("unsupported card")]
    Unsupported,

    #[error("ambiguous card {query}: {} candidates", .candidates.len())]
    Ambiguous {
        query: String,
        candidates: Vec<CardId>,
    },

    #[error("{0}")]
    Other(String),
}

/// レコードへの追加がポリシーで拒否された
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("duplicate entry for {id} ({key})")]
    Duplicate { id: CardId, key: EntryKey },

    #[error("invalid price {price} for {id}")]
    InvalidPrice { id: CardId, price: f64 },

    #[error("empty card identity")]
    EmptyIdentity,
}
