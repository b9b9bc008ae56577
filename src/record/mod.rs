//! Record モジュール
//!
//! 正規化済みカードIDとオファー（販売在庫 / 買取）を保持し、重複の扱いをマージポリシーで切り替える

mod store;
mod types;

pub use store::{
    BuylistRecord, InventoryRecord, MergePolicy, QuantityMerge, Record, Snapshot, UniqueMode,
};
pub use types::{
    BuylistEntry, CardId, CardQuery, Condition, Entry, EntryKey, InventoryEntry,
    ParseConditionError, RecordKind,
};
