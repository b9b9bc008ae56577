//! レコードストアとマージポリシー

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{BuylistEntry, CardId, Entry, InventoryEntry};
use crate::error::MergeError;

/// Relaxed-Add で同一キーが来たときの数量の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityMerge {
    #[default]
    Sum,
    KeepFirst,
}

/// Unique-Add で既存エントリがあるときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniqueMode {
    #[default]
    FirstWins,
    Overwrite,
}

/// ソースごとに選択する重複処理ルール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    #[default]
    Plain,
    Strict,
    Relaxed(QuantityMerge),
    Unique(UniqueMode),
}

/// CardId → オファー一覧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<E> {
    entries: HashMap<CardId, Vec<E>>,
}

pub type InventoryRecord = Record<InventoryEntry>;
pub type BuylistRecord = Record<BuylistEntry>;

impl<E> Default for Record<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<E: Entry> Record<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// カード数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 全カードのエントリ総数
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn get(&self, id: &CardId) -> Option<&[E]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardId, &[E])> {
        self.entries.iter().map(|(id, entries)| (id, entries.as_slice()))
    }

    pub fn into_inner(self) -> HashMap<CardId, Vec<E>> {
        self.entries
    }

    /// ポリシーに応じて追加する
    pub fn merge(&mut self, policy: MergePolicy, id: CardId, entry: E) -> Result<(), MergeError> {
        match policy {
            MergePolicy::Plain => self.add(id, entry),
            MergePolicy::Strict => self.add_strict(id, entry),
            MergePolicy::Relaxed(mode) => self.add_relaxed(id, entry, mode),
            MergePolicy::Unique(mode) => self.add_unique(id, entry, mode),
        }
    }

    /// 通常の追加。同一キーは拒否するが、エントリ側が許容する再観測は受け入れる
    pub fn add(&mut self, id: CardId, entry: E) -> Result<(), MergeError> {
        validate(&id, &entry)?;
        let key = entry.key();
        if let Some(list) = self.entries.get_mut(&id) {
            if let Some(existing) = list.iter_mut().find(|e| e.key() == key) {
                if existing.absorb_duplicate(&entry) {
                    return Ok(());
                }
                return Err(MergeError::Duplicate { id, key });
            }
        }
        self.entries.entry(id).or_default().push(entry);
        Ok(())
    }

    /// 同一キーは例外なく拒否し、最初のエントリを残す
    pub fn add_strict(&mut self, id: CardId, entry: E) -> Result<(), MergeError> {
        validate(&id, &entry)?;
        let key = entry.key();
        if self
            .entries
            .get(&id)
            .is_some_and(|list| list.iter().any(|e| e.key() == key))
        {
            return Err(MergeError::Duplicate { id, key });
        }
        self.entries.entry(id).or_default().push(entry);
        Ok(())
    }

    /// 同一キーは1エントリにまとめる
    pub fn add_relaxed(
        &mut self,
        id: CardId,
        entry: E,
        mode: QuantityMerge,
    ) -> Result<(), MergeError> {
        validate(&id, &entry)?;
        let key = entry.key();
        let list = self.entries.entry(id).or_default();
        match list.iter_mut().find(|e| e.key() == key) {
            Some(existing) => {
                if mode == QuantityMerge::Sum {
                    let merged = sum_quantity(existing.quantity(), entry.quantity());
                    existing.set_quantity(merged);
                }
            }
            None => list.push(entry),
        }
        Ok(())
    }

    /// 状態に関係なくカードごとに1エントリのみ保持する
    pub fn add_unique(&mut self, id: CardId, entry: E, mode: UniqueMode) -> Result<(), MergeError> {
        validate(&id, &entry)?;
        let list = self.entries.entry(id).or_default();
        if list.is_empty() || mode == UniqueMode::Overwrite {
            list.clear();
            list.push(entry);
        }
        Ok(())
    }
}

impl Record<InventoryEntry> {
    /// マーケットプレイス型ソースの出品者一覧
    pub fn sellers(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .flatten()
            .filter_map(|e| e.seller_name.clone())
            .collect()
    }

    /// 指定出品者のエントリだけを抜き出す
    pub fn for_seller(&self, seller: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|(id, list)| {
                let mine: Vec<_> = list
                    .iter()
                    .filter(|e| e.seller_name.as_deref() == Some(seller))
                    .cloned()
                    .collect();
                (!mine.is_empty()).then(|| (id.clone(), mine))
            })
            .collect();
        Self { entries }
    }
}

/// スクレイプ完了後の読み取り専用スナップショット
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<E> {
    pub record: Record<E>,
    pub timestamp: DateTime<Utc>,
}

impl<E> Snapshot<E> {
    pub fn new(record: Record<E>) -> Self {
        Self {
            record,
            timestamp: Utc::now(),
        }
    }
}

fn validate<E: Entry>(id: &CardId, entry: &E) -> Result<(), MergeError> {
    if id.is_empty() {
        return Err(MergeError::EmptyIdentity);
    }
    let price = entry.price();
    if !price.is_finite() || price <= 0.0 {
        return Err(MergeError::InvalidPrice {
            id: id.clone(),
            price,
        });
    }
    Ok(())
}

fn sum_quantity(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Condition;

    fn inv(cond: Condition, price: f64, qty: u32) -> InventoryEntry {
        InventoryEntry::new(cond, price, "https://example.test/card").with_quantity(qty)
    }

    #[test]
    fn test_strict_rejects_duplicate_and_keeps_first() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("X");
        record.add_strict(id.clone(), inv(Condition::NM, 10.0, 1)).unwrap();

        let err = record.add_strict(id.clone(), inv(Condition::NM, 12.0, 1)).unwrap_err();
        assert!(matches!(err, MergeError::Duplicate { ref id, .. } if id.as_str() == "X"));

        let entries = record.get(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].price, 10.0);
    }

    #[test]
    fn test_strict_allows_distinct_conditions_and_sellers() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("X");
        record.add_strict(id.clone(), inv(Condition::NM, 10.0, 1)).unwrap();
        record.add_strict(id.clone(), inv(Condition::SP, 8.0, 1)).unwrap();
        record
            .add_strict(id.clone(), inv(Condition::NM, 9.0, 1).with_seller("other"))
            .unwrap();
        assert_eq!(record.get(&id).unwrap().len(), 3);
    }

    #[test]
    fn test_relaxed_sums_quantity() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("Y");
        record
            .add_relaxed(id.clone(), inv(Condition::NM, 5.0, 2), QuantityMerge::Sum)
            .unwrap();
        record
            .add_relaxed(id.clone(), inv(Condition::NM, 5.0, 3), QuantityMerge::Sum)
            .unwrap();

        let entries = record.get(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, Some(5));
    }

    #[test]
    fn test_relaxed_keep_first() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("Y");
        record
            .add_relaxed(id.clone(), inv(Condition::NM, 5.0, 2), QuantityMerge::KeepFirst)
            .unwrap();
        record
            .add_relaxed(id.clone(), inv(Condition::NM, 6.0, 3), QuantityMerge::KeepFirst)
            .unwrap();

        let entries = record.get(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, Some(2));
        assert_eq!(entries[0].price, 5.0);
    }

    #[test]
    fn test_relaxed_unknown_quantity() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("Y");
        let no_qty = InventoryEntry::new(Condition::NM, 5.0, "u");
        record
            .add_relaxed(id.clone(), no_qty.clone(), QuantityMerge::Sum)
            .unwrap();
        record
            .add_relaxed(id.clone(), no_qty, QuantityMerge::Sum)
            .unwrap();
        assert_eq!(record.get(&id).unwrap()[0].quantity, None);
    }

    #[test]
    fn test_relaxed_rejects_invalid_price() {
        let mut record = InventoryRecord::new();
        let err = record
            .add_relaxed(CardId::new("Y"), inv(Condition::NM, 0.0, 1), QuantityMerge::Sum)
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidPrice { .. }));
        assert!(record.is_empty());

        let err = record
            .add_relaxed(CardId::new("Y"), inv(Condition::NM, -1.0, 1), QuantityMerge::Sum)
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidPrice { .. }));
    }

    #[test]
    fn test_unique_keeps_single_entry() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("Z");
        for (i, cond) in Condition::ALL.iter().enumerate() {
            record
                .add_unique(id.clone(), inv(*cond, 1.0 + i as f64, 1), UniqueMode::FirstWins)
                .unwrap();
        }
        let entries = record.get(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].conditions, Condition::NM);

        for cond in Condition::ALL {
            record
                .add_unique(id.clone(), inv(cond, 3.0, 1), UniqueMode::Overwrite)
                .unwrap();
        }
        let entries = record.get(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].conditions, Condition::PO);
    }

    #[test]
    fn test_unique_rejects_empty_identity() {
        let mut record = InventoryRecord::new();
        let err = record
            .add_unique(CardId::new(""), inv(Condition::NM, 1.0, 1), UniqueMode::FirstWins)
            .unwrap_err();
        assert_eq!(err, MergeError::EmptyIdentity);
        assert!(record.is_empty());
    }

    #[test]
    fn test_plain_reports_colliding_key() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("P");
        record.add(id.clone(), inv(Condition::MP, 2.0, 1)).unwrap();
        let err = record.add(id.clone(), inv(Condition::MP, 2.5, 1)).unwrap_err();
        match err {
            MergeError::Duplicate { id, key } => {
                assert_eq!(id.as_str(), "P");
                assert_eq!(key.conditions, Condition::MP);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_buylist_tolerates_ratio_bookkeeping() {
        let mut record = BuylistRecord::new();
        let id = CardId::new("B");
        record
            .add(id.clone(), BuylistEntry::new(Condition::NM, 4.0, "u"))
            .unwrap();
        record
            .add(
                id.clone(),
                BuylistEntry::new(Condition::NM, 4.0, "u").with_sell_price(8.0),
            )
            .unwrap();
        let entries = record.get(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].price_ratio, Some(50.0));

        let err = record
            .add(id.clone(), BuylistEntry::new(Condition::NM, 5.0, "u"))
            .unwrap_err();
        assert!(matches!(err, MergeError::Duplicate { .. }));
    }

    #[test]
    fn test_merge_dispatches_policy() {
        let mut record = InventoryRecord::new();
        let id = CardId::new("D");
        let policy = MergePolicy::Relaxed(QuantityMerge::Sum);
        record.merge(policy, id.clone(), inv(Condition::NM, 1.0, 1)).unwrap();
        record.merge(policy, id.clone(), inv(Condition::NM, 1.0, 1)).unwrap();
        assert_eq!(record.get(&id).unwrap()[0].quantity, Some(2));
        assert!(record
            .merge(MergePolicy::Strict, id.clone(), inv(Condition::NM, 1.0, 1))
            .is_err());
    }

    #[test]
    fn test_for_seller_splits_marketplace() {
        let mut record = InventoryRecord::new();
        record
            .add(CardId::new("A"), inv(Condition::NM, 1.0, 1).with_seller("alice"))
            .unwrap();
        record
            .add(CardId::new("A"), inv(Condition::NM, 1.2, 1).with_seller("bob"))
            .unwrap();
        record
            .add(CardId::new("B"), inv(Condition::SP, 3.0, 1).with_seller("bob"))
            .unwrap();

        let sellers: Vec<_> = record.sellers().into_iter().collect();
        assert_eq!(sellers, vec!["alice".to_string(), "bob".to_string()]);

        let bob = record.for_seller("bob");
        assert_eq!(bob.len(), 2);
        assert_eq!(bob.entry_count(), 2);
        assert!(record.for_seller("carol").is_empty());
    }
}
