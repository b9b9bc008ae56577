//! レコード関連の型定義

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 正規化済みカードID（1印刷 + 1仕上げ）
///
/// Matcher が生成する不透明なキー。パイプラインはマップのキーとしてのみ扱う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// カードの状態グレード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    NM,
    SP,
    MP,
    HP,
    PO,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::NM,
        Condition::SP,
        Condition::MP,
        Condition::HP,
        Condition::PO,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::NM => "NM",
            Condition::SP => "SP",
            Condition::MP => "MP",
            Condition::HP => "HP",
            Condition::PO => "PO",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown condition: {0}")]
pub struct ParseConditionError(pub String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    /// ベンダーごとの表記揺れを吸収する
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['_', '-', '/'], " ");
        let cond = match normalized.as_str() {
            "NM" | "M" | "MINT" | "NEAR MINT" | "NM M" | "NEAR MINT MINT" => Condition::NM,
            "SP" | "LP" | "EX" | "EXCELLENT" | "SLIGHTLY PLAYED" | "LIGHTLY PLAYED" => {
                Condition::SP
            }
            "MP" | "VG" | "PLAYED" | "MODERATELY PLAYED" | "VERY GOOD" => Condition::MP,
            "HP" | "GD" | "GOOD" | "HEAVILY PLAYED" => Condition::HP,
            "PO" | "PR" | "POOR" | "DMG" | "DAMAGED" => Condition::PO,
            _ => return Err(ParseConditionError(s.to_string())),
        };
        Ok(cond)
    }
}

/// 同一カード内でオファーを区別するキー（状態 + 出品者）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub conditions: Condition,
    pub seller: Option<String>,
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.seller {
            Some(seller) => write!(f, "{}/{}", self.conditions, seller),
            None => write!(f, "{}", self.conditions),
        }
    }
}

/// Matcher への入力（取得した行の自由記述フィールド）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardQuery {
    pub name: String,
    pub edition: String,
    pub variant: String,
    pub number: Option<String>,
    pub foil: bool,
    pub language: Option<String>,
}

impl CardQuery {
    pub fn new(name: impl Into<String>, edition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edition: edition.into(),
            ..Default::default()
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_foil(mut self, foil: bool) -> Self {
        self.foil = foil;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl fmt::Display for CardQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.edition)?;
        if !self.variant.is_empty() {
            write!(f, " {}", self.variant)?;
        }
        if let Some(number) = &self.number {
            write!(f, " #{}", number)?;
        }
        if self.foil {
            f.write_str(" (foil)")?;
        }
        Ok(())
    }
}

/// レコードの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Inventory,
    Buylist,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Inventory => "inventory",
            RecordKind::Buylist => "buylist",
        }
    }
}

/// レコードに格納されるオファーの共通インターフェース
pub trait Entry: Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: RecordKind;

    fn key(&self) -> EntryKey;

    fn price(&self) -> f64;

    fn quantity(&self) -> Option<u32>;

    fn set_quantity(&mut self, quantity: Option<u32>);

    /// Plain-Add で同一キーの再観測を受け入れられる場合に self を更新して true を返す
    fn absorb_duplicate(&mut self, _other: &Self) -> bool {
        false
    }
}

/// 販売在庫のオファー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub conditions: Condition,
    pub price: f64,
    /// 数量を公開しないソースでは None
    pub quantity: Option<u32>,
    pub url: String,
    pub seller_name: Option<String>,
    pub origin_id: Option<String>,
    pub instance_id: Option<String>,
}

impl InventoryEntry {
    pub fn new(conditions: Condition, price: f64, url: impl Into<String>) -> Self {
        Self {
            conditions,
            price,
            quantity: None,
            url: url.into(),
            seller_name: None,
            origin_id: None,
            instance_id: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.seller_name = Some(seller.into());
        self
    }

    pub fn with_origin(
        mut self,
        origin_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        self.origin_id = Some(origin_id.into());
        self.instance_id = Some(instance_id.into());
        self
    }
}

impl Entry for InventoryEntry {
    const KIND: RecordKind = RecordKind::Inventory;

    fn key(&self) -> EntryKey {
        EntryKey {
            conditions: self.conditions,
            seller: self.seller_name.clone(),
        }
    }

    fn price(&self) -> f64 {
        self.price
    }

    fn quantity(&self) -> Option<u32> {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: Option<u32>) {
        self.quantity = quantity;
    }
}

/// 買取価格のオファー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuylistEntry {
    pub conditions: Condition,
    pub buy_price: f64,
    pub trade_price: Option<f64>,
    /// 販売価格に対する買取価格の割合 (%)
    pub price_ratio: Option<f64>,
    pub quantity: Option<u32>,
    pub url: String,
    pub vendor_name: Option<String>,
}

impl BuylistEntry {
    pub fn new(conditions: Condition, buy_price: f64, url: impl Into<String>) -> Self {
        Self {
            conditions,
            buy_price,
            trade_price: None,
            price_ratio: None,
            quantity: None,
            url: url.into(),
            vendor_name: None,
        }
    }

    pub fn with_trade_price(mut self, trade_price: f64) -> Self {
        self.trade_price = Some(trade_price);
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor_name = Some(vendor.into());
        self
    }

    /// 既知の販売価格から price_ratio を計算する。販売価格が不正なら変更しない
    pub fn with_sell_price(mut self, sell_price: f64) -> Self {
        if sell_price.is_finite() && sell_price > 0.0 {
            self.price_ratio = Some(self.buy_price / sell_price * 100.0);
        }
        self
    }
}

impl Entry for BuylistEntry {
    const KIND: RecordKind = RecordKind::Buylist;

    fn key(&self) -> EntryKey {
        EntryKey {
            conditions: self.conditions,
            seller: self.vendor_name.clone(),
        }
    }

    fn price(&self) -> f64 {
        self.buy_price
    }

    fn quantity(&self) -> Option<u32> {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: Option<u32>) {
        self.quantity = quantity;
    }

    // 価格が同一なら price_ratio の補完のみ許容する
    fn absorb_duplicate(&mut self, other: &Self) -> bool {
        if self.buy_price != other.buy_price || self.trade_price != other.trade_price {
            return false;
        }
        if self.price_ratio.is_none() {
            self.price_ratio = other.price_ratio;
        }
        true
    }
}
