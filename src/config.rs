use std::time::Duration;

use crate::log::{LogCallback, Logger};

#[derive(Clone)]
pub struct ScraperConfig {
    /// ソース名
    pub name: String,
    /// ログ接頭辞などに使う短縮名
    pub shorthand: String,
    /// 同時実行ワーカー数（1以上）
    pub max_concurrency: usize,
    /// 結果チャネルの容量
    pub results_buffer: usize,
    /// 進捗ログの間隔
    pub progress_interval: Duration,
    /// URLに付与するアフィリエイトタグ
    pub affiliate: Option<String>,
    pub skip_inventory: bool,
    pub skip_buylist: bool,
    /// 数量を公開しないソース
    pub no_quantity_inventory: bool,
    /// 複数出品者を抱えるマーケットプレイス
    pub multi_seller: bool,
    pub log_callback: Option<LogCallback>,
}

impl std::fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("name", &self.name)
            .field("shorthand", &self.shorthand)
            .field("max_concurrency", &self.max_concurrency)
            .field("results_buffer", &self.results_buffer)
            .field("progress_interval", &self.progress_interval)
            .field("affiliate", &self.affiliate)
            .field("skip_inventory", &self.skip_inventory)
            .field("skip_buylist", &self.skip_buylist)
            .field("no_quantity_inventory", &self.no_quantity_inventory)
            .field("multi_seller", &self.multi_seller)
            .field("log_callback", &self.log_callback.is_some())
            .finish()
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            shorthand: String::new(),
            max_concurrency: 4,
            results_buffer: 64,
            progress_interval: Duration::from_secs(60),
            affiliate: None,
            skip_inventory: false,
            skip_buylist: false,
            no_quantity_inventory: false,
            multi_seller: false,
            log_callback: None,
        }
    }
}

impl ScraperConfig {
    pub fn new(name: impl Into<String>, shorthand: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shorthand: shorthand.into(),
            ..Default::default()
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_results_buffer(mut self, results_buffer: usize) -> Self {
        self.results_buffer = results_buffer.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_affiliate(mut self, affiliate: impl Into<String>) -> Self {
        self.affiliate = Some(affiliate.into());
        self
    }

    pub fn with_skip_inventory(mut self, skip: bool) -> Self {
        self.skip_inventory = skip;
        self
    }

    pub fn with_skip_buylist(mut self, skip: bool) -> Self {
        self.skip_buylist = skip;
        self
    }

    pub fn with_no_quantity_inventory(mut self, no_quantity: bool) -> Self {
        self.no_quantity_inventory = no_quantity;
        self
    }

    pub fn with_multi_seller(mut self, multi_seller: bool) -> Self {
        self.multi_seller = multi_seller;
        self
    }

    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    /// 設定値からロガーを作成
    pub fn logger(&self) -> Logger {
        Logger::new(self.shorthand.clone(), self.log_callback.clone())
    }

    /// アフィリエイトタグをクエリパラメータとして付与する
    pub fn decorate_url(&self, url: &str) -> String {
        match &self.affiliate {
            Some(tag) if !tag.is_empty() => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{}{}partner={}", url, sep, tag)
            }
            _ => url.to_string(),
        }
    }
}
