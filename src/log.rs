//! ソース単位のログ出力
//!
//! tracing に流しつつ、コールバックが設定されていれば `[SHORT] message` 形式で転送する。
//! コールバック未設定時は転送のみ抑止される。

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Logger {
    prefix: String,
    callback: Option<LogCallback>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("prefix", &self.prefix)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Logger {
    pub fn new(prefix: impl Into<String>, callback: Option<LogCallback>) -> Self {
        Self {
            prefix: prefix.into(),
            callback,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        debug!(source = %self.prefix, "{}", args);
        self.forward(args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        info!(source = %self.prefix, "{}", args);
        self.forward(args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        warn!(source = %self.prefix, "{}", args);
        self.forward(args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        error!(source = %self.prefix, "{}", args);
        self.forward(args);
    }

    fn forward(&self, args: fmt::Arguments<'_>) {
        if let Some(callback) = &self.callback {
            callback(&format!("[{}] {}", self.prefix, args));
        }
    }
}
