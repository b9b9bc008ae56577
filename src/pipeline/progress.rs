use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::log::Logger;
use crate::record::CardId;
use crate::traits::Matcher;

/// 一定間隔ごとに最後に処理したカードを出力する
pub(crate) struct Progress {
    interval: Duration,
    last_report: Instant,
    matcher: Arc<dyn Matcher>,
    logger: Logger,
}

impl Progress {
    pub(crate) fn new(interval: Duration, matcher: Arc<dyn Matcher>, logger: Logger) -> Self {
        Self {
            interval,
            last_report: Instant::now(),
            matcher,
            logger,
        }
    }

    /// 出力した場合 true
    pub(crate) fn tick(&mut self, last: &CardId, merged: usize) -> bool {
        if self.last_report.elapsed() < self.interval {
            return false;
        }
        let name = self
            .matcher
            .display_name(last)
            .unwrap_or_else(|| last.to_string());
        self.logger.info(format_args!(
            "still going, {} entries merged, last processed {}",
            merged, name
        ));
        self.last_report = Instant::now();
        true
    }
}
