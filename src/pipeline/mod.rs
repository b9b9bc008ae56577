//! 取得 → 正規化 → 集約 パイプライン
//!
//! 作業項目を1タスクが送信し、`max_concurrency` 個のワーカーが取得・正規化して結果チャネルへ送る。
//! レコードを書き換えるのは集約タスクだけなのでロックは不要。
//!
//! 終了順序:
//! 1. 作業項目を送り終えたら作業チャネルを閉じる
//! 2. クローザーが全ワーカーの終了を待ってから結果チャネルを閉じる
//! 3. 集約タスクは結果チャネルを読み切ったところで終了する

mod pool;
mod progress;
pub mod work;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::log::Logger;
use crate::record::{CardId, Entry, MergePolicy, Record};
use crate::traits::{Matcher, Source};

pub use pool::WorkerStats;
use progress::Progress;

/// ワーカーから集約タスクへ渡す正規化済みの1件
#[derive(Debug, Clone)]
pub struct Emitted<E> {
    pub id: CardId,
    pub entry: E,
}

/// 集約タスク側の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub received: usize,
    pub merged: usize,
    pub rejected: usize,
}

/// 1回のスクレイプの結果サマリ
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub discovered: usize,
    pub workers: WorkerStats,
    pub aggregate: AggregateStats,
    pub elapsed: Duration,
}

/// パイプラインを1回実行してレコードを返す
///
/// 作業一覧の取得失敗のみエラーとして返す。それ以外は記録して続行する。
pub async fn run<S: Source>(
    source: Arc<S>,
    matcher: Arc<dyn Matcher>,
    config: &ScraperConfig,
) -> Result<(Record<S::Entry>, ScrapeReport), ScraperError> {
    let logger = config.logger();
    let start = Instant::now();

    let items = source.discover().await.map_err(|e| {
        logger.error(format_args!("failed to enumerate work: {}", e));
        match e {
            ScraperError::Setup(_) => e,
            other => ScraperError::Setup(other.to_string()),
        }
    })?;

    let discovered = items.len();
    let concurrency = config.max_concurrency.max(1);
    logger.info(format_args!(
        "scraping {} {} work items with {} workers",
        discovered,
        <S::Entry as Entry>::KIND.as_str(),
        concurrency
    ));

    let (item_tx, item_rx) = mpsc::channel(concurrency);
    let item_rx = Arc::new(Mutex::new(item_rx));
    let producer = tokio::spawn(work::produce(items, item_tx));
    let mut tasks = TaskGuard::default();
    tasks.track(&producer);

    let (result_tx, result_rx) = mpsc::channel(config.results_buffer.max(1));

    let workers = (0..concurrency)
        .map(|worker_id| {
            tokio::spawn(pool::worker(
                worker_id,
                source.clone(),
                matcher.clone(),
                item_rx.clone(),
                result_tx.clone(),
                logger.clone(),
            ))
        })
        .collect::<Vec<_>>();
    drop(item_rx);
    for worker in &workers {
        tasks.track(worker);
    }

    let closer = tokio::spawn(pool::close_when_done(workers, result_tx, logger.clone()));
    tasks.track(&closer);

    let progress = Progress::new(config.progress_interval, matcher, logger.clone());
    let aggregator = tokio::spawn(aggregate(
        result_rx,
        source.merge_policy(),
        progress,
        logger.clone(),
    ));
    tasks.track(&aggregator);

    let (record, aggregate_stats) = aggregator
        .await
        .map_err(|e| ScraperError::Worker(format!("aggregator: {}", e)))?;
    let worker_stats = closer
        .await
        .map_err(|e| ScraperError::Worker(format!("closer: {}", e)))?;
    producer
        .await
        .map_err(|e| ScraperError::Worker(format!("producer: {}", e)))?;

    let report = ScrapeReport {
        discovered,
        workers: worker_stats,
        aggregate: aggregate_stats,
        elapsed: start.elapsed(),
    };
    logger.info(format_args!(
        "done in {:?}: {} cards, {} entries ({} failed items, {} skipped rows, {} rejected)",
        report.elapsed,
        record.len(),
        record.entry_count(),
        report.workers.failed_items,
        report.workers.skipped_rows,
        report.aggregate.rejected
    ));

    Ok((record, report))
}

/// run() の future が途中で破棄されたとき、起動したタスクをすべて止める
#[derive(Default)]
struct TaskGuard(Vec<AbortHandle>);

impl TaskGuard {
    fn track<T>(&mut self, handle: &JoinHandle<T>) {
        self.0.push(handle.abort_handle());
    }
}

impl Drop for TaskGuard {
    // 完了済みのタスクには影響しない
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// 結果チャネルが閉じるまで受信し、1件ごとにマージする
async fn aggregate<E: Entry>(
    mut results: mpsc::Receiver<Emitted<E>>,
    policy: MergePolicy,
    mut progress: Progress,
    logger: Logger,
) -> (Record<E>, AggregateStats) {
    let mut record = Record::new();
    let mut stats = AggregateStats::default();

    while let Some(Emitted { id, entry }) = results.recv().await {
        stats.received += 1;
        let last = id.clone();
        match record.merge(policy, id, entry) {
            Ok(()) => {
                stats.merged += 1;
                progress.tick(&last, stats.merged);
            }
            Err(e) => {
                stats.rejected += 1;
                logger.warn(format_args!("dropped entry: {}", e));
            }
        }
    }

    (record, stats)
}
