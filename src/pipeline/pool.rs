//! ワーカープールとクローザー

use std::any::Any;
use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::work::{next_item, SharedReceiver};
use super::Emitted;
use crate::error::MatchError;
use crate::log::Logger;
use crate::traits::{Matcher, Source};

/// ワーカー単位の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub items: usize,
    pub failed_items: usize,
    pub emitted: usize,
    pub skipped_rows: usize,
}

impl WorkerStats {
    fn absorb(&mut self, other: WorkerStats) {
        self.items += other.items;
        self.failed_items += other.failed_items;
        self.emitted += other.emitted;
        self.skipped_rows += other.skipped_rows;
    }
}

/// 作業チャネルが閉じるまで 取得 → 正規化 → 送信 を繰り返す
///
/// 1項目の失敗はログに残して次へ進む。再試行はしない。
pub(crate) async fn worker<S: Source>(
    worker_id: usize,
    source: Arc<S>,
    matcher: Arc<dyn Matcher>,
    items: SharedReceiver<S::Item>,
    results: mpsc::Sender<Emitted<S::Entry>>,
    logger: Logger,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(item) = next_item(&items).await {
        stats.items += 1;

        // パニックは当該項目だけの失敗として扱い、ワーカーは続行する
        let outcome = AssertUnwindSafe(process_item(
            worker_id,
            source.as_ref(),
            matcher.as_ref(),
            &item,
            &results,
            &logger,
            &mut stats,
        ))
        .catch_unwind()
        .await;

        match outcome {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => return stats,
            Err(payload) => {
                stats.failed_items += 1;
                logger.error(format_args!(
                    "worker {} panicked on {:?}: {}",
                    worker_id,
                    item,
                    panic_message(payload.as_ref())
                ));
            }
        }
    }

    logger.debug(format_args!("worker {} done: {:?}", worker_id, stats));
    stats
}

enum Flow {
    Continue,
    Stop,
}

async fn process_item<S: Source>(
    worker_id: usize,
    source: &S,
    matcher: &dyn Matcher,
    item: &S::Item,
    results: &mpsc::Sender<Emitted<S::Entry>>,
    logger: &Logger,
    stats: &mut WorkerStats,
) -> Flow {
    let rows = match source.fetch(item).await {
        Ok(rows) => rows,
        Err(e) => {
            stats.failed_items += 1;
            logger.warn(format_args!("worker {} failed on {:?}: {}", worker_id, item, e));
            return Flow::Continue;
        }
    };

    for row in rows {
        let id = match matcher.match_card(&row.query) {
            Ok(id) => id,
            Err(e) => {
                stats.skipped_rows += 1;
                report_match_error(logger, item, &row.query.to_string(), e);
                continue;
            }
        };

        // 集約側が遅い場合はここで待たされる
        if results.send(Emitted { id, entry: row.entry }).await.is_err() {
            logger.warn(format_args!("worker {}: results channel closed early", worker_id));
            return Flow::Stop;
        }
        stats.emitted += 1;
    }

    Flow::Continue
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn report_match_error<T: Debug>(logger: &Logger, item: &T, query: &str, err: MatchError) {
    match err {
        // 対象外は想定内なのでコールバックには流さない
        MatchError::Unsupported => {
            debug!(source = %logger.prefix(), "unsupported {} in {:?}", query, item);
        }
        MatchError::Ambiguous { query, candidates } => {
            let names: Vec<&str> = candidates.iter().map(|id| id.as_str()).collect();
            logger.warn(format_args!(
                "ambiguous {} in {:?}, candidates: [{}]",
                query,
                item,
                names.join(", ")
            ));
        }
        MatchError::Other(msg) => {
            logger.warn(format_args!("match error for {} in {:?}: {}", query, item, msg));
        }
    }
}

/// 全ワーカーの終了を待ってから結果チャネルを閉じる
pub(crate) async fn close_when_done<E>(
    workers: Vec<JoinHandle<WorkerStats>>,
    results: mpsc::Sender<E>,
    logger: Logger,
) -> WorkerStats {
    let mut total = WorkerStats::default();
    for (i, joined) in join_all(workers).await.into_iter().enumerate() {
        match joined {
            Ok(stats) => total.absorb(stats),
            Err(e) => logger.error(format_args!("worker {} aborted: {}", i, e)),
        }
    }
    drop(results);
    total
}
