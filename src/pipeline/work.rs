//! 作業項目の列挙と配布

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// ワーカー間で共有する受信側。1項目はちょうど1ワーカーに渡る
pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// 作業項目を順に送信し、終わったら送信側を閉じる
pub(crate) async fn produce<T: Send>(items: Vec<T>, tx: mpsc::Sender<T>) -> usize {
    let mut sent = 0;
    for item in items {
        if tx.send(item).await.is_err() {
            break;
        }
        sent += 1;
    }
    sent
}

/// 次の作業項目を受け取る。チャネルが閉じていれば None
pub(crate) async fn next_item<T>(rx: &SharedReceiver<T>) -> Option<T> {
    rx.lock().await.recv().await
}

/// 0, step, 2*step, ... (total 未満) のオフセット一覧
pub fn offsets(total: usize, step: usize) -> Vec<usize> {
    if step == 0 {
        return Vec::new();
    }
    (0..total).step_by(step).collect()
}

/// 1始まりのページ番号一覧
pub fn pages(total_items: usize, per_page: usize) -> Vec<usize> {
    if per_page == 0 {
        return Vec::new();
    }
    (1..=total_items.div_ceil(per_page)).collect()
}
