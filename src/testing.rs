//! テスト用の決定的なソースとマッチャー

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MatchError, ScraperError};
use crate::record::{CardId, CardQuery, Condition, Entry, InventoryEntry, MergePolicy};
use crate::traits::{Matcher, RawRow, Source};

/// ページ p の行 r は "card-{p}-{r}"
pub(crate) fn inventory_pages(pages: usize, per_page: usize) -> Vec<Vec<RawRow<InventoryEntry>>> {
    (0..pages)
        .map(|p| {
            (0..per_page)
                .map(|r| {
                    RawRow::new(
                        CardQuery::new(format!("card-{}-{}", p, r), "Fixture Set"),
                        InventoryEntry::new(
                            Condition::NM,
                            1.0 + r as f64,
                            format!("https://fixture.test/{}", p),
                        )
                        .with_quantity(1),
                    )
                })
                .collect()
        })
        .collect()
}

pub(crate) struct FixtureSource<E> {
    pages: Vec<Vec<RawRow<E>>>,
    failing: HashSet<usize>,
    panicking: HashSet<usize>,
    stalling: HashSet<usize>,
    live_fetches: AtomicUsize,
    fail_discovery: bool,
    policy: MergePolicy,
    dispatched: Mutex<HashMap<usize, usize>>,
    discover_calls: AtomicUsize,
}

impl<E: Entry> FixtureSource<E> {
    pub(crate) fn new(pages: Vec<Vec<RawRow<E>>>) -> Self {
        Self {
            pages,
            failing: HashSet::new(),
            panicking: HashSet::new(),
            stalling: HashSet::new(),
            live_fetches: AtomicUsize::new(0),
            fail_discovery: false,
            policy: MergePolicy::Plain,
            dispatched: Mutex::new(HashMap::new()),
            discover_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_on(mut self, items: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(items);
        self
    }

    pub(crate) fn panicking_on(mut self, items: impl IntoIterator<Item = usize>) -> Self {
        self.panicking.extend(items);
        self
    }

    /// 指定項目の取得は完了しない
    pub(crate) fn stalling_on(mut self, items: impl IntoIterator<Item = usize>) -> Self {
        self.stalling.extend(items);
        self
    }

    /// 実行中（まだ破棄されていない）fetch の数
    pub(crate) fn live_fetches(&self) -> usize {
        self.live_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub(crate) fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) fn dispatch_counts(&self) -> HashMap<usize, usize> {
        self.dispatched.lock().unwrap().clone()
    }

    pub(crate) fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Entry> Source for FixtureSource<E> {
    type Item = usize;
    type Entry = E;

    async fn discover(&self) -> Result<Vec<usize>, ScraperError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery {
            return Err(ScraperError::Setup("index page unreachable".into()));
        }
        Ok((0..self.pages.len()).collect())
    }

    async fn fetch(&self, item: &usize) -> Result<Vec<RawRow<E>>, ScraperError> {
        *self.dispatched.lock().unwrap().entry(*item).or_insert(0) += 1;
        let _live = LiveFetch::enter(&self.live_fetches);
        tokio::task::yield_now().await;
        if self.panicking.contains(item) {
            panic!("malformed page {}", item);
        }
        if self.stalling.contains(item) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(item) {
            return Err(ScraperError::Fetch(format!("page {} returned 503", item)));
        }
        self.pages
            .get(*item)
            .cloned()
            .ok_or_else(|| ScraperError::Parse(format!("no page {}", item)))
    }

    fn merge_policy(&self) -> MergePolicy {
        self.policy
    }
}

struct LiveFetch<'a>(&'a AtomicUsize);

impl<'a> LiveFetch<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveFetch<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 名前が "unsupported" / "ambiguous" で始まる行はマッチ失敗
pub(crate) struct FixtureMatcher;

impl FixtureMatcher {
    pub(crate) fn id_for(query: &CardQuery) -> CardId {
        CardId::new(format!("{}|{}|{}", query.name, query.edition, query.foil))
    }
}

impl Matcher for FixtureMatcher {
    fn match_card(&self, query: &CardQuery) -> Result<CardId, MatchError> {
        if query.name.starts_with("unsupported") {
            return Err(MatchError::Unsupported);
        }
        if query.name.starts_with("ambiguous") {
            return Err(MatchError::Ambiguous {
                query: query.to_string(),
                candidates: vec![
                    CardId::new(format!("{}|A", query.name)),
                    CardId::new(format!("{}|B", query.name)),
                ],
            });
        }
        Ok(Self::id_for(query))
    }

    fn display_name(&self, id: &CardId) -> Option<String> {
        id.as_str().split('|').next().map(str::to_string)
    }
}
