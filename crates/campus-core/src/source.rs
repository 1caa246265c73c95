//! Data sources for page loading.
//!
//! Every view resolves its data through one or more [`DataSource`]s. All of
//! them produce a [`LoadState`], whatever the strategy:
//!
//! | Strategy                | Type                   | Shared by         | On failure          |
//! |-------------------------|------------------------|-------------------|---------------------|
//! | request-time            | [`RequestTimeSource`]  | concurrent callers| `T::default()`      |
//! | built + revalidated     | [`RevalidatingSource`] | everyone          | keep previous value |
//! | post-render (per caller)| [`PostRenderSource`]   | nobody            | `Failed`            |
//!
//! The revalidating source implements stale-while-revalidate: once its value
//! is older than the interval, the next read returns the old value and starts
//! exactly one background refresh; readers keep getting the old value until
//! the refresh lands.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use metrics::counter;
use moka::future::Cache;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// A repeatable fetch producing `T`.
pub type Fetch<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A repeatable fetch keyed by `K`; `Ok(None)` means the key does not exist
/// upstream.
pub type KeyedFetch<K, T> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<Option<T>>> + Send + Sync>;

/// Wrap an async closure as a [`Fetch`].
pub fn fetch_fn<T, F, Fut>(f: F) -> Fetch<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Wrap an async closure as a [`KeyedFetch`].
pub fn keyed_fetch_fn<K, T, F, Fut>(f: F) -> KeyedFetch<K, T>
where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<T>>> + Send + 'static,
{
    Arc::new(move |key| f(key).boxed())
}

/// Result of loading data for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Not resolved yet; the view shows a placeholder.
    Loading,
    /// Data available.
    Ready(T),
    /// The load failed; carries a message for logs, not for users.
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadState<U> {
        match self {
            Self::Loading => LoadState::Loading,
            Self::Ready(value) => LoadState::Ready(f(value)),
            Self::Failed(msg) => LoadState::Failed(msg),
        }
    }
}

/// How a data source decides when to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fetched for each request before rendering.
    RequestTime,
    /// Built ahead of time, refreshed in the background once older than
    /// `interval`.
    Revalidate { interval: Duration },
    /// Fetched after the page is shown, separately for each caller.
    PostRender,
}

impl Strategy {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RequestTime => "request_time",
            Self::Revalidate { .. } => "revalidate",
            Self::PostRender => "post_render",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Something a view can load its data from.
#[async_trait]
pub trait DataSource<T>: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn load(&self) -> LoadState<T>;
}

fn record_load(strategy: Strategy) {
    counter!("datasource_loads_total", "strategy" => strategy.label()).increment(1);
}

/// Runs its closure when dropped, including while a panic unwinds.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Request-time
// ═══════════════════════════════════════════════════════════════════════════

/// Fetches on every request. Callers that arrive while a fetch is in flight
/// join it and get the identical value. Failures yield `T::default()`.
///
/// The fetch runs in its own task, which clears the in-flight slot when it
/// finishes. A caller that goes away mid-fetch never leaves a stale result
/// behind for later requests.
pub struct RequestTimeSource<T> {
    name: &'static str,
    fetch: Fetch<T>,
    inflight: Arc<Mutex<Option<Shared<BoxFuture<'static, T>>>>>,
}

impl<T> RequestTimeSource<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    pub fn new(name: &'static str, fetch: Fetch<T>) -> Self {
        Self {
            name,
            fetch,
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Fetch (or join the in-flight fetch) and return the value.
    pub async fn get(&self) -> T {
        let shared = {
            let mut inflight = self.inflight.lock();
            match inflight.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let fut = self.spawn_fetch();
                    *inflight = Some(fut.clone());
                    fut
                }
            }
        };

        shared.await
    }

    /// Start a fetch task. Must be called with the in-flight slot locked so
    /// the task cannot clear the slot before it is filled.
    fn spawn_fetch(&self) -> Shared<BoxFuture<'static, T>> {
        let fetch = Arc::clone(&self.fetch);
        let slot = Arc::clone(&self.inflight);
        let name = self.name;

        let task = tokio::spawn(async move {
            let _clear = OnDrop(move || *slot.lock() = None);
            match fetch().await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(source = name, error = %e, "request-time fetch failed, using default");
                    T::default()
                }
            }
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::warn!(source = name, error = %e, "request-time fetch task died, using default");
                T::default()
            })
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl<T> DataSource<T> for RequestTimeSource<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn strategy(&self) -> Strategy {
        Strategy::RequestTime
    }

    async fn load(&self) -> LoadState<T> {
        record_load(self.strategy());
        LoadState::Ready(self.get().await)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Revalidating (stale-while-revalidate)
// ═══════════════════════════════════════════════════════════════════════════

/// A value together with when it was produced.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub value: T,
    pub fetched_at: Instant,
    pub generated_at: DateTime<Utc>,
}

/// Built once ahead of time ([`prime`](Self::prime)), then served to every
/// reader. Reads after `interval` has elapsed trigger a single background
/// refresh and still return the previous value.
pub struct RevalidatingSource<T> {
    inner: Arc<RevalidatingInner<T>>,
}

struct RevalidatingInner<T> {
    name: String,
    fetch: Fetch<T>,
    interval: Duration,
    slot: RwLock<Option<Snapshot<T>>>,
    refreshing: AtomicBool,
}

impl<T> Clone for RevalidatingSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> RevalidatingInner<T> {
    fn store(&self, value: T) {
        *self.slot.write() = Some(Snapshot {
            value,
            fetched_at: Instant::now(),
            generated_at: Utc::now(),
        });
    }
}

impl<T> RevalidatingSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, interval: Duration, fetch: Fetch<T>) -> Self {
        Self {
            inner: Arc::new(RevalidatingInner {
                name: name.into(),
                fetch,
                interval,
                slot: RwLock::new(None),
                refreshing: AtomicBool::new(false),
            }),
        }
    }

    /// Build the value now. On failure the source stays unbuilt and the
    /// first read fetches on demand.
    pub async fn prime(&self) -> Result<()> {
        let value = (self.inner.fetch)().await?;
        self.inner.store(value);
        Ok(())
    }

    /// Current snapshot, if built.
    pub fn snapshot(&self) -> Option<Snapshot<T>> {
        self.inner.slot.read().clone()
    }

    /// Whether the built value is older than the interval.
    pub fn is_stale(&self) -> bool {
        self.inner
            .slot
            .read()
            .as_ref()
            .is_some_and(|s| s.fetched_at.elapsed() >= self.inner.interval)
    }

    /// Whether a background refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    /// Serve the built value, scheduling a refresh if it is stale. An unbuilt
    /// source fetches inline for this reader.
    pub async fn read(&self) -> LoadState<T> {
        if let Some(snapshot) = self.snapshot() {
            if snapshot.fetched_at.elapsed() >= self.inner.interval {
                self.spawn_refresh();
            }
            return LoadState::Ready(snapshot.value);
        }

        match (self.inner.fetch)().await {
            Ok(value) => {
                self.inner.store(value.clone());
                LoadState::Ready(value)
            }
            Err(e) => {
                tracing::warn!(source = %self.inner.name, error = %e, "on-demand build failed");
                LoadState::Failed(e.to_string())
            }
        }
    }

    fn spawn_refresh(&self) {
        if self.inner.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tracing::debug!(source = %inner.name, "stale, revalidating in background");
        tokio::spawn(async move {
            let _reset = OnDrop(|| inner.refreshing.store(false, Ordering::Release));
            match (inner.fetch)().await {
                Ok(value) => {
                    inner.store(value);
                    counter!("datasource_revalidations_total", "outcome" => "ok").increment(1);
                }
                Err(e) => {
                    tracing::warn!(source = %inner.name, error = %e, "revalidation failed, keeping previous value");
                    counter!("datasource_revalidations_total", "outcome" => "error").increment(1);
                }
            }
        });
    }
}

#[async_trait]
impl<T> DataSource<T> for RevalidatingSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn strategy(&self) -> Strategy {
        Strategy::Revalidate {
            interval: self.inner.interval,
        }
    }

    async fn load(&self) -> LoadState<T> {
        record_load(self.strategy());
        self.read().await
    }
}

/// Default upper bound on cached pages per [`RevalidatingPages`].
pub const DEFAULT_PAGE_CAPACITY: u64 = 1_000;

/// A set of revalidating pages keyed by id (one record per page).
///
/// Keys passed to [`prebuild`](Self::prebuild) are built ahead of time. A key
/// outside that set is fetched on demand the first time it is requested and
/// joins the set if the fetch succeeds; concurrent first requests for the
/// same key share that fetch. `Ready(None)` means the record does not exist
/// upstream. The set holds at most `capacity` pages; the least useful ones
/// are evicted first.
pub struct RevalidatingPages<K, T> {
    name: &'static str,
    interval: Duration,
    fetch: KeyedFetch<K, T>,
    pages: Cache<K, RevalidatingSource<Option<T>>>,
}

impl<K, T> RevalidatingPages<K, T>
where
    K: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        interval: Duration,
        capacity: u64,
        fetch: KeyedFetch<K, T>,
    ) -> Self {
        Self {
            name,
            interval,
            fetch,
            pages: Cache::builder().max_capacity(capacity).build(),
        }
    }

    fn source_for(&self, key: K) -> RevalidatingSource<Option<T>> {
        let fetch = Arc::clone(&self.fetch);
        let name = format!("{}/{}", self.name, key);
        let page_fetch: Fetch<Option<T>> = Arc::new(move || fetch(key.clone()));
        RevalidatingSource::new(name, self.interval, page_fetch)
    }

    /// Build pages for `keys` concurrently. Keys whose build fails are left
    /// out and fall back to on-demand fetching. Returns how many were built.
    pub async fn prebuild(&self, keys: impl IntoIterator<Item = K>) -> usize {
        let sources: Vec<(K, RevalidatingSource<Option<T>>)> = keys
            .into_iter()
            .map(|key| (key.clone(), self.source_for(key)))
            .collect();

        let results = join_all(sources.iter().map(|(_, source)| source.prime())).await;

        let mut built = 0;
        for ((key, source), result) in sources.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    self.pages.insert(key, source).await;
                    built += 1;
                }
                Err(e) => {
                    tracing::warn!(source = self.name, key = %key, error = %e, "failed to pre-build page");
                }
            }
        }
        self.sync().await;

        tracing::info!(source = self.name, built = built, "pages pre-built");
        built
    }

    /// Whether `key` has a built page.
    pub fn contains(&self, key: &K) -> bool {
        self.pages.contains_key(key)
    }

    /// Number of built pages (may lag evictions until [`sync`](Self::sync)).
    pub fn len(&self) -> usize {
        usize::try_from(self.pages.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.pages.entry_count() == 0
    }

    /// Run pending cache maintenance (evictions, counts).
    pub async fn sync(&self) {
        self.pages.run_pending_tasks().await;
    }

    /// When the page currently served for `key` was generated.
    pub async fn generated_at(&self, key: &K) -> Option<DateTime<Utc>> {
        let source = self.pages.get(key).await?;
        source.snapshot().map(|snapshot| snapshot.generated_at)
    }

    /// Load the page for `key`, fetching on demand if it was never built.
    pub async fn load(&self, key: K) -> LoadState<Option<T>> {
        record_load(Strategy::Revalidate {
            interval: self.interval,
        });

        let build = async {
            counter!("datasource_fallback_fetches_total").increment(1);
            tracing::debug!(source = self.name, key = %key, "page not pre-built, fetching on demand");

            let source = self.source_for(key.clone());
            match source.read().await {
                LoadState::Ready(_) => Ok(source),
                LoadState::Failed(reason) => Err(reason),
                LoadState::Loading => Err("page build did not settle".to_string()),
            }
        };

        match self.pages.try_get_with(key.clone(), build).await {
            Ok(source) => source.read().await,
            Err(reason) => LoadState::Failed(reason.to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Post-render
// ═══════════════════════════════════════════════════════════════════════════

/// Fetched after the page is shown, once per caller, bounded by a timeout.
pub struct PostRenderSource<T> {
    name: &'static str,
    fetch: Fetch<T>,
    timeout: Duration,
}

impl<T> PostRenderSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, timeout: Duration, fetch: Fetch<T>) -> Self {
        Self {
            name,
            fetch,
            timeout,
        }
    }

    /// Start a load for one caller. The returned handle reports `Loading`
    /// until the fetch settles; dropping it cancels the fetch and any late
    /// result is discarded.
    pub fn start(&self) -> PostRenderLoad<T> {
        let (tx, rx) = watch::channel(LoadState::Loading);
        let fetch = Arc::clone(&self.fetch);
        let timeout = self.timeout;
        let name = self.name;

        let task = tokio::spawn(async move {
            let state = match tokio::time::timeout(timeout, fetch()).await {
                Ok(Ok(value)) => LoadState::Ready(value),
                Ok(Err(e)) => {
                    tracing::warn!(source = name, error = %e, "post-render fetch failed");
                    LoadState::Failed(e.to_string())
                }
                Err(_) => {
                    tracing::warn!(source = name, timeout_ms = timeout.as_millis() as u64, "post-render fetch timed out");
                    LoadState::Failed(Error::Timeout(timeout).to_string())
                }
            };

            if tx.send(state).is_err() {
                counter!("datasource_discarded_total").increment(1);
                tracing::debug!(source = name, "caller gone, discarding result");
            }
        });

        PostRenderLoad { rx, task }
    }
}

#[async_trait]
impl<T> DataSource<T> for PostRenderSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn strategy(&self) -> Strategy {
        Strategy::PostRender
    }

    async fn load(&self) -> LoadState<T> {
        record_load(self.strategy());
        self.start().settled().await
    }
}

/// One caller's in-flight post-render load.
pub struct PostRenderLoad<T> {
    rx: watch::Receiver<LoadState<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> PostRenderLoad<T> {
    /// Current state without waiting.
    pub fn state(&self) -> LoadState<T> {
        self.rx.borrow().clone()
    }

    /// Wait until the load is `Ready` or `Failed`.
    pub async fn settled(mut self) -> LoadState<T> {
        let settled = self
            .rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.clone());

        settled.unwrap_or_else(|_| LoadState::Failed("load cancelled".to_string()))
    }
}

impl<T> Drop for PostRenderLoad<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Counts calls; call `n` yields `n`.
    fn counting_fetch(calls: Arc<AtomicUsize>) -> Fetch<usize> {
        fetch_fn(move || {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        })
    }

    fn failing_fetch<T: Send + 'static>() -> Fetch<T> {
        fetch_fn(|| async {
            Err(Error::Status {
                status: 500,
                url: "https://dummyjson.com/users".to_string(),
            })
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    // -- request-time --

    #[tokio::test]
    async fn request_time_failure_yields_default() {
        let source: RequestTimeSource<u64> = RequestTimeSource::new("user_count", failing_fetch());
        assert_eq!(source.load().await, LoadState::Ready(0));
        assert_eq!(source.strategy(), Strategy::RequestTime);
    }

    #[tokio::test]
    async fn request_time_fetches_each_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = RequestTimeSource::new("n", counting_fetch(Arc::clone(&calls)));
        assert_eq!(source.get().await, 1);
        assert_eq!(source.get().await, 2);
    }

    #[tokio::test]
    async fn request_time_concurrent_callers_share_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));
        let fetch = {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            fetch_fn(move || {
                let calls = Arc::clone(&calls);
                let gate = Arc::clone(&gate);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    let _permit = gate.acquire().await.expect("gate open");
                    Ok(n)
                }
            })
        };
        let source = Arc::new(RequestTimeSource::new("n", fetch));

        let a = tokio::spawn({
            let source = Arc::clone(&source);
            async move { source.get().await }
        });
        let b = tokio::spawn({
            let source = Arc::clone(&source);
            async move { source.get().await }
        });
        settle().await;
        gate.add_permits(1);

        assert_eq!(a.await.unwrap(), 1);
        assert_eq!(b.await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_time_abandoned_fetch_is_not_reused() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = {
            let calls = Arc::clone(&calls);
            fetch_fn(move || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(n * 100)
                }
            })
        };
        let source = RequestTimeSource::new("user_count", fetch);

        // The only caller disconnects mid-fetch.
        let abandoned = tokio::time::timeout(Duration::from_millis(100), source.get()).await;
        assert!(abandoned.is_err());

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;

        assert_eq!(source.get().await, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // -- revalidating --

    #[tokio::test(start_paused = true)]
    async fn revalidating_serves_built_value_until_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = RevalidatingSource::new(
            "count",
            Duration::from_secs(10),
            counting_fetch(Arc::clone(&calls)),
        );
        source.prime().await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(source.read().await, LoadState::Ready(1));
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!source.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn revalidating_serves_stale_while_single_refresh_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));
        let fetch = {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            fetch_fn(move || {
                let calls = Arc::clone(&calls);
                let gate = Arc::clone(&gate);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n > 1 {
                        let _permit = gate.acquire().await.expect("gate open");
                    }
                    Ok(n)
                }
            })
        };
        let source = RevalidatingSource::new("count", Duration::from_secs(10), fetch);
        source.prime().await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(source.is_stale());

        // Stale read: old value, refresh started.
        assert_eq!(source.read().await, LoadState::Ready(1));
        settle().await;
        assert!(source.is_refreshing());

        // Concurrent readers during the refresh keep seeing the old value and
        // do not start another refresh.
        for _ in 0..5 {
            assert_eq!(source.read().await, LoadState::Ready(1));
        }
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        gate.add_permits(1);
        settle().await;
        assert!(!source.is_refreshing());
        assert_eq!(source.read().await, LoadState::Ready(2));
        assert!(!source.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn revalidating_keeps_previous_value_when_refresh_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = {
            let calls = Arc::clone(&calls);
            fetch_fn(move || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Ok("built".to_string())
                    } else {
                        Err(Error::Timeout(Duration::from_secs(5)))
                    }
                }
            })
        };
        let source = RevalidatingSource::new("label", Duration::from_secs(10), fetch);
        source.prime().await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(source.read().await, LoadState::Ready("built".to_string()));
        settle().await;
        assert!(!source.is_refreshing());
        assert_eq!(source.read().await, LoadState::Ready("built".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn revalidating_recovers_after_refresh_panics() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = {
            let calls = Arc::clone(&calls);
            fetch_fn(move || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 2 {
                        panic!("decoder bug");
                    }
                    Ok(n)
                }
            })
        };
        let source = RevalidatingSource::new("count", Duration::from_secs(10), fetch);
        source.prime().await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(source.read().await, LoadState::Ready(1));
        settle().await;
        assert!(!source.is_refreshing());

        // Still stale, so the next read retries.
        assert_eq!(source.read().await, LoadState::Ready(1));
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(source.read().await, LoadState::Ready(3));
    }

    #[tokio::test]
    async fn unbuilt_revalidating_fetches_on_demand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = RevalidatingSource::new(
            "count",
            Duration::from_secs(10),
            counting_fetch(Arc::clone(&calls)),
        );
        assert!(source.snapshot().is_none());
        assert_eq!(source.load().await, LoadState::Ready(1));
        assert_eq!(source.load().await, LoadState::Ready(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let broken: RevalidatingSource<u64> =
            RevalidatingSource::new("broken", Duration::from_secs(10), failing_fetch());
        assert!(matches!(broken.load().await, LoadState::Failed(_)));
        assert!(broken.prime().await.is_err());
    }

    // -- revalidating pages --

    fn pages(calls: Arc<AtomicUsize>) -> RevalidatingPages<u32, String> {
        RevalidatingPages::new(
            "student",
            Duration::from_secs(10),
            DEFAULT_PAGE_CAPACITY,
            keyed_fetch_fn(move |id: u32| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    match id {
                        500 => Err(Error::Timeout(Duration::from_secs(5))),
                        1..=100 => Ok(Some(format!("student {id}"))),
                        _ => Ok(None),
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn prebuilt_pages_are_served_without_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pages = pages(Arc::clone(&calls));
        assert_eq!(pages.prebuild([1, 2, 3, 500]).await, 3);
        assert_eq!(pages.len(), 3);
        assert!(!pages.contains(&500));
        let after_build = calls.load(Ordering::SeqCst);

        assert_eq!(pages.load(2).await, LoadState::Ready(Some("student 2".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), after_build);
    }

    #[tokio::test]
    async fn missing_key_falls_back_to_on_demand_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pages = pages(Arc::clone(&calls));
        pages.prebuild([1, 2]).await;
        assert!(!pages.contains(&42));

        assert_eq!(pages.load(42).await, LoadState::Ready(Some("student 42".to_string())));
        assert!(pages.contains(&42));

        let before = calls.load(Ordering::SeqCst);
        pages.load(42).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn upstream_not_found_is_ready_none() {
        let pages = pages(Arc::new(AtomicUsize::new(0)));
        assert_eq!(pages.load(9999).await, LoadState::Ready(None));
    }

    #[tokio::test]
    async fn failed_fallback_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pages = pages(Arc::clone(&calls));
        assert!(matches!(pages.load(500).await, LoadState::Failed(_)));
        assert!(!pages.contains(&500));
        pages.load(500).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn on_demand_pages_stay_bounded() {
        let pages: RevalidatingPages<u32, String> = RevalidatingPages::new(
            "student",
            Duration::from_secs(10),
            100,
            keyed_fetch_fn(|_id: u32| async { Ok(None) }),
        );

        for id in 1000..6000 {
            assert_eq!(pages.load(id).await, LoadState::Ready(None));
        }
        pages.sync().await;
        assert!(pages.len() <= 100, "cached {} pages", pages.len());
    }

    #[tokio::test]
    async fn concurrent_first_requests_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));
        let pages = {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            Arc::new(RevalidatingPages::new(
                "student",
                Duration::from_secs(10),
                DEFAULT_PAGE_CAPACITY,
                keyed_fetch_fn(move |id: u32| {
                    let calls = Arc::clone(&calls);
                    let gate = Arc::clone(&gate);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _permit = gate.acquire().await.expect("gate open");
                        Ok(Some(format!("student {id}")))
                    }
                }),
            ))
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let pages = Arc::clone(&pages);
                tokio::spawn(async move { pages.load(7).await })
            })
            .collect();
        settle().await;
        gate.add_permits(1);

        for reader in readers {
            assert_eq!(
                reader.await.unwrap(),
                LoadState::Ready(Some("student 7".to_string()))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn built_pages_report_generation_time() {
        let pages = pages(Arc::new(AtomicUsize::new(0)));
        assert!(pages.generated_at(&3).await.is_none());

        let before = Utc::now();
        pages.prebuild([3]).await;
        let generated = pages.generated_at(&3).await.unwrap();
        assert!(generated >= before && generated <= Utc::now());
    }

    // -- post-render --

    #[tokio::test]
    async fn post_render_starts_loading_then_settles() {
        let gate = Arc::new(Semaphore::new(0));
        let fetch = {
            let gate = Arc::clone(&gate);
            fetch_fn(move || {
                let gate = Arc::clone(&gate);
                async move {
                    let _permit = gate.acquire().await.expect("gate open");
                    Ok(vec!["Emily Johnson".to_string()])
                }
            })
        };
        let source = PostRenderSource::new("recent", Duration::from_secs(5), fetch);

        let load = source.start();
        assert!(load.state().is_loading());
        gate.add_permits(1);
        assert_eq!(
            load.settled().await,
            LoadState::Ready(vec!["Emily Johnson".to_string()])
        );
    }

    #[tokio::test]
    async fn post_render_failure_is_distinguishable() {
        let source: PostRenderSource<Vec<String>> =
            PostRenderSource::new("recent", Duration::from_secs(5), failing_fetch());
        let state = source.load().await;
        assert!(matches!(state, LoadState::Failed(ref msg) if msg.contains("500")));
        assert_eq!(source.strategy(), Strategy::PostRender);
    }

    #[tokio::test(start_paused = true)]
    async fn post_render_times_out() {
        let fetch = fetch_fn(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1u8)
        });
        let source = PostRenderSource::new("slow", Duration::from_secs(5), fetch);
        let state = source.load().await;
        assert!(matches!(state, LoadState::Failed(ref msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn dropped_post_render_load_discards_late_result() {
        let gate = Arc::new(Semaphore::new(0));
        let applied = Arc::new(AtomicBool::new(false));
        let fetch = {
            let gate = Arc::clone(&gate);
            let applied = Arc::clone(&applied);
            fetch_fn(move || {
                let gate = Arc::clone(&gate);
                let applied = Arc::clone(&applied);
                async move {
                    let _permit = gate.acquire().await.expect("gate open");
                    applied.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let source = PostRenderSource::new("recent", Duration::from_secs(5), fetch);

        let load = source.start();
        settle().await;
        drop(load);
        gate.add_permits(1);
        settle().await;
        assert!(!applied.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn all_strategies_share_result_shape() {
        let sources: Vec<Box<dyn DataSource<u64>>> = vec![
            Box::new(RequestTimeSource::new(
                "a",
                fetch_fn(|| async { Ok(7u64) }),
            )),
            Box::new(RevalidatingSource::new(
                "b",
                Duration::from_secs(10),
                fetch_fn(|| async { Ok(7u64) }),
            )),
            Box::new(PostRenderSource::new(
                "c",
                Duration::from_secs(5),
                fetch_fn(|| async { Ok(7u64) }),
            )),
        ];

        let labels: Vec<&str> = sources.iter().map(|s| s.strategy().label()).collect();
        assert_eq!(labels, vec!["request_time", "revalidate", "post_render"]);
        for source in &sources {
            assert_eq!(source.load().await, LoadState::Ready(7));
        }
    }

    #[test]
    fn load_state_helpers() {
        let ready: LoadState<u8> = LoadState::Ready(2);
        assert_eq!(ready.clone().map(|v| v * 2), LoadState::Ready(4));
        assert_eq!(ready.as_ready(), Some(&2));
        assert!(LoadState::<u8>::Loading.into_ready().is_none());
        let failed: LoadState<u8> = LoadState::Failed("x".into());
        assert_eq!(failed.map(|v| v + 1), LoadState::Failed("x".into()));
    }
}
