//! Shared asset cache
//!
//! One [`AssetCache`] serves every viewer in the process. The first request
//! for a path starts a load on the blocking pool; requests arriving while that
//! load is in flight wait on the same result instead of starting another one.
//! Successful loads stay cached for the life of the cache. Failed loads are
//! evicted before their waiters are woken, so the next request retries.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::{debug, info, warn};
use maquette_core::{normalize, NormalizedScene, SceneAsset};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};

use crate::error::{IoError, IoResult, LoadError};

/// Source of assets for the cache.
///
/// Called on the blocking pool, so implementations may do synchronous I/O.
pub trait AssetLoader: Send + Sync + 'static {
    fn load(&self, path: &str) -> IoResult<SceneAsset>;
}

impl<F> AssetLoader for F
where
    F: Fn(&str) -> IoResult<SceneAsset> + Send + Sync + 'static,
{
    fn load(&self, path: &str) -> IoResult<SceneAsset> {
        self(path)
    }
}

struct AssetEntry {
    path: String,
    asset: SceneAsset,
    normalized: OnceLock<NormalizedScene>,
}

/// Read-only reference to a loaded asset, shared by every viewer of the same path
#[derive(Clone)]
pub struct AssetHandle(Arc<AssetEntry>);

impl AssetHandle {
    fn new(path: String, asset: SceneAsset) -> Self {
        Self(Arc::new(AssetEntry {
            path,
            asset,
            normalized: OnceLock::new(),
        }))
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }

    pub fn asset(&self) -> &SceneAsset {
        &self.0.asset
    }

    /// Normalized form of the asset, computed on first use and then shared
    pub fn normalized(&self) -> &NormalizedScene {
        self.0.normalized.get_or_init(|| normalize(&self.0.asset))
    }

    /// Whether both handles refer to the same loaded asset
    pub fn ptr_eq(a: &AssetHandle, b: &AssetHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("path", &self.0.path)
            .field("vertices", &self.0.asset.vertex_count())
            .finish()
    }
}

type LoadOutcome = Result<AssetHandle, LoadError>;

enum Slot {
    Ready(AssetHandle),
    Loading(watch::Receiver<Option<LoadOutcome>>),
}

enum Begin {
    Ready(AssetHandle),
    Wait(watch::Receiver<Option<LoadOutcome>>),
}

struct CacheInner {
    loader: Arc<dyn AssetLoader>,
    runtime: Handle,
    slots: Mutex<HashMap<String, Slot>>,
    loads_started: AtomicUsize,
    warmed_up: AtomicBool,
}

/// Process-wide asset cache, cheap to clone
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl AssetCache {
    /// Create a cache that runs loads on `runtime`
    pub fn new(loader: Arc<dyn AssetLoader>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                loader,
                runtime,
                slots: Mutex::new(HashMap::new()),
                loads_started: AtomicUsize::new(0),
                warmed_up: AtomicBool::new(false),
            }),
        }
    }

    /// Create a cache on the runtime of the calling context.
    ///
    /// Panics outside a tokio runtime, like `Handle::current`.
    pub fn on_current_runtime(loader: Arc<dyn AssetLoader>) -> Self {
        Self::new(loader, Handle::current())
    }

    /// Load `path`, or return the cached handle.
    ///
    /// Concurrent calls for the same uncached path share one underlying load
    /// and all receive its result.
    pub async fn load(&self, path: &str) -> Result<AssetHandle, LoadError> {
        let mut rx = match self.begin(path) {
            Begin::Ready(handle) => return Ok(handle),
            Begin::Wait(rx) => rx,
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(result) => result,
            None => {
                self.evict_if_stale(path, &rx);
                Err(LoadError::Abandoned {
                    path: path.to_string(),
                })
            }
        }
    }

    /// Non-blocking variant of [`load`](Self::load) for the frame loop.
    ///
    /// A cached path resolves immediately; otherwise the load runs on the
    /// runtime and the returned request is polled once per frame.
    pub fn request(&self, path: &str) -> AssetRequest {
        if let Some(handle) = self.get(path) {
            return AssetRequest::ready(path, handle);
        }
        let (tx, rx) = oneshot::channel();
        let cache = self.clone();
        let owned = path.to_string();
        self.inner.runtime.spawn(async move {
            let result = cache.load(&owned).await;
            // the requester may have been dropped
            let _ = tx.send(result);
        });
        AssetRequest {
            path: path.to_string(),
            state: RequestState::Pending(rx),
        }
    }

    /// Cached handle for `path`, without starting a load
    pub fn get(&self, path: &str) -> Option<AssetHandle> {
        match self.slots().get(path) {
            Some(Slot::Ready(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn is_loading(&self, path: &str) -> bool {
        matches!(self.slots().get(path), Some(Slot::Loading(_)))
    }

    /// Number of loads handed to the loader since the cache was created
    pub fn loads_started(&self) -> usize {
        self.inner.loads_started.load(Ordering::SeqCst)
    }

    /// Number of successfully loaded assets
    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    pub(crate) fn mark_warmed_up(&self) -> bool {
        !self.inner.warmed_up.swap(true, Ordering::SeqCst)
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // slots are replaced whole, a panic cannot leave one half-written
        self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, path: &str) -> Begin {
        let mut slots = self.slots();
        match slots.get(path) {
            Some(Slot::Ready(handle)) => Begin::Ready(handle.clone()),
            Some(Slot::Loading(rx)) => {
                debug!("joining in-flight load of {}", path);
                Begin::Wait(rx.clone())
            }
            None => {
                let (tx, rx) = watch::channel(None);
                slots.insert(path.to_string(), Slot::Loading(rx.clone()));
                drop(slots);
                self.spawn_load(path.to_string(), tx);
                Begin::Wait(rx)
            }
        }
    }

    fn spawn_load(&self, path: String, tx: watch::Sender<Option<LoadOutcome>>) {
        self.inner.loads_started.fetch_add(1, Ordering::SeqCst);
        let cache = self.clone();
        self.inner.runtime.spawn(async move {
            let loader = Arc::clone(&cache.inner.loader);
            let load_path = path.clone();
            let loaded = tokio::task::spawn_blocking(move || loader.load(&load_path)).await;

            let outcome = match loaded {
                Ok(Ok(asset)) => {
                    info!("loaded {} ({} vertices)", path, asset.vertex_count());
                    Ok(AssetHandle::new(path.clone(), asset))
                }
                Ok(Err(cause)) => Err(cause),
                Err(join) => Err(IoError::ParseError {
                    message: format!("loader task failed: {}", join),
                }),
            }
            .map_err(|cause| {
                warn!("failed to load {}: {}", path, cause);
                LoadError::LoadFailed {
                    path: path.clone(),
                    cause: Arc::new(cause),
                }
            });

            {
                let mut slots = cache.slots();
                match &outcome {
                    Ok(handle) => {
                        slots.insert(path.clone(), Slot::Ready(handle.clone()));
                    }
                    Err(_) => {
                        slots.remove(&path);
                    }
                }
            }
            // waiters may all have gone away
            let _ = tx.send(Some(outcome));
        });
    }

    fn evict_if_stale(&self, path: &str, rx: &watch::Receiver<Option<LoadOutcome>>) {
        let mut slots = self.slots();
        if let Some(Slot::Loading(current)) = slots.get(path) {
            if current.same_channel(rx) {
                slots.remove(path);
            }
        }
    }
}

/// Result of polling an [`AssetRequest`]
#[derive(Debug)]
pub enum RequestPoll {
    Pending,
    Ready(AssetHandle),
    Failed(LoadError),
}

enum RequestState {
    Ready(AssetHandle),
    Pending(oneshot::Receiver<LoadOutcome>),
    Taken,
}

/// An outstanding asset request owned by one viewer
pub struct AssetRequest {
    path: String,
    state: RequestState,
}

impl AssetRequest {
    fn ready(path: &str, handle: AssetHandle) -> Self {
        Self {
            path: path.to_string(),
            state: RequestState::Ready(handle),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check for completion without blocking.
    ///
    /// Returns `Ready` or `Failed` exactly once; afterwards the request reports
    /// `Pending` forever.
    pub fn poll(&mut self) -> RequestPoll {
        match std::mem::replace(&mut self.state, RequestState::Taken) {
            RequestState::Ready(handle) => RequestPoll::Ready(handle),
            RequestState::Pending(mut rx) => match rx.try_recv() {
                Ok(Ok(handle)) => RequestPoll::Ready(handle),
                Ok(Err(err)) => RequestPoll::Failed(err),
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.state = RequestState::Pending(rx);
                    RequestPoll::Pending
                }
                Err(oneshot::error::TryRecvError::Closed) => RequestPoll::Failed(LoadError::Abandoned {
                    path: self.path.clone(),
                }),
            },
            RequestState::Taken => RequestPoll::Pending,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RequestState::Taken)
    }
}

impl fmt::Debug for AssetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            RequestState::Ready(_) => "ready",
            RequestState::Pending(_) => "pending",
            RequestState::Taken => "taken",
        };
        f.debug_struct("AssetRequest")
            .field("path", &self.path)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maquette_core::{Material, MeshPrimitive, Point3f, SceneNode, TriangleMesh};
    use std::time::Duration;

    fn triangle_asset(path: &str) -> SceneAsset {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        SceneAsset::new(path, SceneNode::new().with_primitive(MeshPrimitive::new(mesh, Material::default())))
    }

    struct SlowLoader {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl AssetLoader for SlowLoader {
        fn load(&self, path: &str) -> IoResult<SceneAsset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            if self.fail.load(Ordering::SeqCst) {
                return Err(IoError::FileNotFound { path: path.to_string() });
            }
            Ok(triangle_asset(path))
        }
    }

    fn slow_loader(fail: bool) -> Arc<SlowLoader> {
        Arc::new(SlowLoader {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(fail),
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_loads_coalesce() {
        let loader = slow_loader(false);
        let cache = AssetCache::on_current_runtime(loader.clone());

        let (a, b, c) = tokio::join!(cache.load("a.glb"), cache.load("a.glb"), cache.load("a.glb"));
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loads_started(), 1);
        assert!(AssetHandle::ptr_eq(&a, &b));
        assert!(AssetHandle::ptr_eq(&b, &c));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cached_path_is_not_reloaded() {
        let loader = slow_loader(false);
        let cache = AssetCache::on_current_runtime(loader.clone());

        let first = cache.load("a.glb").await.unwrap();
        let second = cache.load("a.glb").await.unwrap();
        let other = cache.load("b.glb").await.unwrap();

        assert!(AssetHandle::ptr_eq(&first, &second));
        assert!(!AssetHandle::ptr_eq(&first, &other));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_reaches_all_waiters_and_is_retryable() {
        let loader = slow_loader(true);
        let cache = AssetCache::on_current_runtime(loader.clone());

        let (a, b) = tokio::join!(cache.load("broken.glb"), cache.load("broken.glb"));
        for result in [a, b] {
            match result {
                Err(LoadError::LoadFailed { path, cause }) => {
                    assert_eq!(path, "broken.glb");
                    assert!(matches!(*cause, IoError::FileNotFound { .. }));
                }
                other => panic!("expected LoadFailed, got {:?}", other),
            }
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(!cache.contains("broken.glb"));
        assert!(!cache.is_loading("broken.glb"));

        loader.fail.store(false, Ordering::SeqCst);
        let handle = cache.load("broken.glb").await.unwrap();
        assert_eq!(handle.path(), "broken.glb");
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_polls_to_completion() {
        let loader = slow_loader(false);
        let cache = AssetCache::on_current_runtime(loader.clone());

        let mut request = cache.request("a.glb");
        let handle = loop {
            match request.poll() {
                RequestPoll::Pending => tokio::time::sleep(Duration::from_millis(5)).await,
                RequestPoll::Ready(handle) => break handle,
                RequestPoll::Failed(err) => panic!("unexpected failure: {}", err),
            }
        };
        assert!(request.is_finished());
        assert!(matches!(request.poll(), RequestPoll::Pending));

        // cached now, resolves without waiting
        let mut again = cache.request("a.glb");
        match again.poll() {
            RequestPoll::Ready(h) => assert!(AssetHandle::ptr_eq(&h, &handle)),
            other => panic!("expected immediate result, got {:?}", other),
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_normalized_scene_is_shared() {
        let cache = AssetCache::on_current_runtime(Arc::new(|path: &str| -> IoResult<SceneAsset> {
            Ok(triangle_asset(path))
        }));
        let a = cache.load("t.glb").await.unwrap();
        let b = cache.load("t.glb").await.unwrap();
        assert!(std::ptr::eq(a.normalized(), b.normalized()));
        approx::assert_relative_eq!(a.normalized().scale, 2.0);
    }
}
