//! Concurrent fan-out/fan-in tree walker.
//!
//! Every descent into a container value (object or array) is dispatched as
//! its own Tokio task. Matches are delivered over one unbounded channel to
//! a collector task that owns the result list.
//!
//! # Completion tracking
//!
//! ```text
//! detect()
//!     |
//!     +-- spawn collector ------------------+ owns Vec<Geo>
//!     |                                      ^
//!     +-- dispatch(root) --> unit --> emit --+ (mpsc, unordered)
//!     |                        |
//!     |                        +-- dispatch(child) --> unit ...
//!     |                        +-- join children (JoinSet)
//!     |
//!     +-- wait until outstanding == 0
//!     +-- stop collector, return its list
//! ```
//!
//! Each dispatched unit holds a [`WorkGuard`]; the outstanding counter is
//! decremented when the guard drops, which happens only after the unit has
//! joined every child it spawned.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt as _;
use futures::future::BoxFuture;
use geobin_types::{Geo, GeoPath};
use serde_json::{Map, Value};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::classify::{self, Point};

/// Hardening limits for hostile input.
///
/// The defaults impose no limits: one task per container, any depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Maximum number of units classifying at the same time.
    ///
    /// Units give their permit back before waiting on children, so a
    /// small cap slows deep documents down but never deadlocks them.
    pub max_concurrency: Option<usize>,

    /// Containers deeper than this many path segments are not visited.
    pub max_depth: Option<usize>,
}

/// The geo-detection engine.
///
/// Cheap to clone; clones share the concurrency cap.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    permits: Option<Arc<Semaphore>>,
    max_depth: Option<usize>,
}

impl Detector {
    /// Create a detector with the given limits.
    pub fn new(options: DetectOptions) -> Self {
        Self {
            permits: options
                .max_concurrency
                .map(|n| Arc::new(Semaphore::new(n.clamp(1, Semaphore::MAX_PERMITS)))),
            max_depth: options.max_depth,
        }
    }

    /// Find every geographic point in `document`.
    ///
    /// Returns once the whole document has been visited. The order of the
    /// result across sibling subtrees is unspecified. Never fails: shapes
    /// that are not recognized simply contribute nothing.
    pub async fn detect(&self, document: Value) -> Vec<Geo> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let collector = tokio::spawn(collect(rx, stop_rx));

        let tracker = Arc::new(Tracker::default());
        let walk = Walk {
            tx,
            tracker: Arc::clone(&tracker),
            permits: self.permits.clone(),
            max_depth: self.max_depth,
        };

        let mut root = JoinSet::new();
        walk.dispatch(&mut root, document, GeoPath::root());
        drop(walk);

        tracker.wait_idle().await;
        while let Some(joined) = root.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "geo detection task failed");
            }
        }

        // Every unit has finished sending; let the collector drain and stop.
        let _ = stop_tx.send(());
        match collector.await {
            Ok(found) => {
                debug!(points = found.len(), "geo detection complete");
                found
            }
            Err(e) => {
                warn!(error = %e, "geo collector failed");
                Vec::new()
            }
        }
    }
}

/// Find every geographic point in `document` with no hardening limits.
pub async fn detect(document: Value) -> Vec<Geo> {
    Detector::default().detect(document).await
}

/// Owns the result list; the only writer to it.
async fn collect(
    mut rx: mpsc::UnboundedReceiver<Geo>,
    mut stop: oneshot::Receiver<()>,
) -> Vec<Geo> {
    let mut found = Vec::new();
    loop {
        tokio::select! {
            Some(geo) = rx.recv() => found.push(geo),
            _ = &mut stop => break,
        }
    }
    // No further input is accepted; keep whatever is already queued.
    rx.close();
    while let Some(geo) = rx.recv().await {
        found.push(geo);
    }
    found
}

/// Outstanding-work counter shared by every unit of one detection.
#[derive(Debug, Default)]
struct Tracker {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl Tracker {
    fn begin(self: &Arc<Self>) -> WorkGuard {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        WorkGuard {
            tracker: Arc::clone(self),
        }
    }

    async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Marks one dispatched unit as outstanding until dropped.
#[derive(Debug)]
struct WorkGuard {
    tracker: Arc<Tracker>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.tracker.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}

/// Shared context handed to every unit of one detection.
#[derive(Clone)]
struct Walk {
    tx: mpsc::UnboundedSender<Geo>,
    tracker: Arc<Tracker>,
    permits: Option<Arc<Semaphore>>,
    max_depth: Option<usize>,
}

impl Walk {
    /// Spawn a unit for `value` at `path` into `tasks`.
    fn dispatch(&self, tasks: &mut JoinSet<()>, value: Value, path: GeoPath) {
        let guard = self.tracker.begin();
        tasks.spawn(self.clone().descend(value, path, guard));
    }

    fn descend(self, value: Value, path: GeoPath, guard: WorkGuard) -> BoxFuture<'static, ()> {
        async move {
            let mut children = JoinSet::new();
            {
                let _permit = self.acquire().await;
                self.visit(value, &path, &mut children);
            }
            while let Some(joined) = children.join_next().await {
                if let Err(e) = joined {
                    warn!(path = %path, error = %e, "geo detection task failed");
                }
            }
            drop(guard);
        }
        .boxed()
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permits = Arc::clone(self.permits.as_ref()?);
        permits.acquire_owned().await.ok()
    }

    fn visit(&self, value: Value, path: &GeoPath, children: &mut JoinSet<()>) {
        match value {
            Value::Array(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    self.descend_into(children, item, path.index(index));
                }
            }
            Value::Object(object) => match classify::match_object(object) {
                Ok(point) => self.emit(point, path.clone()),
                Err(object) => self.visit_fields(object, path, children),
            },
            _ => {}
        }
    }

    fn visit_fields(&self, object: Map<String, Value>, path: &GeoPath, children: &mut JoinSet<()>) {
        for (key, value) in object {
            let child_path = path.key(key.as_str());
            match value {
                Value::Object(nested) if classify::is_geo_ref_key(&key) => {
                    match classify::match_object(nested) {
                        Ok(point) => self.emit(point, child_path),
                        Err(nested) => {
                            self.descend_into(children, Value::Object(nested), child_path);
                        }
                    }
                }
                other => self.descend_into(children, other, child_path),
            }
        }
    }

    fn descend_into(&self, children: &mut JoinSet<()>, value: Value, path: GeoPath) {
        if !matches!(value, Value::Object(_) | Value::Array(_)) {
            return;
        }
        if self.max_depth.is_some_and(|max| path.len() > max) {
            trace!(path = %path, "max depth reached, not descending");
            return;
        }
        self.dispatch(children, value, path);
    }

    fn emit(&self, point: Point, path: GeoPath) {
        trace!(path = %path, "geo found");
        let geo = Geo {
            geometry: point.geometry,
            radius: point.radius,
            path,
        };
        if self.tx.send(geo).is_err() {
            debug!("geo collector stopped before delivery");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn scalar_document_yields_nothing() {
        assert!(detect(json!(42)).await.is_empty());
        assert!(detect(json!("lat")).await.is_empty());
        assert!(detect(Value::Null).await.is_empty());
    }

    #[tokio::test]
    async fn empty_containers_yield_nothing() {
        assert!(detect(json!({})).await.is_empty());
        assert!(detect(json!([])).await.is_empty());
        assert!(detect(json!([[], {}, [{}]])).await.is_empty());
    }

    #[tokio::test]
    async fn tracker_returns_immediately_when_idle() {
        let tracker = Arc::new(Tracker::default());
        tracker.wait_idle().await;

        let guard = tracker.begin();
        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        assert!(waiter.await.is_ok());
        assert_eq!(tracker.outstanding.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn collector_drains_queued_points_after_stop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        for i in 0..3 {
            let sent = tx.send(Geo {
                geometry: json!({"type": "Point", "coordinates": [i, i]}),
                radius: None,
                path: GeoPath::root().index(i),
            });
            assert!(sent.is_ok());
        }
        let _ = stop_tx.send(());
        let found = collect(rx, stop_rx).await;
        assert_eq!(found.len(), 3);
        // The channel is closed to late senders.
        assert!(
            tx.send(Geo {
                geometry: Value::Null,
                radius: None,
                path: GeoPath::root()
            })
            .is_err()
        );
    }

    #[tokio::test]
    async fn zero_concurrency_is_treated_as_one() {
        let detector = Detector::new(DetectOptions {
            max_concurrency: Some(0),
            max_depth: None,
        });
        let found = detector.detect(json!([{"x": 1, "y": 2}, {"x": 3, "y": 4}])).await;
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn oversized_concurrency_is_clamped() {
        let detector = Detector::new(DetectOptions {
            max_concurrency: Some(usize::MAX),
            max_depth: None,
        });
        let permits = detector.permits.as_ref().map(|p| p.available_permits());
        assert_eq!(permits, Some(Semaphore::MAX_PERMITS));
        assert_eq!(detector.detect(json!({"x": 1, "y": 2})).await.len(), 1);
    }
}
