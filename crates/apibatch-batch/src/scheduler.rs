//! Bounded-parallel scheduler.
//!
//! Up to `parallelism` workers pull the next unclaimed index from a shared
//! counter and write their output into a pre-sized store at that index.
//! Every index is claimed by exactly one worker, so slots never collide and
//! the caller reads results back in index order.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use tracing::{error, trace};

/// Hands out each index in `0..len` exactly once.
#[derive(Debug)]
pub struct IndexSupply {
    next: AtomicUsize,
    len: usize,
}

impl IndexSupply {
    pub fn new(len: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
        }
    }

    /// Claim the next index, or `None` when all are taken.
    pub fn claim(&self) -> Option<usize> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        (idx < self.len).then_some(idx)
    }
}

/// Fixed-length, write-once result slots.
#[derive(Debug)]
pub struct ResultStore<T> {
    slots: Vec<OnceLock<T>>,
}

impl<T> ResultStore<T> {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Store `value` at `index`. Returns `false` if the slot was already
    /// filled or `index` is out of range.
    pub fn put(&self, index: usize, value: T) -> bool {
        self.slots
            .get(index)
            .map(|slot| slot.set(value).is_ok())
            .unwrap_or(false)
    }

    pub fn into_slots(self) -> Vec<Option<T>> {
        self.slots.into_iter().map(OnceLock::into_inner).collect()
    }
}

/// Run `task(i)` for every `i` in `0..len` with at most `parallelism` tasks
/// in flight. The returned vector is in index order; a slot is `None` only if
/// its task panicked. A panic never stops the remaining indices.
pub async fn run_indexed<T, F, Fut>(len: usize, parallelism: usize, task: F) -> Vec<Option<T>>
where
    T: Send + Sync + 'static,
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    if len == 0 {
        return Vec::new();
    }

    if parallelism <= 1 {
        let mut out = Vec::with_capacity(len);
        for idx in 0..len {
            out.push(run_guarded(idx, &task).await);
        }
        return out;
    }

    let workers = parallelism.min(len);
    let supply = Arc::new(IndexSupply::new(len));
    let store = Arc::new(ResultStore::with_len(len));
    let task = Arc::new(task);

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let supply = Arc::clone(&supply);
            let store = Arc::clone(&store);
            let task = Arc::clone(&task);
            tokio::spawn(async move {
                while let Some(idx) = supply.claim() {
                    trace!(worker, idx, "claimed item");
                    if let Some(value) = run_guarded(idx, task.as_ref()).await {
                        store.put(idx, value);
                    }
                }
            })
        })
        .collect();

    for joined in futures::future::join_all(handles).await {
        if let Err(e) = joined {
            error!(error = %e, "batch worker terminated abnormally");
        }
    }

    // All workers have been joined, so this is the only reference left.
    match Arc::try_unwrap(store) {
        Ok(store) => store.into_slots(),
        Err(_) => {
            error!("result store still shared after workers finished");
            (0..len).map(|_| None).collect()
        }
    }
}

/// `task(idx)`, or `None` if it panicked.
async fn run_guarded<T, F, Fut>(idx: usize, task: &F) -> Option<T>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = T>,
{
    match AssertUnwindSafe(async { task(idx).await })
        .catch_unwind()
        .await
    {
        Ok(value) => Some(value),
        Err(_) => {
            error!(idx, "batch task panicked");
            None
        }
    }
}
