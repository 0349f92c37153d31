//! Micro-batching of non-urgent lookups.
//!
//! Requests are queued per `(kind, priority)`. The first request in an empty queue
//! arms a timer; the queue flushes when the timer fires or when it reaches the
//! configured size, whichever comes first. A flush groups requests by the provider
//! routing would try first and dispatches the groups under one shared concurrency
//! limit. Every caller gets its own answer, so one failure never fails its
//! batch-mates.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use futures::stream::{self, StreamExt};
use tidewatch_core::{Priority, RawResult, TrackingError, TrackingKind};
use tokio::sync::{Mutex, oneshot};
use tokio::time::Instant;

use crate::core::{Engine, Lookup, Tidewatch, TrackOptions, TrackRequest};

type Reply = oneshot::Sender<Result<Vec<RawResult>, TrackingError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct QueueKey {
    kind: TrackingKind,
    priority: Priority,
}

struct BatchRequest {
    id: u64,
    lookup: Lookup,
    enqueued_at: Instant,
    reply: Reply,
}

#[derive(Default)]
struct Queue {
    requests: Vec<BatchRequest>,
    // Bumped on every flush so a stale timer can tell its batch is gone.
    generation: u64,
}

#[derive(Default)]
pub(crate) struct BatchQueues {
    queues: Mutex<HashMap<QueueKey, Queue>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl BatchQueues {
    /// Requests currently waiting, across every queue.
    pub(crate) async fn pending(&self) -> usize {
        self.queues
            .lock()
            .await
            .values()
            .map(|q| q.requests.len())
            .sum()
    }
}

async fn enqueue(
    engine: &Arc<Engine>,
    lookup: Lookup,
    priority: Priority,
) -> oneshot::Receiver<Result<Vec<RawResult>, TrackingError>> {
    let (tx, rx) = oneshot::channel();
    let key = QueueKey {
        kind: lookup.kind,
        priority,
    };
    let id = engine
        .batches
        .next_id
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let request = BatchRequest {
        id,
        lookup,
        enqueued_at: Instant::now(),
        reply: tx,
    };

    let mut queues = engine.batches.queues.lock().await;
    let queue = queues.entry(key).or_default();
    let first = queue.requests.is_empty();
    queue.requests.push(request);

    if queue.requests.len() >= engine.cfg.batch.batch_size {
        let batch = std::mem::take(&mut queue.requests);
        queue.generation += 1;
        drop(queues);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            kind = key.kind.as_str(),
            priority = ?key.priority,
            size = batch.len(),
            "batch full, flushing"
        );
        tokio::spawn(flush(Arc::clone(engine), batch));
    } else if first {
        let generation = queue.generation;
        drop(queues);
        tokio::spawn(flush_after_timeout(Arc::downgrade(engine), key, generation));
    }
    rx
}

async fn flush_after_timeout(engine: Weak<Engine>, key: QueueKey, generation: u64) {
    let Some(timeout) = engine.upgrade().map(|e| e.cfg.batch.batch_timeout) else {
        return;
    };
    tokio::time::sleep(timeout).await;
    let Some(engine) = engine.upgrade() else {
        return;
    };
    let batch = {
        let mut queues = engine.batches.queues.lock().await;
        let Some(queue) = queues.get_mut(&key) else {
            return;
        };
        if queue.generation != generation || queue.requests.is_empty() {
            return;
        }
        queue.generation += 1;
        std::mem::take(&mut queue.requests)
    };
    #[cfg(feature = "tracing")]
    tracing::debug!(
        kind = key.kind.as_str(),
        priority = ?key.priority,
        size = batch.len(),
        "batch timer fired, flushing"
    );
    flush(engine, batch).await;
}

async fn flush(engine: Arc<Engine>, batch: Vec<BatchRequest>) {
    let mut groups: BTreeMap<Option<String>, Vec<BatchRequest>> = BTreeMap::new();
    for request in batch {
        let top = engine.top_choice(&request.lookup);
        groups.entry(top).or_default().push(request);
    }

    #[cfg(feature = "tracing")]
    for (top, group) in &groups {
        tracing::debug!(
            provider = top.as_deref().unwrap_or("<none>"),
            size = group.len(),
            "dispatching batch group"
        );
    }

    // Groups stay adjacent in dispatch order but share one concurrency limit, so
    // a slow provider only holds the slots its own requests occupy.
    let limit = engine.cfg.batch.max_concurrency.max(1);
    stream::iter(groups.into_values().flatten())
        .map(|request| {
            let engine = Arc::clone(&engine);
            async move {
                let outcome = engine.fetch(&request.lookup).await;
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    id = request.id,
                    waited_ms = u64::try_from(request.enqueued_at.elapsed().as_millis())
                        .unwrap_or(u64::MAX),
                    ok = outcome.is_ok(),
                    "batched lookup complete"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = (request.id, request.enqueued_at);
                // The caller may have given up; nothing to do then.
                let _ = request.reply.send(outcome);
            }
        })
        .buffer_unordered(limit)
        .collect::<Vec<()>>()
        .await;
}

impl Tidewatch {
    /// Look `number` up, batching it with similar lookups unless it is urgent.
    ///
    /// A fresh cache entry answers immediately. `Priority::High` calls the
    /// orchestrator directly; anything else waits in its `(kind, priority)` queue
    /// for at most `batch.batch_timeout`.
    ///
    /// # Errors
    /// Same as [`Tidewatch::fetch_from_multiple_sources`], plus `BatchDropped` if the
    /// queue is torn down before the batch runs.
    pub async fn track_with_optimization(
        &self,
        number: &str,
        kind: Option<TrackingKind>,
        opts: TrackOptions,
    ) -> Result<Vec<RawResult>, TrackingError> {
        let mut lookup = Lookup::from_options(number, kind, opts)?;
        if !lookup.force_fresh {
            if let Some(hit) = self.inner.cache.get(&lookup.cache_key()).await {
                return Ok(hit);
            }
            // Already counted as a miss; the orchestrator must not read again.
            lookup.cache_checked = true;
        }
        if opts.priority == Priority::High {
            return self.inner.fetch(&lookup).await;
        }
        enqueue(&self.inner, lookup, opts.priority)
            .await
            .await
            .unwrap_or(Err(TrackingError::BatchDropped))
    }

    /// Look up several numbers at once, each with an optional declared kind.
    ///
    /// Accepts bare numbers (`"MSCU1234565"`) or [`TrackRequest`]s such as
    /// `("MAEU123456789", TrackingKind::Booking)`. Results are keyed by the number
    /// as passed in. Urgent lookups are fanned out directly with
    /// `batch.max_concurrency` in flight; others go through the batch queues, which
    /// bound concurrency themselves.
    pub async fn track_multiple<I, R>(
        &self,
        requests: I,
        opts: TrackOptions,
    ) -> HashMap<String, Result<Vec<RawResult>, TrackingError>>
    where
        I: IntoIterator<Item = R>,
        R: Into<TrackRequest>,
    {
        let requests: Vec<TrackRequest> = requests.into_iter().map(Into::into).collect();
        let lookups = requests.into_iter().map(|req| async move {
            let res = self
                .track_with_optimization(&req.number, req.kind, opts)
                .await;
            (req.number, res)
        });
        if opts.priority == Priority::High {
            stream::iter(lookups)
                .buffer_unordered(self.inner.cfg.batch.max_concurrency.max(1))
                .collect()
                .await
        } else {
            futures::future::join_all(lookups).await.into_iter().collect()
        }
    }

    /// Lookups waiting in batch queues.
    pub async fn pending_batched(&self) -> usize {
        self.inner.batches.pending().await
    }
}
