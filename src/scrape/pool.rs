// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded worker pool for scrape jobs
//!
//! Jobs go through a bounded channel; a full queue rejects new work with
//! [`ScrapeError::PoolSaturated`] instead of buffering without limit.
//! The pool starts `min_workers` tasks, grows to `max_workers` while jobs
//! are waiting, and retires surplus workers after `idle_timeout`.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use super::config::PoolConfig;
use super::pipeline::Pipeline;
use super::types::{ScrapeError, ScrapeResult};

type JobReply = oneshot::Sender<Result<ScrapeResult, ScrapeError>>;

struct Job {
    url: Url,
    reply: JobReply,
}

/// Pool statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub workers: usize,
    pub busy: usize,
    pub queued: usize,
    pub max_workers: usize,
    pub max_queue_size: usize,
}

struct Shared {
    receiver: tokio::sync::Mutex<mpsc::Receiver<Job>>,
    pipeline: Arc<Pipeline>,
    live: AtomicUsize,
    busy: AtomicUsize,
    queued: AtomicUsize,
    min_workers: usize,
    max_workers: usize,
    idle_timeout: Duration,
}

pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Create the pool and start `min_workers` workers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: PoolConfig, pipeline: Arc<Pipeline>) -> Self {
        let (sender, receiver) = mpsc::channel(config.max_queue_size.max(1));
        let shared = Arc::new(Shared {
            receiver: tokio::sync::Mutex::new(receiver),
            pipeline,
            live: AtomicUsize::new(0),
            busy: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            min_workers: config.min_workers,
            max_workers: config.max_workers.max(1),
            idle_timeout: config.idle_timeout().max(Duration::from_millis(10)),
        });

        let pool = Self {
            sender: Mutex::new(Some(sender)),
            shared,
            handles: Mutex::new(Vec::new()),
            config,
        };
        for _ in 0..pool.shared.min_workers {
            pool.try_grow();
        }
        info!(
            "Scrape worker pool started ({}-{} workers, queue {})",
            pool.config.min_workers, pool.config.max_workers, pool.config.max_queue_size
        );
        pool
    }

    /// Queue a scrape without waiting for it
    ///
    /// Fails immediately with `PoolSaturated` when the queue is full.
    pub fn enqueue(
        &self,
        url: Url,
    ) -> Result<oneshot::Receiver<Result<ScrapeResult, ScrapeError>>, ScrapeError> {
        let (reply, receiver) = oneshot::channel();
        {
            let guard = self.sender.lock().map_err(|_| ScrapeError::PoolClosed)?;
            let sender = guard.as_ref().ok_or(ScrapeError::PoolClosed)?;

            self.shared.queued.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = sender.try_send(Job { url, reply }) {
                self.shared.queued.fetch_sub(1, Ordering::SeqCst);
                return Err(match e {
                    mpsc::error::TrySendError::Full(job) => {
                        warn!("Scrape queue full, rejecting {}", job.url);
                        ScrapeError::PoolSaturated {
                            queue_depth: self.config.max_queue_size,
                        }
                    }
                    mpsc::error::TrySendError::Closed(_) => ScrapeError::PoolClosed,
                });
            }
        }

        let idle = self
            .shared
            .live
            .load(Ordering::SeqCst)
            .saturating_sub(self.shared.busy.load(Ordering::SeqCst));
        if self.shared.queued.load(Ordering::SeqCst) > idle {
            self.try_grow();
        }
        Ok(receiver)
    }

    /// Queue a scrape and wait for its result, bounded by the job timeout
    pub async fn submit(&self, url: Url) -> Result<ScrapeResult, ScrapeError> {
        let receiver = self.enqueue(url)?;
        match tokio::time::timeout(self.config.job_timeout(), receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) if self.is_closed() => Err(ScrapeError::PoolClosed),
            Ok(Err(_)) => Err(ScrapeError::Worker("worker dropped the job".to_string())),
            Err(_) => Err(ScrapeError::Timeout {
                timeout_ms: self.config.job_timeout_ms,
            }),
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.shared.live.load(Ordering::SeqCst),
            busy: self.shared.busy.load(Ordering::SeqCst),
            queued: self.shared.queued.load(Ordering::SeqCst),
            max_workers: self.shared.max_workers,
            max_queue_size: self.config.max_queue_size,
        }
    }

    /// Stop accepting work and drain the queue
    ///
    /// In-flight and queued jobs get `grace` to finish; anything still
    /// running after that is aborted.
    pub async fn shutdown(&self, grace: Duration) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let handles: Vec<JoinHandle<()>> = match self.handles.lock() {
            Ok(mut handles) => handles.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!(
                "Worker pool did not drain within {:?}, aborting remaining work",
                grace
            );
            for abort in aborts {
                abort.abort();
            }
            self.shared.live.store(0, Ordering::SeqCst);
            self.shared.busy.store(0, Ordering::SeqCst);
        } else {
            info!("Worker pool drained");
        }
    }

    fn is_closed(&self) -> bool {
        self.sender.lock().map(|s| s.is_none()).unwrap_or(true)
    }

    fn try_grow(&self) {
        let max = self.shared.max_workers;
        let grown = self
            .shared
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok();
        if !grown {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(worker_loop(shared));
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
        debug!("Worker pool grew to {} workers", self.shared.live.load(Ordering::SeqCst));
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        let next = {
            let mut receiver = shared.receiver.lock().await;
            tokio::time::timeout(shared.idle_timeout, receiver.recv()).await
        };

        let job = match next {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => {
                if retire(&shared) {
                    debug!("Idle worker retired");
                    return;
                }
                continue;
            }
        };

        shared.queued.fetch_sub(1, Ordering::SeqCst);
        shared.busy.fetch_add(1, Ordering::SeqCst);
        run_job(&shared, job).await;
        shared.busy.fetch_sub(1, Ordering::SeqCst);
    }
    shared.live.fetch_sub(1, Ordering::SeqCst);
}

/// Leave the pool if above the minimum and nothing is waiting
fn retire(shared: &Shared) -> bool {
    let min = shared.min_workers;
    let retired = shared
        .live
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            (n > min && shared.queued.load(Ordering::SeqCst) == 0).then(|| n - 1)
        })
        .is_ok();
    if !retired {
        return false;
    }

    // A job may have arrived between the check and the decrement.
    if shared.queued.load(Ordering::SeqCst) > 0 {
        let max = shared.max_workers;
        let rejoined = shared
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok();
        return !rejoined;
    }
    true
}

async fn run_job(shared: &Shared, mut job: Job) {
    if job.reply.is_closed() {
        debug!("Skipping {}: caller went away", job.url);
        return;
    }

    let run = AssertUnwindSafe(shared.pipeline.run(&job.url)).catch_unwind();
    let result = tokio::select! {
        outcome = run => match outcome {
            Ok(result) => result,
            Err(_) => {
                error!("Scrape of {} panicked", job.url);
                Err(ScrapeError::Worker("scrape task panicked".to_string()))
            }
        },
        _ = job.reply.closed() => {
            debug!("Caller for {} went away, cancelling", job.url);
            return;
        }
    };

    let _ = job.reply.send(result);
}
