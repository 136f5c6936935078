//! # Worker Pool
//!
//! Bounded fan-out for one batch of independent tasks. The whole batch is
//! queued on a channel sized to the batch, the sender is dropped, and at most
//! `size` workers drain it. [`WorkerPool::run`] returns once every worker has
//! exited, so no task outlives the call.

use std::future::Future;
use std::sync::Arc;

use metrics::gauge;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `handler` over every task with at most `size` calls in flight.
    ///
    /// Results come back in completion order. A panicking handler loses the
    /// results of the worker it ran on; the other workers keep draining.
    pub async fn run<T, R, F, Fut>(&self, tasks: Vec<T>, handler: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if tasks.is_empty() {
            return Vec::new();
        }

        let total = tasks.len();
        let (sender, receiver) = mpsc::channel(total);
        for task in tasks {
            if sender.send(task).await.is_err() {
                break;
            }
        }
        drop(sender);

        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);
        let worker_count = self.size.min(total);

        let mut workers = JoinSet::new();
        for worker in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            let handler = Arc::clone(&handler);
            workers.spawn(async move {
                let mut results = Vec::new();
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(task) = next else {
                        break;
                    };

                    gauge!("ark_workers_busy").increment(1.0);
                    let _busy = scopeguard::guard((), |_| {
                        gauge!("ark_workers_busy").decrement(1.0);
                    });
                    results.push(handler(task).await);
                }
                debug!(worker, processed = results.len(), "worker drained");
                results
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(batch) => results.extend(batch),
                Err(err) => error!(error = ?err, "worker task panicked or was aborted"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn runs_every_task_once() {
        let pool = WorkerPool::new(3);
        let mut results = pool
            .run((0..10).collect(), |n: u32| async move { n * 2 })
            .await;
        results.sort_unstable();
        assert_eq!(results, (0..10).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_pool_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2);

        let results = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            pool.run((0..8).collect::<Vec<u32>>(), move |_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await
        };

        assert_eq!(results.len(), 8);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let results: Vec<()> = WorkerPool::new(4).run(Vec::<u8>::new(), |_| async {}).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn panicking_task_does_not_stall_the_batch() {
        let pool = WorkerPool::new(2);
        let results = pool
            .run(vec![1u32, 2, 3, 4], |n| async move {
                if n == 1 {
                    panic!("boom");
                }
                n
            })
            .await;
        assert!(results.len() >= 2);
        assert!(!results.contains(&1));
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
