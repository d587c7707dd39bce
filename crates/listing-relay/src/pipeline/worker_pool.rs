//! Bounded fan-out of independent jobs across tokio tasks.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;

/// Runs jobs as separate tasks with at most `size` in flight.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum number of jobs in flight.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawn one task per item and wait for all of them.
    ///
    /// Outputs are in item order whatever the completion order. A job that
    /// panics is logged and contributes no output; it never takes the other
    /// jobs down with it.
    pub async fn run_all<I, F, Fut>(&self, items: Vec<I>, job: F) -> Vec<Fut::Output>
    where
        F: Fn(I) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = Arc::clone(&self.semaphore);
                let work = job(item);
                tokio::spawn(async move {
                    // The semaphore is never closed, so a permit always arrives.
                    let _permit = semaphore.acquire_owned().await.ok();
                    work.await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(output) => Some(output),
                Err(e) => {
                    error!("worker task failed: {e}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(3);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outputs = pool
            .run_all((0..20).collect(), |i: usize| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    i * 2
                }
            })
            .await;

        assert_eq!(outputs.len(), 20);
        assert_eq!(outputs[19], 38);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let pool = WorkerPool::new(2);
        let outputs = pool
            .run_all(vec![1, 2, 3], |i: i32| async move {
                if i == 2 {
                    panic!("boom");
                }
                i
            })
            .await;
        assert_eq!(outputs, vec![1, 3]);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
