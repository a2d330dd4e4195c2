//! services/api/src/web/jobs.rs
//!
//! A lightweight in-process executor for generation jobs.
//!
//! The request layer hands each job here and keeps no reference to it. The
//! registry keys the running task and its cancellation token by generation id,
//! logs completion, and deregisters the entry when the task finishes, so an
//! operator (or a test) can ask what is in flight and abort a runaway job.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct JobHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Tracks every in-flight generation task.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<i32, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a generation job, handing it a fresh cancellation token.
    ///
    /// The completion hook removes the registry entry and logs the outcome;
    /// callers get nothing back (fire and forget).
    pub fn spawn<F, Fut>(self: Arc<Self>, generation_id: i32, job: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let fut = job(token.clone());

        // The lock is held across spawn + insert so the completion hook's
        // `remove` cannot run before the entry exists: a job that finishes
        // instantly blocks on this same lock until the insert lands.
        let registry = Arc::clone(&self);
        let mut jobs = self.jobs.lock().expect("job registry poisoned");
        let handle = tokio::spawn(async move {
            fut.await;
            registry.jobs.lock().expect("job registry poisoned").remove(&generation_id);
            info!("Generation job {} finished", generation_id);
        });

        if jobs
            .insert(generation_id, JobHandle { token, handle })
            .is_some()
        {
            // Two jobs for one generation id would race on the same record.
            warn!("Replaced an existing job entry for generation {}", generation_id);
        }
    }

    /// Requests cancellation of a running job. Returns whether a job was found.
    /// The task itself decides when to stop (at its next suspension point).
    pub fn cancel(&self, generation_id: i32) -> bool {
        let jobs = self.jobs.lock().expect("job registry poisoned");
        match jobs.get(&generation_id) {
            Some(job) => {
                job.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, generation_id: i32) -> bool {
        let jobs = self.jobs.lock().expect("job registry poisoned");
        jobs.get(&generation_id)
            .map(|job| !job.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn running_count(&self) -> usize {
        self.jobs.lock().expect("job registry poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completed_jobs_are_deregistered() {
        let registry = Arc::new(JobRegistry::new());

        registry.clone().spawn(1, |_token| async {});

        // The completion hook runs on the spawned task; give it a moment.
        for _ in 0..50 {
            if registry.running_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(registry.running_count(), 0);
        assert!(!registry.is_running(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn instantly_finishing_jobs_leave_no_stale_entries() {
        let registry = Arc::new(JobRegistry::new());

        // Jobs that are ready immediately race their completion hook against
        // the registration; every entry must still end up removed.
        for id in 0..500 {
            registry.clone().spawn(id, |_token| async {});
        }

        for _ in 0..200 {
            if registry.running_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.running_count(), 0);
        assert!(!registry.cancel(0));
    }

    #[tokio::test]
    async fn cancel_reaches_the_job_token() {
        let registry = Arc::new(JobRegistry::new());
        let (tx, rx) = tokio::sync::oneshot::channel();

        registry.clone().spawn(7, |token| async move {
            token.cancelled().await;
            let _ = tx.send(());
        });

        assert!(registry.cancel(7));
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("job did not observe cancellation")
            .unwrap();
        assert!(!registry.cancel(99));
    }
}
