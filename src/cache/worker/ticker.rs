//! Periodic background task with an explicit stop handle

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cache::traits::CacheOperationError;

/// A tokio task that runs a job every `period` until stopped
///
/// Stopping signals the loop and returns immediately; a job already running finishes
/// on its own. Dropping the ticker stops it.
#[derive(Debug)]
pub struct Ticker {
    name: &'static str,
    stopped: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn on the current tokio runtime; the first run happens after one period
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        mut job: F,
    ) -> Result<Self, CacheOperationError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CacheOperationError::configuration_error(format!(
                "ticker '{}' needs a tokio runtime",
                name
            ))
        })?;

        let stopped = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let (task_stopped, task_wake) = (stopped.clone(), wake.clone());

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = task_wake.notified() => {}
                }
                if task_stopped.load(Ordering::Acquire) {
                    break;
                }
                // the job reports false once its owner is gone
                if !job().await {
                    break;
                }
            }
            log::debug!("Ticker '{}' stopped", name);
        });

        log::debug!("Ticker '{}' started with period {:?}", name, period);
        Ok(Self {
            name,
            stopped,
            wake,
            handle,
        })
    }

    /// Signal the loop to exit without waiting for it
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.wake.notify_one();
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the loop is still alive
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let ticker = Ticker::spawn("test", Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        ticker.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!ticker.is_running());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_can_end_loop() {
        let ticker = Ticker::spawn("once", Duration::from_millis(5), || async { false }).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!ticker.is_running());
    }

    #[test]
    fn test_requires_runtime() {
        let result = Ticker::spawn("orphan", Duration::from_secs(1), || async { true });
        assert!(result.is_err());
    }
}
