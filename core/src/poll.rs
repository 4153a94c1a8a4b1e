//! Execution polling
//!
//! The orchestration server pushes nothing; completion is observed by
//! re-fetching job status until a terminal state or a deadline. The
//! loop runs inside the calling task and races its sleep against a
//! cancellation token, so a dropped request or a server shutdown
//! releases the timer instead of leaking it.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::job::JobDescriptor;

/// Default deadline for one polling session
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);
/// Default delay between status fetches
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Source of fresh job status, the seam between the poll loop and the
/// client (and between the poll loop and its tests)
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn fetch(&self) -> Result<JobDescriptor>;

    /// Remote job id, used in timeout errors
    fn job_id(&self) -> i64;
}

/// Poll until the job reaches a terminal status.
///
/// Returns the terminal descriptor, [`Error::PollTimeout`] when the
/// deadline passes without one (distinct from a network timeout), or
/// [`Error::PollCancelled`] when the token fires mid-wait. Fetch errors
/// propagate immediately; the caller decides whether to retry.
pub async fn poll_until_complete(
    source: &dyn JobStatusSource,
    max_wait: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<JobDescriptor> {
    let started = Instant::now();

    while started.elapsed() < max_wait {
        if cancel.is_cancelled() {
            return Err(Error::PollCancelled);
        }

        let descriptor = source.fetch().await?;
        if descriptor.is_terminal() {
            return Ok(descriptor);
        }

        debug!(
            job_id = source.job_id(),
            status = %descriptor.status,
            "Job not terminal yet, waiting"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::PollCancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Err(Error::PollTimeout {
        job_id: source.job_id(),
        max_wait_seconds: max_wait.as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedSource {
        statuses: Vec<JobStatus>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(statuses: &[JobStatus]) -> Self {
            Self {
                statuses: statuses.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        fn descriptor(status: JobStatus) -> JobDescriptor {
            JobDescriptor {
                id: 7,
                status,
                name: None,
                created: None,
                started: None,
                finished: None,
                elapsed: None,
                job_explanation: None,
                artifacts: None,
                extra: serde_json::Map::new(),
            }
        }
    }

    #[async_trait]
    impl JobStatusSource for ScriptedSource {
        async fn fetch(&self) -> Result<JobDescriptor> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self
                .statuses
                .get(call)
                .copied()
                .unwrap_or(*self.statuses.last().unwrap());
            Ok(Self::descriptor(status))
        }

        fn job_id(&self) -> i64 {
            7
        }
    }

    #[tokio::test]
    async fn returns_on_the_first_terminal_poll_and_stops() {
        let source = ScriptedSource::new(&[
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Successful,
        ]);
        let cancel = CancellationToken::new();

        let descriptor = poll_until_complete(
            &source,
            Duration::from_secs(5),
            Duration::from_millis(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(descriptor.status, JobStatus::Successful);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn deadline_exceeded_is_a_poll_timeout() {
        let source = ScriptedSource::new(&[JobStatus::Running]);
        let cancel = CancellationToken::new();

        let err = poll_until_complete(
            &source,
            Duration::from_millis(20),
            Duration::from_millis(5),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { job_id: 7, .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_wait() {
        let source = ScriptedSource::new(&[JobStatus::Running]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poll_until_complete(
            &source,
            Duration::from_secs(5),
            Duration::from_secs(5),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollCancelled));
    }

    #[tokio::test]
    async fn failed_jobs_are_terminal_too() {
        let source = ScriptedSource::new(&[JobStatus::Pending, JobStatus::Failed]);
        let cancel = CancellationToken::new();

        let descriptor = poll_until_complete(
            &source,
            Duration::from_secs(5),
            Duration::from_millis(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(descriptor.status, JobStatus::Failed);
    }
}
