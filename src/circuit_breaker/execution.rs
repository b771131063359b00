//! Runs admitted operations as independent tasks.
//!
//! The operation is spawned so it can outlive the caller's wait. Its
//! outcome is recorded from inside the spawned task and only then handed
//! to the caller through a oneshot channel. The oneshot buffers its single
//! value, so the task always finishes even when nobody is listening.

use crate::core::BreakerError;
use crate::operation::Operation;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// How a spawned operation ended.
#[derive(Debug)]
pub(crate) enum Completion<T, E> {
    /// The operation returned.
    Finished(Result<T, E>),
    /// The operation panicked.
    Panicked,
}

impl<T, E> Completion<T, E> {
    /// Returns `true` if the outcome counts as a success.
    pub(crate) fn is_success(&self) -> bool {
        matches!(self, Self::Finished(Ok(_)))
    }
}

/// Spawns `operation` and feeds its outcome to `record` once known.
///
/// `record` runs inside the spawned task before the result is sent, so a
/// caller that receives the result observes metrics that already include it.
pub(crate) fn spawn_operation<O, R>(
    operation: O,
    cancel: CancellationToken,
    record: R,
) -> oneshot::Receiver<Completion<O::Output, O::Error>>
where
    O: Operation,
    R: FnOnce(bool) + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let completion = match AssertUnwindSafe(operation.run(cancel)).catch_unwind().await {
            Ok(result) => Completion::Finished(result),
            Err(_) => Completion::Panicked,
        };

        record(completion.is_success());

        if tx.send(completion).is_err() {
            tracing::trace!("Caller stopped waiting; outcome recorded and dropped");
        }
    });

    rx
}

/// Waits for a spawned operation, giving up when `cancel` fires.
///
/// Cancellation wins when both are ready at the same time.
pub(crate) async fn await_completion<T, E>(
    completion: oneshot::Receiver<Completion<T, E>>,
    cancel: &CancellationToken,
) -> Result<T, BreakerError<E>> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(BreakerError::Cancelled),

        completion = completion => match completion {
            Ok(Completion::Finished(Ok(value))) => Ok(value),
            Ok(Completion::Finished(Err(e))) => Err(BreakerError::Operation(e)),
            // A dropped sender means the task died before sending.
            Ok(Completion::Panicked) | Err(_) => Err(BreakerError::Panicked),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::MockOperation;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counter() -> (Arc<AtomicU64>, Arc<AtomicU64>) {
        let successes = Arc::new(AtomicU64::new(0));
        let failures = Arc::new(AtomicU64::new(0));
        (successes, failures)
    }

    fn recorder(
        successes: &Arc<AtomicU64>,
        failures: &Arc<AtomicU64>,
    ) -> impl FnOnce(bool) + Send + 'static {
        let successes = Arc::clone(successes);
        let failures = Arc::clone(failures);
        move |success| {
            if success {
                successes.fetch_add(1, Ordering::SeqCst);
            } else {
                failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_result_is_delivered_and_recorded() {
        let (successes, failures) = counter();
        let token = CancellationToken::new();

        let rx = spawn_operation(MockOperation::new(), token.clone(), recorder(&successes, &failures));
        let result = await_completion(rx, &token).await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_operation_error_is_passed_through() {
        let (successes, failures) = counter();
        let token = CancellationToken::new();

        let rx = spawn_operation(
            MockOperation::new_failing().with_name("ledger"),
            token.clone(),
            recorder(&successes, &failures),
        );
        let result = await_completion(rx, &token).await;

        match result {
            Err(BreakerError::Operation(e)) => assert!(e.to_string().contains("ledger")),
            other => panic!("expected operation error, got {other:?}"),
        }
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_recorded() {
        let (successes, failures) = counter();
        let token = CancellationToken::new();

        let rx = spawn_operation(
            MockOperation::new_panicking(),
            token.clone(),
            recorder(&successes, &failures),
        );
        let result = await_completion(rx, &token).await;

        assert!(matches!(result, Err(BreakerError::Panicked)));
        assert_eq!(successes.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_wait_still_records() {
        let (successes, failures) = counter();
        let token = CancellationToken::new();
        let op = MockOperation::new().with_latency(Duration::from_secs(5));

        let rx = spawn_operation(op.clone(), token.clone(), recorder(&successes, &failures));
        token.cancel();
        let result = await_completion(rx, &token).await;
        assert!(matches!(result, Err(BreakerError::Cancelled)));
        assert_eq!(successes.load(Ordering::SeqCst), 0);

        // The receiver is gone; the task must still finish and record.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(op.completed_count(), 1);
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }
}
