//! Bridging legacy begin/end calls into awaitable operations.
//!
//! The external SDK starts work with a begin function that accepts a
//! completion callback and hands back a cancel-capable handle; a separate
//! end function later extracts the real result from that handle.
//! [`run_cancelable`] folds one such pair into a single awaitable
//! [`OperationOutcome`], resolved exactly once by whichever of normal
//! completion, cancellation, or start-time failure happens first.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use corral_core::error::{Error, OperationError, Result};

/// Cancel-capable handle returned by a legacy begin call.
pub trait CancelableHandle: Send + Sync + 'static {
    /// Ask the underlying operation to stop.
    ///
    /// Advisory only: the operation still finishes through its completion
    /// callback, which consults [`is_canceled`](Self::is_canceled).
    fn cancel(&self);

    /// Whether the underlying operation observed the cancellation.
    fn is_canceled(&self) -> bool;
}

/// Completion callback handed to a begin function.
///
/// The legacy system invokes it at most once, with the operation's handle,
/// when the work finishes. It may be invoked synchronously from inside the
/// begin call or later from another thread.
pub type CompletionCallback<H> = Box<dyn FnOnce(Arc<H>) + Send>;

/// Terminal outcome of a bridged operation.
///
/// Exactly one of the three variants resolves a given operation; a late
/// second resolution attempt is a no-op.
#[derive(Debug)]
pub enum OperationOutcome<T> {
    /// The end function produced a result
    Completed(T),

    /// The begin or end function reported an error
    Failed(Error),

    /// The operation was canceled before it completed
    Canceled,
}

impl<T> OperationOutcome<T> {
    /// Whether this is the canceled outcome.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Fold the outcome into a result, mapping cancellation to
    /// [`OperationError::Canceled`].
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Failed(error) => Err(error),
            Self::Canceled => Err(OperationError::Canceled.into()),
        }
    }
}

/// Single-assignment completion slot. The first resolution wins; later
/// resolutions find the sender gone and do nothing.
struct CompletionSlot<T> {
    sender: Mutex<Option<oneshot::Sender<OperationOutcome<T>>>>,
}

impl<T> CompletionSlot<T> {
    fn new() -> (Arc<Self>, oneshot::Receiver<OperationOutcome<T>>) {
        let (sender, receiver) = oneshot::channel();

        (
            Arc::new(Self {
                sender: Mutex::new(Some(sender)),
            }),
            receiver,
        )
    }

    fn resolve(&self, outcome: OperationOutcome<T>) {
        if let Some(sender) = self.sender.lock().take() {
            // A send failure means the caller stopped awaiting; the outcome
            // is dropped either way.
            let _ = sender.send(outcome);
        }
    }
}

/// Run a begin/end pair that nothing will cancel.
///
/// Equivalent to [`run_cancelable`] with a token that never fires.
pub async fn run<B, E, H, T>(begin: B, end: E) -> OperationOutcome<T>
where
    B: FnOnce(CompletionCallback<H>) -> Result<Arc<H>>,
    E: FnOnce(&H) -> Result<T> + Send + 'static,
    H: CancelableHandle,
    T: Send + 'static,
{
    run_cancelable(begin, end, CancellationToken::new()).await
}

/// Bridge a legacy begin/end pair into one awaitable outcome.
///
/// `begin` is called with a completion callback and must hand back the
/// operation's cancel-capable handle. When the legacy system invokes the
/// callback, a handle that observed cancellation resolves the operation as
/// [`OperationOutcome::Canceled`]; otherwise `end` extracts the result and
/// the operation resolves [`OperationOutcome::Completed`] or
/// [`OperationOutcome::Failed`]. A `begin` error resolves the operation
/// failed immediately and `end` is never called.
///
/// A fired `cancel` token forwards `cancel()` to the handle once;
/// resolution still arrives through the callback, so a natural completion
/// that beats the cancellation keeps its result. Extra begin-arguments of
/// the legacy signature are closure captures here.
///
/// A callback the legacy system drops without invoking resolves the
/// operation as failed with [`OperationError::NeverCompleted`] rather than
/// pending forever.
pub async fn run_cancelable<B, E, H, T>(
    begin: B,
    end: E,
    cancel: CancellationToken,
) -> OperationOutcome<T>
where
    B: FnOnce(CompletionCallback<H>) -> Result<Arc<H>>,
    E: FnOnce(&H) -> Result<T> + Send + 'static,
    H: CancelableHandle,
    T: Send + 'static,
{
    let (slot, mut receiver) = CompletionSlot::new();

    let callback: CompletionCallback<H> = {
        let slot = Arc::clone(&slot);
        Box::new(move |handle: Arc<H>| {
            if handle.is_canceled() {
                trace!("handle reports canceled, resolving as canceled");
                slot.resolve(OperationOutcome::Canceled);
                return;
            }

            match end(&handle) {
                Ok(value) => slot.resolve(OperationOutcome::Completed(value)),
                Err(error) => slot.resolve(OperationOutcome::Failed(error)),
            }
        })
    };

    let handle = match begin(callback) {
        Ok(handle) => Some(handle),
        Err(error) => {
            debug!("begin function failed to start the operation");
            slot.resolve(OperationOutcome::Failed(error));
            None
        }
    };

    // From here the callback holds the only strong reference to the slot:
    // if the legacy system drops it unresolved, the receiver wakes with an
    // error instead of pending forever.
    drop(slot);

    if let Some(handle) = handle {
        tokio::select! {
            outcome = &mut receiver => {
                return outcome.unwrap_or_else(|_| abandoned());
            }
            _ = cancel.cancelled() => {
                debug!("cancellation requested, forwarding to the handle");
                handle.cancel();
            }
        }
    }

    receiver.await.unwrap_or_else(|_| abandoned())
}

fn abandoned<T>() -> OperationOutcome<T> {
    OperationOutcome::Failed(OperationError::NeverCompleted.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct TestHandle {
        canceled: AtomicBool,
        cancel_calls: AtomicUsize,
    }

    impl CancelableHandle for TestHandle {
        fn cancel(&self) {
            self.canceled.store(true, Ordering::SeqCst);
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn is_canceled(&self) -> bool {
            self.canceled.load(Ordering::SeqCst)
        }
    }

    type Stash = Arc<Mutex<Option<CompletionCallback<TestHandle>>>>;

    #[tokio::test]
    async fn test_synchronous_completion_resolves_with_result() {
        let outcome = run(
            |callback| {
                let handle = Arc::new(TestHandle::default());
                callback(Arc::clone(&handle));
                Ok(handle)
            },
            |_handle| Ok(42),
        )
        .await;

        assert!(matches!(outcome, OperationOutcome::Completed(42)));
    }

    #[tokio::test]
    async fn test_begin_error_fails_without_calling_end() {
        let end_called = Arc::new(AtomicBool::new(false));
        let end_flag = Arc::clone(&end_called);

        let outcome = run::<_, _, TestHandle, i32>(
            |_callback| {
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "no route").into())
            },
            move |_handle| {
                end_flag.store(true, Ordering::SeqCst);
                Ok(0)
            },
        )
        .await;

        assert!(matches!(outcome, OperationOutcome::Failed(Error::Io(_))));
        assert!(!end_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_end_error_fails_the_operation() {
        let outcome = run::<_, _, TestHandle, i32>(
            |callback| {
                let handle = Arc::new(TestHandle::default());
                callback(Arc::clone(&handle));
                Ok(handle)
            },
            |_handle| {
                Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "query timed out").into())
            },
        )
        .await;

        assert!(matches!(outcome, OperationOutcome::Failed(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_cancellation_flows_through_the_callback() {
        let stash: Stash = Arc::new(Mutex::new(None));
        let handle = Arc::new(TestHandle::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let task = tokio::spawn(run_cancelable(
            {
                let stash = Arc::clone(&stash);
                let handle = Arc::clone(&handle);
                move |callback| {
                    *stash.lock() = Some(callback);
                    Ok(handle)
                }
            },
            |_handle| Ok(0),
            cancel,
        ));

        // Give the bridge time to observe the token and forward the cancel.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.cancel_calls.load(Ordering::SeqCst), 1);

        // The legacy system now completes; the handle reports canceled.
        let callback = stash.lock().take().unwrap();
        callback(Arc::clone(&handle));

        let outcome = task.await.unwrap();
        assert!(outcome.is_canceled());
    }

    #[tokio::test]
    async fn test_completion_beats_late_cancellation() {
        let cancel = CancellationToken::new();

        let outcome = run_cancelable(
            |callback| {
                let handle = Arc::new(TestHandle::default());
                callback(Arc::clone(&handle));
                Ok(handle)
            },
            |_handle| Ok("done"),
            cancel.clone(),
        )
        .await;

        // The operation already completed; canceling now changes nothing.
        cancel.cancel();
        assert!(matches!(outcome, OperationOutcome::Completed("done")));
    }

    #[tokio::test]
    async fn test_first_resolution_wins() {
        let stash: Stash = Arc::new(Mutex::new(None));
        let handle = Arc::new(TestHandle::default());

        // The begin function stashes the callback and then fails, which
        // resolves the operation immediately.
        let outcome = run::<_, _, TestHandle, i32>(
            {
                let stash = Arc::clone(&stash);
                move |callback| {
                    *stash.lock() = Some(callback);
                    let error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "lost session");
                    Err(error.into())
                }
            },
            |_handle| Ok(7),
        )
        .await;

        assert!(matches!(outcome, OperationOutcome::Failed(_)));

        // A late callback invocation is a no-op against the settled slot.
        let callback = stash.lock().take().unwrap();
        callback(Arc::clone(&handle));
    }

    #[tokio::test]
    async fn test_dropped_callback_resolves_never_completed() {
        let outcome = run::<_, _, TestHandle, i32>(
            |callback| {
                drop(callback);
                Ok(Arc::new(TestHandle::default()))
            },
            |_handle| Ok(0),
        )
        .await;

        match outcome {
            OperationOutcome::Failed(Error::Operation(OperationError::NeverCompleted)) => {}
            other => panic!("expected NeverCompleted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_into_result_maps_cancellation() {
        let outcome: OperationOutcome<i32> = OperationOutcome::Canceled;
        assert!(outcome.is_canceled());

        let error = outcome.into_result().unwrap_err();
        assert!(matches!(
            error,
            Error::Operation(OperationError::Canceled)
        ));

        let outcome = OperationOutcome::Completed(5);
        assert_eq!(outcome.into_result().unwrap(), 5);
    }
}
