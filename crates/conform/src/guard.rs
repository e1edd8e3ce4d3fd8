use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Why a guarded future did not run to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    Cancelled,
    TimedOut(Duration),
}

/// Run `fut` until it completes, the token is cancelled, or the optional timeout elapses.
///
/// Cancellation is checked first so an already-cancelled token never starts the work.
pub(crate) async fn guard<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<F::Output, Interrupted> {
    if cancel.is_cancelled() {
        return Err(Interrupted::Cancelled);
    }
    let bounded = async {
        match timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| Interrupted::TimedOut(after)),
            None => Ok(fut.await),
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        result = bounded => result,
    }
}
