//! Tools that we could imagine being in the Rust standard library, but aren't.

use std::sync::PoisonError;

use futures_channel::oneshot;

#[doc(inline)]
pub use cubefill_base::util::*;

/// Error from [`spawn_background()`] when the executor dropped the work without
/// running it to completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("background work was dropped before completing")]
#[non_exhaustive]
pub struct BackgroundUnavailable;

/// Runs `f` using the executor's background facility, and returns its result to the
/// awaiting task.
///
/// If the executor fails to run `f` (declines to spawn it, or the work panics), the
/// returned future resolves to [`BackgroundUnavailable`] rather than waiting forever.
pub async fn spawn_background<F, R>(
    executor: &dyn Executor,
    f: F,
) -> Result<R, BackgroundUnavailable>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    executor.spawn_background(Box::new(move || {
        // A send error means the caller stopped waiting, which needs no handling here.
        let _ = sender.send(f());
    }));
    receiver.await.map_err(|oneshot::Canceled| BackgroundUnavailable)
}

/// Use this for locks whose protected state is replaced or appended to as a whole,
/// so that a panic while the lock was held cannot leave it half-updated.
pub(crate) fn ignore_poison<T>(result: Result<T, PoisonError<T>>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InlineExecutor;

    #[tokio::test]
    async fn spawn_background_returns_value() {
        let value = spawn_background(&ThreadExecutor::new(), || 6 * 7).await;
        assert_eq!(value, Ok(42));
    }

    #[tokio::test]
    async fn spawn_background_reports_dropped_work() {
        let executor = InlineExecutor::refusing();
        let value = spawn_background(&executor, || 1).await;
        assert_eq!(value, Err(BackgroundUnavailable));
    }
}
