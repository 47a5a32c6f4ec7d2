//! Scheduling hooks and small formatting helpers.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::error::Error;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::future::BoxFuture;

// -------------------------------------------------------------------------------------------------

/// How fill work gets scheduled by the host.
///
/// Pricing is handed to [`spawn_background()`](Executor::spawn_background) so that it does
/// not stall the context which owns the world. Block placement stays on that context but
/// awaits [`yield_now()`](Executor::yield_now) between chunks.
pub trait Executor: fmt::Debug + Send + Sync {
    /// Runs `work` somewhere other than the calling context.
    ///
    /// An executor which cannot run `work` must drop it unrun rather than hold on to it;
    /// the caller finds out because `work` never reports back.
    fn spawn_background(&self, work: Box<dyn FnOnce() + Send + 'static>);

    /// Returns a future which lets other tasks on the current context run before it
    /// completes.
    fn yield_now(&self) -> BoxFuture<'static, ()>;
}

#[allow(clippy::missing_inline_in_public_items)]
impl<E: ?Sized + Executor> Executor for &E {
    fn spawn_background(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        E::spawn_background(self, work)
    }
    fn yield_now(&self) -> BoxFuture<'static, ()> {
        E::yield_now(self)
    }
}

#[allow(clippy::missing_inline_in_public_items)]
impl<E: ?Sized + Executor> Executor for Arc<E> {
    fn spawn_background(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        E::spawn_background(self, work)
    }
    fn yield_now(&self) -> BoxFuture<'static, ()> {
        E::yield_now(self)
    }
}

/// [`Executor`] for hosts without a runtime of their own: every piece of background work
/// gets a fresh thread, and yielding is a single [`YieldNow`].
#[cfg(feature = "std")]
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct ThreadExecutor;

#[cfg(feature = "std")]
impl ThreadExecutor {
    #[allow(missing_docs)]
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "std")]
#[allow(clippy::missing_inline_in_public_items)]
impl Executor for ThreadExecutor {
    fn spawn_background(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        let spawned = std::thread::Builder::new()
            .name("cubefill-worker".into())
            .spawn(work);
        // On failure the closure is dropped, which the caller observes.
        if let Err(e) = spawned {
            log::warn!("could not start background thread: {e}");
        }
    }

    fn yield_now(&self) -> BoxFuture<'static, ()> {
        Box::pin(YieldNow::default())
    }
}

/// Future which is pending on its first poll and ready on every later one.
///
/// It wakes itself before returning [`Poll::Pending`], so an executor will come back to it
/// after running whatever else is ready.
#[derive(Clone, Debug, Default)]
#[must_use = "futures do nothing unless polled"]
pub struct YieldNow {
    polled: bool,
}

impl Future for YieldNow {
    type Output = ();

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if core::mem::replace(&mut self.polled, true) {
            return Poll::Ready(());
        }
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

// -------------------------------------------------------------------------------------------------

/// Displays an error followed by each of its [`sources`](Error::source), one per
/// paragraph, for log messages.
#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
#[expect(clippy::exhaustive_structs)]
pub struct ErrorChain<'a>(pub &'a (dyn Error + 'a));

impl fmt::Display for ErrorChain<'_> {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0, f)?;
        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, "\n\nCaused by:\n    {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString as _;
    use pretty_assertions::assert_eq;

    #[derive(Debug, displaydoc::Display)]
    /// world rejected the write
    struct Rejected(Unloaded);
    #[derive(Debug, displaydoc::Display)]
    /// chunk is not loaded
    struct Unloaded;
    impl Error for Rejected {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }
    impl Error for Unloaded {}

    #[test]
    fn error_chain_lists_sources() {
        assert_eq!(ErrorChain(&Unloaded).to_string(), "chunk is not loaded");
        assert_eq!(
            ErrorChain(&Rejected(Unloaded)).to_string(),
            "world rejected the write\n\nCaused by:\n    chunk is not loaded"
        );
    }

    #[test]
    fn yield_now_is_pending_once() {
        let mut future = YieldNow::default();
        let mut cx = Context::from_waker(futures_util::task::noop_waker_ref());
        assert_eq!(Pin::new(&mut future).poll(&mut cx), Poll::Pending);
        assert_eq!(Pin::new(&mut future).poll(&mut cx), Poll::Ready(()));
        assert_eq!(Pin::new(&mut future).poll(&mut cx), Poll::Ready(()));
    }

    #[tokio::test]
    async fn yield_now_completes_under_runtime() {
        YieldNow::default().await;
    }
}
