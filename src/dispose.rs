//! Disposable responses: a response bundled with its required release action.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::body::Guard;
use crate::error::Result;
use crate::message::Response;

/// The release half of a [`DisposableResponse`].
///
/// Firing the guard and running the async release action are split: the guard
/// is set synchronously (so concurrent body reads fail from that instant),
/// then the action returns the connection to its pool or closes it. If a
/// `Release` is dropped without being run (a `streaming` caller abandoning
/// the stream), `Drop` fires the guard immediately and spawns the pending
/// action on the current runtime, so the connection is still released exactly
/// once. Outside a runtime only the guard fires.
pub struct Release {
    guard: Guard,
    action: Option<BoxFuture<'static, Result<()>>>,
}

impl Release {
    /// Pair a guard with an async release action.
    pub fn new<F>(guard: Guard, action: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            guard,
            action: Some(Box::pin(action)),
        }
    }

    /// A release that only fires the guard, for dispatchers with no pooled
    /// connection behind the response.
    pub fn flag_only(guard: Guard) -> Self {
        Self {
            guard,
            action: None,
        }
    }

    /// Fire the guard, then run the release action.
    pub async fn release(mut self) -> Result<()> {
        self.guard.set();
        match self.action.take() {
            Some(action) => action.await,
            None => Ok(()),
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.guard.set();
        if let Some(action) = self.action.take() {
            // Abandoned without an explicit release: the connection still has
            // to go back to its pool.
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    debug!("release dropped while pending; spawning release action");
                    handle.spawn(async move {
                        if let Err(e) = action.await {
                            warn!(%e, "release action failed after abandonment");
                        }
                    });
                }
                Err(_) => {
                    warn!("release dropped outside a runtime; guard fired, action skipped");
                }
            }
        }
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("guard", &self.guard)
            .field("pending", &self.action.is_some())
            .finish()
    }
}

/// A response that must be released exactly once.
///
/// Produced only by a dispatcher. The safe way to consume it is
/// [`with_response`](Self::with_response); [`into_parts`](Self::into_parts)
/// hands the caller the raw pair and with it the release obligation.
#[derive(Debug)]
pub struct DisposableResponse {
    response: Response,
    release: Release,
}

impl DisposableResponse {
    pub fn new(response: Response, release: Release) -> Self {
        Self { response, release }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Split into the response and its release obligation.
    pub fn into_parts(self) -> (Response, Release) {
        (self.response, self.release)
    }

    /// Replace the response through `f`, keeping the release action.
    pub fn map_response(mut self, f: impl FnOnce(Response) -> Response) -> Self {
        self.response = f(self.response);
        self
    }

    /// Apply `f` to the response, then release unconditionally.
    ///
    /// `f`'s failure is captured, the release runs, and the failure is then
    /// re-raised unchanged, unless the release itself fails, in which case
    /// the release failure takes precedence. Release is strictly ordered
    /// after `f` completes and before the result is surfaced.
    pub async fn with_response<T, F, Fut>(self, f: F) -> Result<T>
    where
        F: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (response, release) = self.into_parts();
        let outcome = f(response).await;
        match release.release().await {
            Ok(()) => outcome,
            Err(release_err) => {
                if let Err(callback_err) = &outcome {
                    warn!(%callback_err, "release failure masks callback failure");
                }
                Err(release_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;
    use crate::message::StatusCode;

    fn counting_release(guard: Guard, count: Arc<AtomicUsize>) -> Release {
        Release::new(guard, async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_with_response_releases_once_on_success() {
        let count = Arc::new(AtomicUsize::new(0));
        let disposable = DisposableResponse::new(
            Response::new(StatusCode::OK),
            counting_release(Guard::new(), Arc::clone(&count)),
        );

        let status = disposable
            .with_response(|resp| async move { Ok(resp.status()) })
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_response_releases_when_callback_fails() {
        let count = Arc::new(AtomicUsize::new(0));
        let disposable = DisposableResponse::new(
            Response::new(StatusCode::OK),
            counting_release(Guard::new(), Arc::clone(&count)),
        );

        let result: Result<()> = disposable
            .with_response(|_| async { Err(Error::Handler("boom".into())) })
            .await;

        assert!(matches!(result, Err(Error::Handler(msg)) if msg == "boom"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_failure_takes_precedence() {
        let disposable = DisposableResponse::new(
            Response::new(StatusCode::OK),
            Release::new(Guard::new(), async {
                Err(Error::Connect("pool gone".into()))
            }),
        );

        let result: Result<()> = disposable
            .with_response(|_| async { Err(Error::Handler("callback".into())) })
            .await;

        assert!(matches!(result, Err(Error::Connect(msg)) if msg == "pool gone"));
    }

    #[tokio::test]
    async fn test_release_fires_guard_before_action() {
        let guard = Guard::new();
        let observed = guard.clone();
        let release = Release::new(guard.clone(), async move {
            assert!(observed.is_set());
            Ok(())
        });

        assert!(!guard.is_set());
        release.release().await.unwrap();
        assert!(guard.is_set());
    }

    #[tokio::test]
    async fn test_drop_fires_guard_and_spawns_pending_action() {
        let count = Arc::new(AtomicUsize::new(0));
        let guard = Guard::new();
        drop(counting_release(guard.clone(), Arc::clone(&count)));

        // The guard fires synchronously; the spawned action runs once the
        // runtime gets a chance to schedule it.
        assert!(guard.is_set());
        for _ in 0..10 {
            if count.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_outside_runtime_only_fires_guard() {
        let count = Arc::new(AtomicUsize::new(0));
        let guard = Guard::new();
        drop(counting_release(guard.clone(), Arc::clone(&count)));

        assert!(guard.is_set());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
