//! Main client entry point.
//!
//! [`Client`] composes a [`Dispatch`] with the disposal guarantees: every
//! convenience method (`fetch`, `expect`, `fetch_as`) releases the connection
//! exactly once, inside the combinator, regardless of how the caller's code
//! fares. The two deliberate exceptions, [`streaming`](Client::streaming)
//! and [`open`](Client::open), are documented at their definitions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::body::Guard;
use crate::decode::Decoder;
use crate::dispatch::{self, Dispatch};
use crate::dispose::DisposableResponse;
use crate::error::{Error, Result};
use crate::media::{self, MediaRange, QValue};
use crate::message::{Request, Response};

/// HTTP client orchestration facade.
///
/// Cheap to clone; clones share the dispatcher and the shutdown flag. Many
/// requests may be outstanding concurrently on one client.
///
/// # Examples
///
/// ```rust,no_run
/// use spigot::{Body, Client, Request, Response, StatusCode, decode};
///
/// # async fn example() -> spigot::Result<()> {
/// let client = Client::from_handler(|_req| async {
///     Some(Response::new(StatusCode::OK).with_body(Body::from("ok")))
/// });
///
/// let text = client.expect(Request::get("/health"), &decode::text()).await?;
/// assert_eq!(text, "ok");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    dispatch: Arc<dyn Dispatch>,
    shutdown_flag: Guard,
}

impl Client {
    /// Build a client over a dispatcher.
    pub fn new(dispatch: impl Dispatch + 'static) -> Self {
        Self {
            dispatch: Arc::new(dispatch),
            shutdown_flag: Guard::new(),
        }
    }

    /// Build a client over a request-handling function, with no transport.
    ///
    /// See [`dispatch::from_handler`] for the disposal semantics.
    pub fn from_handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Response>> + Send + 'static,
    {
        Self::new(dispatch::from_handler(handler))
    }

    /// Open a connection and return the response without disposing.
    ///
    /// The caller assumes the release obligation; dropping the returned value
    /// unreleased fires its guard and spawns the release action on the
    /// current runtime. Intended for proxy passthrough, where the response
    /// must outlive this call; prefer [`fetch`](Self::fetch) everywhere else.
    pub async fn open(&self, request: Request) -> Result<DisposableResponse> {
        let flag = self.shutdown_flag.clone();
        let disposable = self.dispatch.open(request).await?;
        // Layer the client-wide flag under the per-response guard, so either
        // one firing aborts the body.
        Ok(disposable.map_response(|resp| resp.map_body(|body| body.until_shutdown(flag))))
    }

    /// Open a connection, apply `f` to the response, and release the
    /// connection regardless of the outcome.
    ///
    /// The release is strictly ordered after `f` completes (success or
    /// failure) and before the result is returned.
    pub async fn fetch<T, F, Fut>(&self, request: Request, f: F) -> Result<T>
    where
        F: FnOnce(Response) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        self.open(request).await?.with_response(f).await
    }

    /// Submit `request` and decode the body on a successful status.
    ///
    /// When the decoder declares a non-empty `consumes` set, an `Accept`
    /// header built from those ranges (in declared order) is appended to the
    /// request. A non-2xx status fails with [`Error::UnexpectedStatus`]
    /// without invoking the decoder. The connection is released in all cases.
    pub async fn expect<D: Decoder>(&self, request: Request, decoder: &D) -> Result<D::Output> {
        let request = inject_accept(request, decoder.consumes());
        self.fetch(request, |response| async move {
            let status = response.status();
            if !status.is_success() {
                debug!(%status, "expect: unexpected status");
                return Err(Error::UnexpectedStatus(status));
            }
            decoder.decode(response, false).await
        })
        .await
    }

    /// Like [`expect`](Self::expect), but decodes whatever status arrives.
    pub async fn fetch_as<D: Decoder>(&self, request: Request, decoder: &D) -> Result<D::Output> {
        let request = inject_accept(request, decoder.consumes());
        self.fetch(request, |response| async move {
            decoder.decode(response, false).await
        })
        .await
    }

    /// Open a connection and stream the items `f` produces from the response.
    ///
    /// This is the one operation that does not dispose before returning: the
    /// body must remain readable by the returned stream. Release happens once
    /// the stream is fully drained; a release failure surfaces as the final
    /// item. If the caller abandons the stream early, dropping it fires the
    /// response's guard and the release action is spawned on the runtime, so
    /// the connection is still released exactly once.
    ///
    /// A failure to open surfaces as the single item of the stream. Failures
    /// inside `f`'s stream flow through as items; they are not pre-trapped
    /// the way `fetch` captures callback failures.
    pub fn streaming<T, F, S>(
        &self,
        request: Request,
        f: F,
    ) -> Pin<Box<dyn Stream<Item = Result<T>> + Send>>
    where
        F: FnOnce(Response) -> S + Send + 'static,
        S: Stream<Item = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.clone();
        Box::pin(stream! {
            match client.open(request).await {
                Ok(disposable) => {
                    let (response, release) = disposable.into_parts();
                    let mut items = Box::pin(f(response));
                    while let Some(item) = items.next().await {
                        yield item;
                    }
                    if let Err(e) = release.release().await {
                        yield Err(e);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }

    /// Adapt the client into a call-and-dispose request handler for
    /// composition into larger request-processing pipelines.
    pub fn to_service<T, F, Fut>(&self, f: F) -> impl Fn(Request) -> BoxFuture<'static, Result<T>>
    where
        F: Fn(Response) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.clone();
        move |request| {
            let client = client.clone();
            let f = f.clone();
            Box::pin(async move { client.fetch(request, f).await })
        }
    }

    /// Set the client-wide shutdown flag and run the dispatcher's shutdown.
    ///
    /// Once the flag is set, body reads on every response opened by this
    /// client, outstanding or future, fail with
    /// [`Error::ClientShutDown`]. The flag is never reset.
    pub async fn shutdown(&self) -> Result<()> {
        debug!("client shutdown");
        self.shutdown_flag.set();
        self.dispatch.shutdown().await
    }

    /// Blocking form of [`shutdown`](Self::shutdown).
    ///
    /// This is the one operation in the crate that blocks the calling thread
    /// rather than suspending a task. Call it from synchronous teardown code
    /// only, never from inside an async context.
    pub fn shutdown_now(&self) -> Result<()> {
        futures::executor::block_on(self.shutdown())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

fn inject_accept(request: Request, consumes: &[MediaRange]) -> Request {
    if consumes.is_empty() {
        return request;
    }
    let ranges: Vec<(MediaRange, Option<QValue>)> =
        consumes.iter().cloned().map(|range| (range, None)).collect();
    request.with_header("Accept", media::accept_value(&ranges))
}
