//! The request → disposable-response seam.
//!
//! A [`Dispatch`] maps one request to one response together with the action
//! that releases the connection behind it. Production implementations sit on
//! a transport's connection pool; [`from_handler`] wraps a plain
//! request-handling function so the same disposal contract can be exercised
//! without any transport.

use std::future::Future;

use async_trait::async_trait;
use tracing::debug;

use crate::body::Guard;
use crate::dispose::{DisposableResponse, Release};
use crate::error::Result;
use crate::message::{Request, Response, StatusCode};

/// Low-level operation mapping a request to a disposable response.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Open a connection for `request`.
    ///
    /// The returned release action must be safe to invoke even if the body
    /// was only partially read.
    async fn open(&self, request: Request) -> Result<DisposableResponse>;

    /// Release transport-level resources held by the dispatcher.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<D: Dispatch + ?Sized> Dispatch for std::sync::Arc<D> {
    async fn open(&self, request: Request) -> Result<DisposableResponse> {
        (**self).open(request).await
    }
    async fn shutdown(&self) -> Result<()> {
        (**self).shutdown().await
    }
}

/// Dispatcher backed by a request-handling function.
///
/// Each response body is tagged with a fresh disposal guard; release sets
/// that guard, so further reads of the body fail exactly as they would on the
/// pooled path, even though there is no connection to return. A handler
/// returning `None` is substituted with a canonical `404 Not Found`.
pub struct HandlerDispatch<F> {
    handler: F,
}

/// Wrap a request-handling function into a [`Dispatch`].
pub fn from_handler<F, Fut>(handler: F) -> HandlerDispatch<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Option<Response>> + Send,
{
    HandlerDispatch { handler }
}

#[async_trait]
impl<F, Fut> Dispatch for HandlerDispatch<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Option<Response>> + Send,
{
    async fn open(&self, request: Request) -> Result<DisposableResponse> {
        let method = request.method();
        let target = request.target().to_string();

        let response = (self.handler)(request)
            .await
            .unwrap_or_else(|| Response::new(StatusCode::NOT_FOUND));
        debug!(
            method = method.as_str(),
            target = target.as_str(),
            status = response.status().as_u16(),
            "handler dispatch"
        );

        let guard = Guard::new();
        let response = response.map_body(|body| body.guarded(guard.clone()));
        Ok(DisposableResponse::new(response, Release::flag_only(guard)))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::body::Body;
    use crate::error::Error;

    #[tokio::test]
    async fn test_missing_response_becomes_not_found() {
        let dispatch = from_handler(|_| async { None });
        let disposable = dispatch.open(Request::get("/nowhere")).await.unwrap();
        assert_eq!(disposable.response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_release_gates_further_body_reads() {
        let dispatch = from_handler(|_| async {
            Some(Response::new(StatusCode::OK).with_body(Body::from_chunks(["ab", "cd"])))
        });

        let (response, release) = dispatch
            .open(Request::get("/data"))
            .await
            .unwrap()
            .into_parts();
        let mut body = response.into_body();

        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"ab");
        release.release().await.unwrap();
        assert!(matches!(
            body.next().await,
            Some(Err(Error::ResponseDisposed))
        ));
    }

    #[tokio::test]
    async fn test_each_open_gets_its_own_guard() {
        let dispatch = from_handler(|_| async {
            Some(Response::new(StatusCode::OK).with_body(Body::from_bytes("ok")))
        });

        let first = dispatch.open(Request::get("/a")).await.unwrap();
        let second = dispatch.open(Request::get("/b")).await.unwrap();

        let (_, release) = first.into_parts();
        release.release().await.unwrap();

        // Disposing the first response leaves the second readable.
        let bytes = second
            .with_response(|resp| async move { resp.into_body().collect().await })
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
