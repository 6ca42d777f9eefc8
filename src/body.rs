//! Byte-stream bodies and cooperative interruption.
//!
//! A [`Body`] is a lazy byte sequence. The interruption wrappers make it
//! stoppable from outside its own pull loop: a one-way [`Guard`] flag is set
//! by a concurrent disposer (the release action, or the client-wide shutdown)
//! and every chunk is gated on it, so reads past disposal fail loudly instead
//! of returning stale data.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::{Error, Result};

/// An atomic one-way flag gating further reads of a body.
///
/// Set once, never reset. Cloning shares the flag: the wrapper holds a
/// back-reference to the disposer's flag, never a second owner of the
/// resource itself.
#[derive(Clone, Default)]
pub struct Guard(Arc<AtomicBool>);

impl Guard {
    /// Create an unset guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the guard. Idempotent.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the guard has fired.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.is_set()).finish()
    }
}

type BoxByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A lazy byte sequence backing a request or response.
pub struct Body {
    inner: BoxByteStream,
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Self {
            inner: Box::pin(futures::stream::empty()),
        }
    }

    /// A single-chunk body.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Self::empty();
        }
        Self {
            inner: Box::pin(futures::stream::once(async move { Ok(bytes) })),
        }
    }

    /// A body producing the given chunks in order.
    pub fn from_chunks(chunks: impl IntoIterator<Item = impl Into<Bytes>>) -> Self {
        let chunks: Vec<Result<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self {
            inner: Box::pin(futures::stream::iter(chunks)),
        }
    }

    /// A body backed by an arbitrary fallible byte stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Gate every chunk on a per-response disposal guard.
    ///
    /// Once `guard` fires, the next read fails with
    /// [`Error::ResponseDisposed`]; chunks already emitted are never
    /// retracted. If the guard is already set before the first chunk is
    /// pulled, the stream yields zero bytes and fails immediately.
    pub fn guarded(self, guard: Guard) -> Self {
        self.interrupted(guard, || Error::ResponseDisposed)
    }

    /// Gate every chunk on a client-wide shutdown flag, failing with
    /// [`Error::ClientShutDown`] once it fires.
    pub fn until_shutdown(self, flag: Guard) -> Self {
        self.interrupted(flag, || Error::ClientShutDown)
    }

    /// The flag is checked per chunk, not once at stream start, because the
    /// disposer runs concurrently with the pull loop and may fire mid-read.
    fn interrupted(self, flag: Guard, fail: fn() -> Error) -> Self {
        let mut inner = self.inner;
        Self {
            inner: Box::pin(try_stream! {
                loop {
                    if flag.is_set() {
                        Err(fail())?;
                    }
                    match inner.next().await {
                        Some(chunk) => {
                            let chunk = chunk?;
                            if flag.is_set() {
                                Err(fail())?;
                            }
                            yield chunk;
                        }
                        None => break,
                    }
                }
            }),
        }
    }

    /// Drain the body into one contiguous buffer.
    ///
    /// Guard checks still apply per chunk, so collecting a disposed body
    /// fails rather than returning a truncated buffer.
    pub async fn collect(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for Body {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Body")
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::from_bytes(Bytes::from(s))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_concatenates_chunks() {
        let body = Body::from_chunks(["ab", "cd", "ef"]);
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"abcdef"));
    }

    #[tokio::test]
    async fn test_guard_fires_between_chunks() {
        let guard = Guard::new();
        let mut body = Body::from_chunks(["ab", "cd", "ef"]).guarded(guard.clone());

        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from_static(b"ab"));

        guard.set();

        // Exactly one failure follows; "cd" and "ef" are never emitted.
        assert!(matches!(
            body.next().await,
            Some(Err(Error::ResponseDisposed))
        ));
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn test_guard_already_set_fails_before_first_chunk() {
        let guard = Guard::new();
        guard.set();
        let mut body = Body::from_chunks(["ab"]).guarded(guard);
        assert!(matches!(
            body.next().await,
            Some(Err(Error::ResponseDisposed))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_flag_uses_its_own_error() {
        let flag = Guard::new();
        flag.set();
        let mut body = Body::from_bytes("payload").until_shutdown(flag);
        assert!(matches!(body.next().await, Some(Err(Error::ClientShutDown))));
    }

    #[tokio::test]
    async fn test_unset_guards_pass_everything_through() {
        let body = Body::from_chunks(["ab", "cd"])
            .guarded(Guard::new())
            .until_shutdown(Guard::new());
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"abcd"));
    }
}
