//! Entity decoders: converting a response body into a typed value.
//!
//! A [`Decoder`] declares which media ranges it accepts (`consumes`) and how
//! to turn a response into its output type. The client uses `consumes` to
//! inject an `Accept` header during content negotiation; an empty `consumes`
//! set means no header is injected.

use std::marker::PhantomData;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::media::MediaRange;
use crate::message::Response;

/// Collaborator converting a response body into a typed value.
#[async_trait]
pub trait Decoder: Send + Sync {
    type Output: Send;

    /// Media ranges this decoder accepts, in preference order. May be empty.
    fn consumes(&self) -> &[MediaRange];

    /// Decode the response body.
    ///
    /// With `strict`, a `Content-Type` outside [`consumes`](Self::consumes)
    /// is rejected before the body is read.
    async fn decode(&self, response: Response, strict: bool) -> Result<Self::Output>;
}

fn check_content_type(response: &Response, consumes: &[MediaRange]) -> Result<()> {
    let Some(value) = response.headers().get("Content-Type") else {
        return Ok(());
    };
    // Parameters (charset etc.) are not part of the range comparison.
    let bare = value.split(';').next().unwrap_or(value).trim();
    let media = MediaRange::from_str(bare)?;
    if consumes.iter().any(|range| range.matches(&media)) {
        return Ok(());
    }
    Err(Error::decode(format!("unacceptable media type: {bare}")))
}

/// Decoder yielding the raw body bytes. Consumes no media ranges, so `expect`
/// injects no `Accept` header for it.
pub struct BytesDecoder;

/// Decode the body as raw bytes.
pub fn bytes() -> BytesDecoder {
    BytesDecoder
}

#[async_trait]
impl Decoder for BytesDecoder {
    type Output = Bytes;

    fn consumes(&self) -> &[MediaRange] {
        &[]
    }

    async fn decode(&self, response: Response, _strict: bool) -> Result<Bytes> {
        response.into_body().collect().await
    }
}

/// Decoder yielding the body as a UTF-8 string.
pub struct TextDecoder {
    ranges: [MediaRange; 1],
}

/// Decode the body as UTF-8 text, accepting `text/*`.
pub fn text() -> TextDecoder {
    TextDecoder {
        ranges: [MediaRange::new("text", "*")],
    }
}

#[async_trait]
impl Decoder for TextDecoder {
    type Output = String;

    fn consumes(&self) -> &[MediaRange] {
        &self.ranges
    }

    async fn decode(&self, response: Response, strict: bool) -> Result<String> {
        if strict {
            check_content_type(&response, &self.ranges)?;
        }
        let bytes = response.into_body().collect().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::decode(e.to_string()))
    }
}

/// Decoder deserializing the body as JSON into `T`.
pub struct JsonDecoder<T> {
    ranges: [MediaRange; 1],
    _marker: PhantomData<fn() -> T>,
}

/// Decode the body as JSON, accepting `application/json`.
pub fn json<T: DeserializeOwned + Send>() -> JsonDecoder<T> {
    JsonDecoder {
        ranges: [MediaRange::new("application", "json")],
        _marker: PhantomData,
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> Decoder for JsonDecoder<T> {
    type Output = T;

    fn consumes(&self) -> &[MediaRange] {
        &self.ranges
    }

    async fn decode(&self, response: Response, strict: bool) -> Result<T> {
        if strict {
            check_content_type(&response, &self.ranges)?;
        }
        let bytes = response.into_body().collect().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(e.to_string()))
    }
}
