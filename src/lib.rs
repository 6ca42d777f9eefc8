//! # spigot
//!
//! HTTP client orchestration layer with exactly-once connection disposal.
//!
//! Sits above a transport (the [`Dispatch`] seam) and guarantees that the
//! connection behind each response is released exactly once, whether the
//! caller succeeds, fails, or walks away from the body mid-stream. Response
//! bodies are gated per chunk on two one-way flags (the response's own
//! disposal guard and the client-wide shutdown flag), so a read past disposal
//! fails loudly instead of returning stale bytes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spigot::{Body, Client, Request, Response, StatusCode, decode};
//!
//! #[tokio::main]
//! async fn main() -> spigot::Result<()> {
//!     // A handler-backed client; production code passes a transport-backed
//!     // `Dispatch` to `Client::new` instead.
//!     let client = Client::from_handler(|_req| async {
//!         Some(Response::new(StatusCode::OK).with_body(Body::from("ok")))
//!     });
//!
//!     // `fetch` releases the connection after the callback, no matter what.
//!     let len = client
//!         .fetch(Request::get("/health"), |response| async move {
//!             let bytes = response.into_body().collect().await?;
//!             Ok(bytes.len())
//!         })
//!         .await?;
//!     assert_eq!(len, 2);
//!
//!     // `expect` adds content negotiation and a success-status check.
//!     let text = client.expect(Request::get("/health"), &decode::text()).await?;
//!     assert_eq!(text, "ok");
//!
//!     client.shutdown().await
//! }
//! ```

pub mod body;
pub mod client;
pub mod decode;
pub mod dispatch;
pub mod dispose;
pub mod error;
pub mod headers;
pub mod media;
pub mod message;

// Re-exports for ergonomic usage
pub use body::{Body, Guard};
pub use client::Client;
pub use decode::Decoder;
pub use dispatch::{from_handler, Dispatch};
pub use dispose::{DisposableResponse, Release};
pub use error::{Error, Result};
pub use headers::Headers;
pub use media::{MediaRange, QValue};
pub use message::{Method, Request, Response, StatusCode};
