//! Exercise the client against an in-process handler: a safe fetch, a
//! streaming read, and shutdown failing a body mid-read.

use futures::StreamExt;
use spigot::{decode, Body, Client, Request, Response, StatusCode};

#[tokio::main]
async fn main() -> spigot::Result<()> {
    let client = Client::from_handler(|request| async move {
        match request.target() {
            "/health" => {
                Some(Response::new(StatusCode::OK).with_body(Body::from("ok")))
            }
            "/feed" => Some(
                Response::new(StatusCode::OK)
                    .with_body(Body::from_chunks(["chunk-1 ", "chunk-2 ", "chunk-3"])),
            ),
            _ => None,
        }
    });

    // Disposal happens inside `expect`, even on failure paths.
    let health = client.expect(Request::get("/health"), &decode::text()).await?;
    println!("health: {health}");

    // An unknown target becomes a canonical 404.
    let missing = client
        .expect(Request::get("/nowhere"), &decode::text())
        .await;
    println!("missing: {:?}", missing.err());

    // Streaming defers disposal until the stream is drained.
    let mut feed = client.streaming(Request::get("/feed"), |response| response.into_body());
    while let Some(chunk) = feed.next().await {
        println!("feed chunk: {:?}", chunk?);
    }

    // After shutdown, any further body read on this client fails.
    client.shutdown().await?;
    let late = client
        .fetch(Request::get("/health"), |response| async move {
            response.into_body().collect().await
        })
        .await;
    println!("after shutdown: {:?}", late.err());

    Ok(())
}
