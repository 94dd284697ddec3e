//! Plain-text streaming of relay fragments.
//!
//! Text fragments are written as they arrive. An error is written in-band as
//! its display message and ends the body; the status line has already been
//! sent as 200 by then.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::stream::{Stream, StreamExt};
use tracing::{error, info};

use crate::metrics::Metrics;
use crate::relay::FragmentStream;

/// Render fragments as body chunks, logging and counting as they pass.
pub fn fragments_to_text(
    mut fragments: FragmentStream,
    request_id: String,
    metrics: Metrics,
) -> impl Stream<Item = Result<String, Infallible>> + Send + 'static {
    async_stream::stream! {
        let mut relayed = 0usize;

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    relayed += 1;
                    metrics.fragments.inc();
                    yield Ok(text);
                }
                Err(e) => {
                    error!(request_id = %request_id, kind = e.kind(), error = %e, "Relay failed");
                    metrics.record_error(&e);
                    yield Ok(e.to_string());
                }
            }
        }

        info!(request_id = %request_id, fragments = relayed, "Relay complete");
    }
}

/// A `200 text/plain` response whose body is produced from the fragments.
pub fn text_stream_response(
    fragments: FragmentStream,
    request_id: String,
    metrics: Metrics,
) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragments_to_text(fragments, request_id, metrics)),
    )
        .into_response()
}
