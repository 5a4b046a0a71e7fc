use crate::store::Subscription;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use parley_core::{Role, RoomId};
use std::convert::Infallible;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Wraps a candidate subscription into an SSE response: one event per
/// candidate, a `ping` comment every `keepalive`.
///
/// The stream ends when the client disconnects or `shutdown` fires.
pub fn candidate_events(
    room: RoomId,
    to: Role,
    candidates: Subscription,
    keepalive: Duration,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(%room, %to, "Streaming candidates");

    let events = candidates
        .filter_map(move |candidate| {
            // SSE cannot carry a carriage return inside a data field.
            let event = if candidate.contains('\r') {
                warn!(%room, %to, "Skipping candidate that cannot be framed as SSE");
                None
            } else {
                Some(Ok(Event::default().data(candidate)))
            };
            futures::future::ready(event)
        })
        .take_until(shutdown.cancelled_owned());

    Sse::new(events).keep_alive(KeepAlive::new().interval(keepalive).text("ping"))
}
