//! Change feed over Server-Sent Events.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::realtime::Feed;
use crate::state::AppState;

/// Query parameters for the event stream.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated feeds; all feeds when absent.
    pub feeds: Option<String>,
}

/// Stream change events.
///
/// GET /api/events?feeds=orders,rides
///
/// Each event is named after its feed and carries the JSON bridge event
/// (`{feed, event, toast?}`). A client that falls behind receives a `lagged`
/// event with the number of skipped events.
pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let feeds = Feed::parse_list(query.feeds.as_deref().unwrap_or_default())
        .map_err(AppError::BadRequest)?;
    let mut receiver = state.events().subscribe();
    debug!(?feeds, "Event stream opened");

    let events = stream! {
        loop {
            match receiver.recv().await {
                Ok(event) if feeds.contains(&event.feed) => {
                    match Event::default().event(event.feed.as_str()).json_data(&event) {
                        Ok(sse) => yield Ok(sse),
                        Err(e) => warn!(error = %e, "Failed to encode bridge event"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                    yield Ok(Event::default().event("lagged").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
