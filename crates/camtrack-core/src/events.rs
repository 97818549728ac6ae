//! Track lifecycle events and the sink they are published to.
//!
//! The tracker only calls `EventSink::publish`. Fan-out to subscribers (the
//! 3D reconstruction, a UI, a log) is the sink's business.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::TrackId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "track", rename_all = "snake_case")]
pub enum TrackEvent {
    /// A detection matched no track and started a new one.
    PointCreated(TrackId),
    /// A track without a 3D link was refreshed and may now be linked.
    PointUpdatedCandidate(TrackId),
    /// A track exceeded the eviction limit and was removed.
    PointLost(TrackId),
}

impl TrackEvent {
    pub fn track_id(&self) -> TrackId {
        match *self {
            TrackEvent::PointCreated(id)
            | TrackEvent::PointUpdatedCandidate(id)
            | TrackEvent::PointLost(id) => id,
        }
    }
}

/// Destination for track events.
pub trait EventSink {
    fn publish(&mut self, event: TrackEvent);
}

impl EventSink for Vec<TrackEvent> {
    fn publish(&mut self, event: TrackEvent) {
        self.push(event);
    }
}

/// Forwards events to a channel. A disconnected receiver drops them.
impl EventSink for mpsc::Sender<TrackEvent> {
    fn publish(&mut self, event: TrackEvent) {
        if self.send(event).is_err() {
            log::debug!("event receiver gone, dropping {event:?}");
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, event: TrackEvent) {
        (**self).publish(event);
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: TrackEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_and_survives_disconnect() {
        let (mut tx, rx) = mpsc::channel();
        tx.publish(TrackEvent::PointCreated(TrackId(1)));
        assert_eq!(rx.recv().ok(), Some(TrackEvent::PointCreated(TrackId(1))));
        drop(rx);
        tx.publish(TrackEvent::PointLost(TrackId(1)));
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&TrackEvent::PointLost(TrackId(4))).expect("json");
        assert_eq!(json, r#"{"event":"point_lost","track":4}"#);
    }
}
