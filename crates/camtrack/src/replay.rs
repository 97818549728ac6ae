//! Feeding recorded camera messages through a device.

use std::io::{self, BufRead, Write};

use camtrack_core::{Association, EventSink, TrackEvent};
use log::debug;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{CameraDevice, PushOutcome};

/// Counts collected by `replay`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Non-blank input lines.
    pub messages: usize,
    pub created: usize,
    pub updated: usize,
    pub malformed: usize,
    /// Messages dropped because the device is not calibrated.
    pub rejected: usize,
    /// Tracks alive after the last message.
    pub live_tracks: usize,
}

/// Push every non-blank line of `input` to `device`, in order.
///
/// Only read errors are returned; message-level problems are counted in the
/// summary.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(device, input, sink), fields(device = device.device_id()))
)]
pub fn replay<R, S>(device: &mut CameraDevice, input: R, sink: &mut S) -> io::Result<ReplaySummary>
where
    R: BufRead,
    S: EventSink + ?Sized,
{
    let mut summary = ReplaySummary::default();
    for line in input.lines() {
        let line = line?;
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        summary.messages += 1;
        match device.push(raw, sink) {
            PushOutcome::Tracked(Association::Created(_)) => summary.created += 1,
            PushOutcome::Tracked(Association::Updated(_)) => summary.updated += 1,
            PushOutcome::Malformed => summary.malformed += 1,
            PushOutcome::NotCalibrated => summary.rejected += 1,
        }
    }
    summary.live_tracks = device.tracker().len();
    debug!("{}: replay done: {summary:?}", device.device_id());
    Ok(summary)
}

/// Writes each event as one JSON object per line.
///
/// `EventSink::publish` cannot fail, so the first write error is kept and
/// later events are dropped; `finish` reports it.
pub struct JsonLinesSink<W> {
    out: W,
    written: usize,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            error: None,
        }
    }

    /// Events written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the writer, or the first write error.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn publish(&mut self, event: TrackEvent) {
        if self.error.is_some() {
            return;
        }
        let res = serde_json::to_writer(&mut self.out, &event)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        match res {
            Ok(()) => self.written += 1,
            Err(e) => self.error = Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraParams, TrackerParams};
    use camtrack_calib::MemoryStore;
    use camtrack_calib::PreferenceStore;
    use nalgebra::Matrix3x4;

    fn calibrated_device() -> CameraDevice {
        let store = MemoryStore::new();
        let record = CameraParams {
            projection: Some(Matrix3x4::identity()),
            ..CameraParams::default()
        }
        .to_record();
        store.put("cam", &record).expect("put");
        let mut device = CameraDevice::new("cam", TrackerParams::default());
        assert!(device.load_preferences(&store));
        device
    }

    #[test]
    fn replay_counts_outcomes_and_skips_blank_lines() {
        let mut device = calibrated_device();
        let log = "1x10y10h5w5a0\n\n  1x12y11h6w4a0  \ngarbage\n1x200y200h5w5a0\n";
        let mut events: Vec<TrackEvent> = Vec::new();
        let summary = replay(&mut device, log.as_bytes(), &mut events).expect("replay");
        assert_eq!(
            summary,
            ReplaySummary {
                messages: 4,
                created: 2,
                updated: 1,
                malformed: 1,
                rejected: 0,
                live_tracks: 2,
            }
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn uncalibrated_replay_rejects_everything() {
        let mut device = CameraDevice::new("cam", TrackerParams::default());
        let mut events: Vec<TrackEvent> = Vec::new();
        let summary = replay(&mut device, "1x1y1h1w1a0\n1x1y1h1w1a0\n".as_bytes(), &mut events)
            .expect("replay");
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.live_tracks, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn json_lines_sink_writes_one_object_per_event() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish(TrackEvent::PointCreated(camtrack_core::TrackId(0)));
        sink.publish(TrackEvent::PointLost(camtrack_core::TrackId(0)));
        assert_eq!(sink.written(), 2);
        let out = String::from_utf8(sink.finish().expect("finish")).expect("utf8");
        assert_eq!(
            out,
            "{\"event\":\"point_created\",\"track\":0}\n{\"event\":\"point_lost\",\"track\":0}\n"
        );
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_sink_reports_first_write_error() {
        let mut sink = JsonLinesSink::new(Broken);
        sink.publish(TrackEvent::PointCreated(camtrack_core::TrackId(3)));
        sink.publish(TrackEvent::PointCreated(camtrack_core::TrackId(4)));
        assert_eq!(sink.written(), 0);
        let err = sink.finish().err().expect("write error");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
