use simcore::{Model, TelemetryFrame};

use crate::TelemetrySnapshot;

/// What the filter decided about one polled snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// New, valid, in-order: append to the buffer and deliver.
    Accepted(TelemetryFrame),
    /// Same transport tag as the previous tick: the poll re-delivered an
    /// update we already processed. Dropped entirely, on no channel.
    Duplicate,
    /// Valid but `t` did not advance past the last accepted frame: rejected
    /// from the stream, delivered only for observability.
    Stale(TelemetryFrame),
    /// No numeric `t`: dropped, on no channel.
    Malformed,
}

/// Causal-ordering and dedup state for one ingestion stream.
///
/// Rule order matches what it protects against: transport-level duplicate
/// delivery is detected first (by tag, before the payload is even looked
/// at), then the payload is validated, then ordered against the last
/// accepted frame.
#[derive(Debug, Default)]
pub struct IngestFilter {
    last_tag: Option<f64>,
    last_accepted_t: Option<f64>,
}

impl IngestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one snapshot, updating dedup/order state.
    pub fn offer(&mut self, snapshot: &TelemetrySnapshot) -> Verdict {
        if let (Some(tag), Some(prev)) = (snapshot.server_timestamp, self.last_tag) {
            if tag == prev {
                return Verdict::Duplicate;
            }
        }
        // Tag is recorded even when the frame below gets rejected: the next
        // poll returning this same tag is still a redundant delivery.
        self.last_tag = snapshot.server_timestamp;

        let Some(frame) = snapshot.frame() else {
            return Verdict::Malformed;
        };

        if let Some(last_t) = self.last_accepted_t {
            if frame.t <= last_t {
                return Verdict::Stale(frame);
            }
        }
        self.last_accepted_t = Some(frame.t);
        Verdict::Accepted(frame)
    }

    /// Forget the ordering watermark so the next frame starts a fresh
    /// stream, whatever its `t`. Dedup state is kept: a re-polled update is
    /// still a duplicate.
    pub fn reset_ordering(&mut self) {
        self.last_accepted_t = None;
    }

    pub fn last_accepted_t(&self) -> Option<f64> {
        self.last_accepted_t
    }
}

impl Model for IngestFilter {
    fn reset(&mut self) {
        self.last_tag = None;
        self.last_accepted_t = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(t: f64, tag: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            t: Some(t),
            server_timestamp: Some(tag),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_strictly_increasing_t() {
        let mut filter = IngestFilter::new();
        for (i, t) in [0.5, 1.0, 2.5].iter().enumerate() {
            let verdict = filter.offer(&snapshot(*t, i as f64));
            assert!(matches!(verdict, Verdict::Accepted(f) if f.t == *t));
        }
        assert_eq!(filter.last_accepted_t(), Some(2.5));
    }

    #[test]
    fn duplicate_tag_dropped_even_with_new_payload() {
        let mut filter = IngestFilter::new();
        assert!(matches!(filter.offer(&snapshot(1.0, 100.0)), Verdict::Accepted(_)));

        // Same tag, different payload: still the same underlying update
        let verdict = filter.offer(&snapshot(2.0, 100.0));
        assert_eq!(verdict, Verdict::Duplicate);
        assert_eq!(filter.last_accepted_t(), Some(1.0));

        // New tag resumes normal processing
        assert!(matches!(filter.offer(&snapshot(2.0, 101.0)), Verdict::Accepted(_)));
    }

    #[test]
    fn untagged_snapshots_never_dedup() {
        let mut filter = IngestFilter::new();
        let untagged = |t| TelemetrySnapshot { t: Some(t), ..Default::default() };
        assert!(matches!(filter.offer(&untagged(1.0)), Verdict::Accepted(_)));
        assert!(matches!(filter.offer(&untagged(2.0)), Verdict::Accepted(_)));
    }

    #[test]
    fn out_of_order_frame_is_stale() {
        let mut filter = IngestFilter::new();
        filter.offer(&snapshot(2.0, 1.0));

        let verdict = filter.offer(&snapshot(1.5, 2.0));
        assert!(matches!(verdict, Verdict::Stale(f) if f.t == 1.5));
        // Watermark unchanged
        assert_eq!(filter.last_accepted_t(), Some(2.0));

        // Equal t is also stale: the invariant is strictly increasing
        assert!(matches!(filter.offer(&snapshot(2.0, 3.0)), Verdict::Stale(_)));
    }

    #[test]
    fn missing_t_is_malformed() {
        let mut filter = IngestFilter::new();
        let no_t = TelemetrySnapshot { server_timestamp: Some(7.0), ..Default::default() };
        assert_eq!(filter.offer(&no_t), Verdict::Malformed);
        assert_eq!(filter.last_accepted_t(), None);

        // The malformed snapshot's tag was still recorded
        let with_t = TelemetrySnapshot { t: Some(1.0), server_timestamp: Some(7.0), ..Default::default() };
        assert_eq!(filter.offer(&with_t), Verdict::Duplicate);
    }

    #[test]
    fn reset_ordering_restarts_the_stream() {
        let mut filter = IngestFilter::new();
        filter.offer(&snapshot(5.0, 1.0));

        filter.reset_ordering();
        // Smaller t than anything previously accepted is fine now
        assert!(matches!(filter.offer(&snapshot(0.1, 2.0)), Verdict::Accepted(_)));
        // But dedup state survived
        assert_eq!(filter.offer(&snapshot(0.2, 2.0)), Verdict::Duplicate);
    }

    #[test]
    fn full_reset_clears_dedup_too() {
        let mut filter = IngestFilter::new();
        filter.offer(&snapshot(5.0, 1.0));

        filter.reset();
        assert!(matches!(filter.offer(&snapshot(0.1, 1.0)), Verdict::Accepted(_)));
    }
}
