use std::time::Instant;

use simcore::TelemetryFrame;

/// Consumer-side rebase of frame time onto the local clock.
///
/// Some sources emit a non-monotonic or static `t` (a device that restarts,
/// or a relay that stamps frames with its own idea of time). When configured
/// to, the *consumer* rewrites `t` with the wall-clock seconds elapsed since
/// the first frame it saw; the pipeline's ordering rules still run on the
/// source's original `t`, never on this one.
#[derive(Debug, Default)]
pub struct LocalTimeline {
    start: Option<Instant>,
}

impl LocalTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite `t` to local elapsed seconds. The first rebased frame gets
    /// `t = 0`.
    pub fn rebase(&mut self, frame: TelemetryFrame) -> TelemetryFrame {
        let start = *self.start.get_or_insert_with(Instant::now);
        TelemetryFrame {
            t: start.elapsed().as_secs_f64(),
            ..frame
        }
    }

    /// Forget the epoch; the next frame restarts at `t = 0`.
    pub fn reset(&mut self) {
        self.start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn rebased_time_is_monotonic_from_zero() {
        let mut timeline = LocalTimeline::new();
        let source_frame = TelemetryFrame { t: 1234.5, roll: 3.0, ..Default::default() };

        let first = timeline.rebase(source_frame);
        assert!(first.t < 0.05, "first frame should rebase to ~0, got {}", first.t);
        // Payload is untouched
        assert_eq!(first.roll, 3.0);

        thread::sleep(Duration::from_millis(20));
        let second = timeline.rebase(source_frame);
        assert!(second.t > first.t);
    }

    #[test]
    fn reset_restarts_the_epoch() {
        let mut timeline = LocalTimeline::new();
        timeline.rebase(TelemetryFrame::default());
        thread::sleep(Duration::from_millis(20));

        timeline.reset();
        let frame = timeline.rebase(TelemetryFrame::default());
        assert!(frame.t < 0.05);
    }
}
