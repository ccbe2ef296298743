use std::collections::VecDeque;

use simcore::TelemetryFrame;

/// Default retention window, ~5 minutes of frames at 10 Hz.
pub const DEFAULT_FRAME_CAPACITY: usize = 3000;

/// Bounded FIFO of accepted telemetry frames.
///
/// When the capacity is exceeded the oldest frame is evicted, so the buffer
/// always holds the most recent window of the stream. Memory stays bounded
/// no matter how long the pipeline runs.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    frames: VecDeque<TelemetryFrame>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        FrameBuffer {
            frames: VecDeque::with_capacity(capacity.min(DEFAULT_FRAME_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append a frame, evicting the oldest if the buffer is full.
    pub fn push(&mut self, frame: TelemetryFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Oldest-to-newest copy of the window.
    pub fn to_vec(&self) -> Vec<TelemetryFrame> {
        self.frames.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryFrame> {
        self.frames.iter()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_at(t: f64) -> TelemetryFrame {
        TelemetryFrame { t, ..Default::default() }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buffer = FrameBuffer::new(3);
        for t in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buffer.push(frame_at(t));
        }
        assert_eq!(buffer.len(), 3);
        let ts: Vec<f64> = buffer.iter().map(|f| f.t).collect();
        assert_eq!(ts, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn under_capacity_keeps_everything() {
        let mut buffer = FrameBuffer::new(10);
        for t in [1.0, 2.0, 3.0] {
            buffer.push(frame_at(t));
        }
        assert_eq!(buffer.to_vec().len(), 3);
    }

    #[test]
    fn clear_empties() {
        let mut buffer = FrameBuffer::new(3);
        buffer.push(frame_at(1.0));
        assert!(!buffer.is_empty());
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut buffer = FrameBuffer::new(0);
        buffer.push(frame_at(1.0));
        buffer.push(frame_at(2.0));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.to_vec()[0].t, 2.0);
    }
}
