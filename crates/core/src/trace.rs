//! Signal trace capture for waveform views.
//!
//! Samples of the pin levels are stored in a fixed-capacity ring buffer, the
//! oldest sample overwritten once full. The frontend renders them as an
//! ASCII waveform or a logic-analyzer window.

use crate::blocks::PinOutput;

/// Pin levels at one point of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSample {
    /// Host clock ticks since reset
    pub tick: u64,
    pub sck: bool,
    pub cs_n: bool,
    pub mosi: bool,
    pub miso: PinOutput,
    /// Host-side data valid pulse
    pub valid: bool,
}

/// Ring buffer of trace samples.
pub struct TraceBuffer {
    buf: Vec<Option<TraceSample>>,
    /// Write position (next slot to overwrite)
    write_pos: usize,
    /// Number of valid samples
    count: usize,
}

impl TraceBuffer {
    pub fn new(capacity: usize) -> Self {
        TraceBuffer {
            buf: vec![None; capacity.max(1)],
            write_pos: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn push(&mut self, sample: TraceSample) {
        self.buf[self.write_pos] = Some(sample);
        self.write_pos = (self.write_pos + 1) % self.buf.len();
        if self.count < self.buf.len() {
            self.count += 1;
        }
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&TraceSample> {
        if self.count == 0 { return None; }
        let idx = (self.write_pos + self.buf.len() - 1) % self.buf.len();
        self.buf[idx].as_ref()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TraceSample> + '_ {
        let start = (self.write_pos + self.buf.len() - self.count) % self.buf.len();
        (0..self.count).filter_map(move |i| self.buf[(start + i) % self.buf.len()].as_ref())
    }

    pub fn len(&self) -> usize { self.count }

    pub fn is_empty(&self) -> bool { self.count == 0 }

    pub fn clear(&mut self) {
        for slot in self.buf.iter_mut() { *slot = None; }
        self.count = 0;
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64) -> TraceSample {
        TraceSample { tick, sck: false, cs_n: true, mosi: false, miso: PinOutput::Float, valid: false }
    }

    #[test]
    fn test_push_iter_order() {
        let mut tb = TraceBuffer::new(4);
        for t in 0..3 { tb.push(sample(t)); }
        let ticks: Vec<u64> = tb.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(tb.latest().map(|s| s.tick), Some(2));
    }

    #[test]
    fn test_capacity() {
        assert_eq!(TraceBuffer::new(16).capacity(), 16);
        // Zero capacity is rounded up to one slot
        let mut tb = TraceBuffer::new(0);
        assert_eq!(tb.capacity(), 1);
        tb.push(sample(7));
        tb.push(sample(8));
        assert_eq!(tb.len(), 1);
        assert_eq!(tb.latest().map(|s| s.tick), Some(8));
    }

    #[test]
    fn test_ring_overflow() {
        let mut tb = TraceBuffer::new(3);
        assert_eq!(tb.capacity(), 3);
        for t in 0..5 { tb.push(sample(t)); }
        assert_eq!(tb.len(), 3);
        let ticks: Vec<u64> = tb.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
        assert_eq!(tb.latest().map(|s| s.tick), Some(4));
    }

    #[test]
    fn test_clear() {
        let mut tb = TraceBuffer::new(2);
        tb.push(sample(1));
        tb.clear();
        assert!(tb.is_empty());
        assert!(tb.latest().is_none());
        assert_eq!(tb.iter().count(), 0);
    }
}
