//! Bus-domain receiver.
//!
//! Samples MOSI on every rising edge of the effective clock while selected,
//! assembling bytes MSB first. On the 8th bit the assembled byte is latched
//! into `byte` and `done` is raised. `done` is a level: it stays high until the
//! next sampling edge or the next deselection, long enough for the host-side
//! synchronizer to see it when the host clock runs at least 4x the bus clock.
//!
//! Only 8-bit receive framing exists. 16-bit receive is not implemented.

/// Receive bits per frame.
pub const RX_FRAME_BITS: u8 = 8;

pub struct Receiver {
    /// 3-bit bit counter (0..=7)
    count: u8,
    /// Shift buffer, new bits enter at bit 0
    shift: u8,
    /// Last completed byte
    pub byte: u8,
    /// Byte-complete flag (read by the synchronizer)
    pub done: bool,
}

impl Receiver {
    pub fn new() -> Self {
        Receiver { count: 0, shift: 0, byte: 0, done: false }
    }

    /// Asynchronous reset while /CS is high. Returns the number of bits of a
    /// partially received byte that were thrown away.
    pub fn deselect(&mut self) -> u8 {
        let partial = self.count;
        self.count = 0;
        self.shift = 0;
        self.done = false;
        partial
    }

    /// Sampling edge. Returns the completed byte on the 8th bit.
    pub fn sample(&mut self, mosi: bool) -> Option<u8> {
        let assembled = (self.shift << 1) | mosi as u8;
        let complete = self.count == RX_FRAME_BITS - 1;
        if complete {
            self.byte = assembled;
        }
        self.done = complete;
        self.shift = assembled;
        self.count = (self.count + 1) & (RX_FRAME_BITS - 1);
        if complete { Some(assembled) } else { None }
    }

    pub fn bit_count(&self) -> u8 {
        self.count
    }

    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// Capture state for save state.
    pub fn save_state(&self) -> crate::savestate::ReceiverState {
        crate::savestate::ReceiverState {
            count: self.count, shift: self.shift, byte: self.byte, done: self.done,
        }
    }

    /// Restore state from save state.
    pub fn load_state(&mut self, s: &crate::savestate::ReceiverState) {
        self.count = s.count & (RX_FRAME_BITS - 1);
        self.shift = s.shift;
        self.byte = s.byte;
        self.done = s.done;
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_in(rx: &mut Receiver, value: u8) -> Option<u8> {
        let mut out = None;
        for i in (0..8).rev() {
            out = rx.sample(value >> i & 1 != 0);
        }
        out
    }

    #[test]
    fn test_assembles_msb_first() {
        let mut rx = Receiver::new();
        assert_eq!(clock_in(&mut rx, 0xA5), Some(0xA5));
        assert_eq!(rx.byte, 0xA5);
        assert!(rx.done);
        assert_eq!(rx.bit_count(), 0);
    }

    #[test]
    fn test_done_only_on_eighth_bit() {
        let mut rx = Receiver::new();
        for _ in 0..7 {
            assert_eq!(rx.sample(true), None);
            assert!(!rx.done);
        }
        assert_eq!(rx.sample(true), Some(0xFF));
        assert!(rx.done);
        // Held until the next sampling edge
        rx.sample(false);
        assert!(!rx.done);
        assert_eq!(rx.byte, 0xFF);
    }

    #[test]
    fn test_back_to_back_bytes() {
        let mut rx = Receiver::new();
        assert_eq!(clock_in(&mut rx, 0x12), Some(0x12));
        assert_eq!(clock_in(&mut rx, 0x34), Some(0x34));
        assert_eq!(rx.byte, 0x34);
    }

    #[test]
    fn test_deselect_discards_partial() {
        let mut rx = Receiver::new();
        for _ in 0..5 { rx.sample(true); }
        assert_eq!(rx.deselect(), 5);
        assert_eq!(rx.shift(), 0);
        // Fresh byte counts from bit 0 without contamination
        assert_eq!(clock_in(&mut rx, 0x01), Some(0x01));
    }

    #[test]
    fn test_deselect_clears_done() {
        let mut rx = Receiver::new();
        clock_in(&mut rx, 0x5A);
        assert!(rx.done);
        assert_eq!(rx.deselect(), 0);
        assert!(!rx.done);
        assert_eq!(rx.byte, 0x5A);
    }
}
