//! Bus-domain transmitter with preload.
//!
//! Shifts the host transmit word out MSB first, one bit per driving edge
//! (falling edge of the effective clock). While /CS is high the bit counter
//! sits at 15 and the preload flag is set, so the instant /CS falls the
//! output driver already presents bit 15 of the transmit word, before any
//! clock edge. The first driving edge clears preload; from then on the
//! shifted bit reaches the pin.
//!
//! The transmit word is read across the clock domains on each driving edge.
//! The host is expected to change it only between transactions.

/// Transmit bits per frame.
pub const TX_FRAME_BITS: u8 = 16;

const TX_COUNT_MASK: u8 = TX_FRAME_BITS - 1;

pub struct Transmitter {
    /// 4-bit counter, 15 down to 0
    count: u8,
    /// Bit currently presented after the first driving edge
    pub shift_bit: bool,
    /// Set while deselected, cleared by the first driving edge
    pub preload: bool,
}

impl Transmitter {
    pub fn new() -> Self {
        Transmitter { count: TX_COUNT_MASK, shift_bit: false, preload: true }
    }

    /// Top bit of a transmit word, driven while preloading.
    pub fn preload_bit(word: u16) -> bool {
        word >> TX_COUNT_MASK & 1 != 0
    }

    /// Asynchronous reset while /CS is high.
    pub fn deselect(&mut self, word: u16) {
        self.count = TX_COUNT_MASK;
        self.shift_bit = Self::preload_bit(word);
        self.preload = true;
    }

    /// Driving edge: present the bit the counter points at, then count down.
    ///
    /// When the first clock edge after select samples (modes 0 and 3), the
    /// master reads the preload bit and then bit 15 again, so it sees bits
    /// 15, 15, 14 ..= 1 and never bit 0.
    pub fn drive(&mut self, word: u16) -> bool {
        self.shift_bit = word >> self.count & 1 != 0;
        self.count = self.count.wrapping_sub(1) & TX_COUNT_MASK;
        self.preload = false;
        self.shift_bit
    }

    pub fn bit_index(&self) -> u8 {
        self.count
    }

    /// Capture state for save state.
    pub fn save_state(&self) -> crate::savestate::TransmitterState {
        crate::savestate::TransmitterState {
            count: self.count, shift_bit: self.shift_bit, preload: self.preload,
        }
    }

    /// Restore state from save state.
    pub fn load_state(&mut self, s: &crate::savestate::TransmitterState) {
        self.count = s.count & TX_COUNT_MASK;
        self.shift_bit = s.shift_bit;
        self.preload = s.preload;
    }
}

impl Default for Transmitter {
    fn default() -> Self {
        Self::new()
    }
}
