//! Scripted bus stimulus.
//!
//! Plays the external master against a [`SpiSlave`]: toggles /CS, SCK and
//! MOSI in the engine's clock mode and runs `ratio` host clock edges per bus
//! clock period in between, so both domains advance the way they would on
//! real hardware with a host clock `ratio` times faster than SCK. Every step
//! is recorded into a [`TraceBuffer`].
//!
//! The bench only produces stimulus and observes pins. It is not a master
//! implementation.

use crate::blocks::{Edge, PinOutput, SpiMode, SYNC_STAGES};
use crate::trace::TraceBuffer;
use crate::{SpiSlave, MIN_CLOCK_RATIO};
use log::{debug, warn};

/// Default trace depth in samples.
pub const TRACE_CAPACITY: usize = 4096;

/// Result of one select/deselect framed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// MISO level the instant /CS fell, before any clock edge
    pub at_select: PinOutput,
    /// MISO right after each driving edge, one entry per bus clock period.
    /// This is not what a master samples in modes 0 and 3: there it reads
    /// the previous entry (the preload bit for the first period).
    pub miso: Vec<PinOutput>,
    /// Bytes the host saw through data valid pulses during the transfer
    pub received: Vec<u8>,
}

impl Transaction {
    /// Fold the first 16 driven bits, MSB first. Floating bits read as 0.
    pub fn miso_word(&self) -> u16 {
        self.miso.iter().take(16)
            .fold(0u16, |w, out| (w << 1) | (*out == PinOutput::DriveHigh) as u16)
    }
}

pub struct Testbench {
    pub slave: SpiSlave,
    pub trace: TraceBuffer,
    /// Host clock edges per bus clock period
    ratio: u32,
    received: Vec<u8>,
}

impl Testbench {
    pub fn new(mode: SpiMode, ratio: u32) -> Self {
        Self::with_slave(SpiSlave::new(mode), ratio)
    }

    /// Drive an existing engine, e.g. one restored from a save state.
    pub fn with_slave(slave: SpiSlave, ratio: u32) -> Self {
        if ratio < MIN_CLOCK_RATIO {
            warn!("testbench: host/bus clock ratio {} is below {}, synchronizer timing not guaranteed",
                ratio, MIN_CLOCK_RATIO);
        }
        let mut tb = Testbench {
            slave,
            trace: TraceBuffer::new(TRACE_CAPACITY),
            ratio,
            received: Vec::new(),
        };
        tb.record();
        tb
    }

    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    /// All bytes seen through data valid pulses so far.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    fn half_period(&self) -> u32 {
        (self.ratio / 2).max(1)
    }

    fn record(&mut self) {
        let sample = self.slave.trace_sample();
        self.trace.push(sample);
    }

    fn tick(&mut self, load: Option<u16>) {
        if let Some(byte) = self.slave.host_tick(load) {
            self.received.push(byte);
        }
        self.record();
    }

    /// Run host clock edges with the bus lines held.
    pub fn idle(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick(None);
        }
    }

    /// One host clock edge with the load pulse asserted.
    pub fn load(&mut self, word: u16) {
        self.tick(Some(word));
    }

    /// Assert /CS. Returns MISO as seen immediately, before any clock edge.
    pub fn select(&mut self) -> PinOutput {
        self.slave.set_cs_n(false);
        self.record();
        self.slave.miso()
    }

    pub fn deselect(&mut self) {
        self.slave.set_cs_n(true);
        self.record();
    }

    /// One full bus clock period with `mosi` set up before the leading edge.
    /// Returns MISO right after this period's driving edge.
    pub fn clock_bit(&mut self, mosi: bool) -> PinOutput {
        let mode = self.slave.mode();
        let idle = mode.idle_level();
        let half = self.half_period();
        let leading_drives = Edge::between(idle, !idle) == Some(mode.drive_edge());

        self.slave.set_mosi(mosi);
        self.record();

        self.slave.set_sck(!idle);
        self.record();
        let after_leading = self.slave.miso();
        self.idle(half);

        self.slave.set_sck(idle);
        self.record();
        let after_trailing = self.slave.miso();
        self.idle(half);

        if leading_drives { after_leading } else { after_trailing }
    }

    /// Select, clock `bytes` MSB first, let the synchronizer settle, deselect.
    pub fn transfer(&mut self, bytes: &[u8]) -> Transaction {
        let first = self.received.len();
        let settle = self.ratio.max(SYNC_STAGES as u32 + 1);

        let at_select = self.select();
        self.idle(self.half_period());

        let mut miso = Vec::with_capacity(bytes.len() * 8);
        for &byte in bytes {
            for i in (0..8).rev() {
                miso.push(self.clock_bit(byte >> i & 1 != 0));
            }
        }

        self.idle(settle);
        self.deselect();
        self.idle(settle);

        let received = self.received[first..].to_vec();
        debug!("testbench: transfer {:02X?} -> rx {:02X?}", bytes, received);
        Transaction { at_select, miso, received }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_mode0_a5() {
        let mut tb = Testbench::new(SpiMode::Mode0, 8);
        let t = tb.transfer(&[0xA5]);
        assert_eq!(t.received, vec![0xA5]);
        assert_eq!(tb.slave.dbg_valid_pulses, 1);
    }

    #[test]
    fn test_scenario_tx_1234_all_modes() {
        for mode in SpiMode::ALL {
            let mut tb = Testbench::new(mode, 4);
            tb.load(0x1234);
            let t = tb.transfer(&[0x00, 0x00]);
            assert_eq!(t.at_select, PinOutput::DriveLow, "{:?}", mode);
            assert_eq!(t.miso.len(), 16);
            assert_eq!(t.miso_word(), 0x1234, "{:?}", mode);
        }
    }

    #[test]
    fn test_receive_every_mode_and_ratio() {
        let payload = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0xFF];
        for mode in SpiMode::ALL {
            for ratio in [4, 5, 8, 16] {
                let mut tb = Testbench::new(mode, ratio);
                let t = tb.transfer(&payload);
                assert_eq!(t.received, payload.to_vec(), "{:?} ratio {}", mode, ratio);
                assert_eq!(tb.slave.dbg_valid_pulses, payload.len() as u64);
            }
        }
    }

    #[test]
    fn test_first_bit_equals_bit15() {
        for mode in SpiMode::ALL {
            let mut tb = Testbench::new(mode, 8);
            tb.load(0x8001);
            let t = tb.transfer(&[0x00, 0x00]);
            assert_eq!(t.at_select, PinOutput::DriveHigh);
            assert_eq!(t.miso_word(), 0x8001);
        }
    }

    #[test]
    fn test_word_retained_across_transactions() {
        let mut tb = Testbench::new(SpiMode::Mode1, 8);
        tb.load(0xCAFE);
        assert_eq!(tb.transfer(&[1, 2]).miso_word(), 0xCAFE);
        assert_eq!(tb.transfer(&[3, 4]).miso_word(), 0xCAFE);
        tb.load(0x0F0F);
        assert_eq!(tb.transfer(&[5, 6]).miso_word(), 0x0F0F);
        assert_eq!(tb.received(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_partial_byte_then_full_byte() {
        let mut tb = Testbench::new(SpiMode::Mode2, 8);
        tb.select();
        for _ in 0..3 { tb.clock_bit(true); }
        tb.idle(8);
        tb.deselect();
        tb.idle(8);
        assert!(tb.received().is_empty());
        assert_eq!(tb.slave.dbg_partial_discards, 1);
        let t = tb.transfer(&[0x42]);
        assert_eq!(t.received, vec![0x42]);
    }

    #[test]
    fn test_miso_floats_outside_transfer() {
        let mut tb = Testbench::new(SpiMode::Mode0, 8);
        tb.load(0xFFFF);
        tb.transfer(&[0x11]);
        for s in tb.trace.iter().filter(|s| s.cs_n) {
            assert_eq!(s.miso, PinOutput::Float);
        }
        assert!(tb.trace.iter().any(|s| !s.cs_n && s.miso == PinOutput::DriveHigh));
    }

    #[test]
    fn test_trace_records_valid_pulse() {
        let mut tb = Testbench::new(SpiMode::Mode3, 8);
        tb.transfer(&[0x5A]);
        assert_eq!(tb.trace.iter().filter(|s| s.valid).count(), 1);
        let last = tb.trace.latest().copied().unwrap();
        assert!(last.cs_n);
        assert_eq!(last.tick, tb.slave.host_ticks);
    }

    #[test]
    fn test_low_ratio_still_runs() {
        let mut tb = Testbench::new(SpiMode::Mode0, 1);
        assert_eq!(tb.ratio(), 1);
        let t = tb.transfer(&[0x81]);
        assert_eq!(t.miso.len(), 8);
    }
}
