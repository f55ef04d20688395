//! # spi-slave-core
//!
//! Cycle-level model of the slave side of a 4-wire SPI link: SCK, /CS, MOSI
//! and a tri-state MISO. Bytes driven by an external master are received,
//! a 16-bit word is shifted back on the same clock, all four clock
//! polarity/phase modes are supported and MISO floats whenever the endpoint
//! is not selected so several slaves can share the line.
//!
//! ## Clock domains
//!
//! Two independent domains are modelled. The byte-complete flag reaches the
//! host only through the [`blocks::Synchronizer`]; the transmit word is read
//! by the bus domain directly and must only change between transactions.
//!
//! - **Bus domain**: driven by the master's SCK and /CS through
//!   [`SpiSlave::set_sck`] / [`SpiSlave::set_cs_n`]: [`blocks::Receiver`] and
//!   [`blocks::Transmitter`].
//! - **Host domain**: driven by [`SpiSlave::host_tick`]: the synchronizer and
//!   the [`blocks::TxRegister`].
//!
//! The host clock must run at least [`MIN_CLOCK_RATIO`] times faster than the
//! bus clock. This is a precondition of the design and is not checked.
//!
//! ## Architecture
//!
//! - [`SpiSlave`]: top-level engine wiring all blocks to the pins
//! - [`blocks`]: mode/edge selector, receiver, transmitter, synchronizer,
//!   transmit register, output driver
//! - [`savestate`]: compressed save state files
//! - [`trace`]: ring buffer of pin samples for waveform views
//! - [`testbench`]: scripted bus stimulus for simulations and tests

pub mod blocks;
pub mod savestate;
pub mod trace;
pub mod testbench;

pub use blocks::{SpiMode, PinOutput};
pub use testbench::{Testbench, Transaction};

use blocks::{driver, Edge, Receiver, Synchronizer, Transmitter, TxRegister};
use log::debug;

/// Minimum host clock to bus clock frequency ratio.
pub const MIN_CLOCK_RATIO: u32 = 4;

/// SPI slave endpoint
pub struct SpiSlave {
    mode: SpiMode,
    // Pin levels
    sck: bool,
    cs_n: bool,
    mosi: bool,
    host_rst_n: bool,
    /// Effective clock (`sck ^ cpha`), tracked for edge detection
    eff_clk: bool,

    pub receiver: Receiver,
    pub transmitter: Transmitter,
    pub sync: Synchronizer,
    pub tx_reg: TxRegister,

    /// Host clock edges since construction (not counted while in reset)
    pub host_ticks: u64,

    // Debug counters
    pub dbg_bytes_completed: u64,
    pub dbg_selects: u64,
    pub dbg_partial_discards: u64,
    pub dbg_valid_pulses: u64,
}

impl SpiSlave {
    /// Create an idle, deselected endpoint with SCK at the mode's idle level.
    pub fn new(mode: SpiMode) -> Self {
        let sck = mode.idle_level();
        let mut slave = SpiSlave {
            mode,
            sck,
            cs_n: true,
            mosi: false,
            host_rst_n: true,
            eff_clk: mode.effective_clock(sck),
            receiver: Receiver::new(),
            transmitter: Transmitter::new(),
            sync: Synchronizer::new(),
            tx_reg: TxRegister::new(),
            host_ticks: 0,
            dbg_bytes_completed: 0,
            dbg_selects: 0,
            dbg_partial_discards: 0,
            dbg_valid_pulses: 0,
        };
        slave.hold_bus_reset();
        slave
    }

    pub fn mode(&self) -> SpiMode {
        self.mode
    }

    pub fn is_selected(&self) -> bool {
        !self.cs_n
    }

    // ─── Host domain ────────────────────────────────────────────────────────

    /// Drive the active-low asynchronous host reset.
    pub fn set_host_reset_n(&mut self, level: bool) {
        self.host_rst_n = level;
        if !level {
            self.sync.reset();
            self.tx_reg.reset();
            if self.cs_n {
                self.hold_bus_reset();
            }
        }
    }

    /// One rising edge of the host clock. `load` carries the transmit word
    /// when the load pulse is asserted in this cycle. Returns the received
    /// byte in the cycle the data valid pulse is high.
    pub fn host_tick(&mut self, load: Option<u16>) -> Option<u8> {
        if !self.host_rst_n {
            return None;
        }
        self.host_ticks += 1;

        let received = self.sync.tick(self.receiver.done, self.receiver.byte);
        if let Some(byte) = received {
            self.dbg_valid_pulses += 1;
            debug!("host: rx valid 0x{:02X} at tick {}", byte, self.host_ticks);
        }

        self.tx_reg.tick(load);
        if let Some(word) = load {
            debug!("host: tx word loaded 0x{:04X}", word);
        }
        // The transmitter reset value follows the live word while deselected
        if self.cs_n {
            self.transmitter.deselect(self.tx_reg.value);
        }
        received
    }

    /// Host-visible data valid pulse.
    pub fn rx_valid(&self) -> bool {
        self.sync.valid
    }

    /// Host-visible received byte.
    pub fn rx_data(&self) -> u8 {
        self.sync.data
    }

    // ─── Bus domain ─────────────────────────────────────────────────────────

    /// Drive the active-low select line.
    pub fn set_cs_n(&mut self, level: bool) {
        let was = self.cs_n;
        self.cs_n = level;
        if level {
            if !was {
                debug!("bus: deselected");
            }
            self.hold_bus_reset();
        } else if was {
            self.dbg_selects += 1;
            debug!("bus: selected, preload bit {}",
                Transmitter::preload_bit(self.tx_reg.value) as u8);
        }
    }

    /// Drive the data-in line. Sampled on the next sampling edge.
    pub fn set_mosi(&mut self, level: bool) {
        self.mosi = level;
    }

    /// Drive the raw bus clock. Rising edges of the effective clock sample
    /// MOSI, falling edges shift MISO. Both are ignored while deselected.
    pub fn set_sck(&mut self, level: bool) {
        let eff = self.mode.effective_clock(level);
        let edge = Edge::between(self.eff_clk, eff);
        self.sck = level;
        self.eff_clk = eff;
        if self.cs_n {
            return;
        }
        match edge {
            Some(Edge::Rising) => {
                log::trace!("bus: sample mosi={} bit={}", self.mosi as u8, self.receiver.bit_count());
                if let Some(byte) = self.receiver.sample(self.mosi) {
                    self.dbg_bytes_completed += 1;
                    debug!("bus: rx byte complete 0x{:02X}", byte);
                }
            }
            Some(Edge::Falling) => {
                let index = self.transmitter.bit_index();
                let bit = self.transmitter.drive(self.tx_reg.value);
                log::trace!("bus: drive miso={} bit={}", bit as u8, index);
            }
            None => {}
        }
    }

    /// Current MISO output.
    pub fn miso(&self) -> PinOutput {
        driver::drive(
            self.cs_n,
            self.transmitter.preload,
            Transmitter::preload_bit(self.tx_reg.value),
            self.transmitter.shift_bit,
        )
    }

    pub fn sck(&self) -> bool { self.sck }
    pub fn cs_n(&self) -> bool { self.cs_n }
    pub fn mosi(&self) -> bool { self.mosi }

    /// Reset both shift engines while /CS is high.
    fn hold_bus_reset(&mut self) {
        let partial = self.receiver.deselect();
        if partial != 0 {
            self.dbg_partial_discards += 1;
            debug!("bus: discarded partial byte ({} bits)", partial);
        }
        self.transmitter.deselect(self.tx_reg.value);
    }

    // ─── Debug ──────────────────────────────────────────────────────────────

    /// Pin levels as a trace sample.
    pub fn trace_sample(&self) -> trace::TraceSample {
        trace::TraceSample {
            tick: self.host_ticks,
            sck: self.sck,
            cs_n: self.cs_n,
            mosi: self.mosi,
            miso: self.miso(),
            valid: self.sync.valid,
        }
    }

    /// Multi-line register dump.
    pub fn dump_state(&self) -> String {
        let s = self.sync.stages();
        format!(
            "mode={} (CPOL={} CPHA={})  tick={}\n\
             pins: SCK={} /CS={} MOSI={} MISO={} /RST={}\n\
             rx:   bit={} shift=0x{:02X} byte=0x{:02X} done={}\n\
             tx:   word=0x{:04X} bit={} shift={} preload={}\n\
             sync: stages={}{}{} valid={} data=0x{:02X}",
            self.mode.index(), self.mode.cpol() as u8, self.mode.cpha() as u8, self.host_ticks,
            self.sck as u8, self.cs_n as u8, self.mosi as u8, self.miso().as_char(), self.host_rst_n as u8,
            self.receiver.bit_count(), self.receiver.shift(), self.receiver.byte, self.receiver.done as u8,
            self.tx_reg.value, self.transmitter.bit_index(), self.transmitter.shift_bit as u8,
            self.transmitter.preload as u8,
            s[0] as u8, s[1] as u8, s[2] as u8, self.sync.valid as u8, self.sync.data,
        )
    }

    pub fn dbg_reset_counters(&mut self) {
        self.dbg_bytes_completed = 0;
        self.dbg_selects = 0;
        self.dbg_partial_discards = 0;
        self.dbg_valid_pulses = 0;
    }

    // ─── Save state ─────────────────────────────────────────────────────────

    /// Capture the complete engine state.
    pub fn save_state(&self) -> savestate::SaveState {
        savestate::SaveState {
            sck: self.sck,
            cs_n: self.cs_n,
            mosi: self.mosi,
            host_rst_n: self.host_rst_n,
            receiver: self.receiver.save_state(),
            transmitter: self.transmitter.save_state(),
            sync: self.sync.save_state(),
            tx_word: self.tx_reg.value,
            host_ticks: self.host_ticks,
        }
    }

    /// Restore a state captured by [`SpiSlave::save_state`]. The mode stays
    /// the one the engine was built with.
    pub fn load_state(&mut self, s: &savestate::SaveState) {
        self.sck = s.sck;
        self.eff_clk = self.mode.effective_clock(s.sck);
        self.cs_n = s.cs_n;
        self.mosi = s.mosi;
        self.host_rst_n = s.host_rst_n;
        self.receiver.load_state(&s.receiver);
        self.transmitter.load_state(&s.transmitter);
        self.sync.load_state(&s.sync);
        self.tx_reg.value = s.tx_word;
        self.host_ticks = s.host_ticks;
    }

    /// Write the engine state to a save state file.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), String> {
        savestate::save_to_file(&self.save_state(), self.mode.index(), path)
    }

    /// Restore the engine state from a save state file of the same mode.
    pub fn load_from_file(&mut self, path: &std::path::Path) -> Result<(), String> {
        let state = savestate::load_from_file(path, self.mode.index())?;
        self.load_state(&state);
        Ok(())
    }
}

impl Default for SpiSlave {
    fn default() -> Self {
        Self::new(SpiMode::Mode0)
    }
}
