//! Host-domain synchronizer for the receive-complete flag.
//!
//! The flag is written by the bus clock domain and read here on every host
//! clock edge through a 3-stage shift register. Only the two older stages are
//! compared, so the host never acts on a value that was captured in the same
//! cycle it changed. A 0 -> 1 transition between them raises `valid` for
//! exactly one host cycle and copies the receiver's byte into `data`.
//!
//! Precondition (documented, not checked): the host clock runs at least 4x
//! the bus clock, so the flag is stable for more than one host cycle.
//!
//! ```text
//!   flag ──> [0] ──> [1] ──> [2]
//!                     │       │
//!                     └─ 1 ───┴─ 0  => valid, data <= rx byte
//! ```

/// Number of synchronizer stages.
pub const SYNC_STAGES: usize = 3;

pub struct Synchronizer {
    stages: [bool; SYNC_STAGES],
    /// One-host-cycle data valid pulse
    pub valid: bool,
    /// Host-visible received byte
    pub data: u8,
}

impl Synchronizer {
    pub fn new() -> Self {
        Synchronizer { stages: [false; SYNC_STAGES], valid: false, data: 0 }
    }

    pub fn reset(&mut self) {
        *self = Synchronizer::new();
    }

    /// One host clock edge. `flag` and `byte` are the bus-domain receiver
    /// outputs as seen at this edge. Returns the byte while `valid` is high.
    pub fn tick(&mut self, flag: bool, byte: u8) -> Option<u8> {
        let prev = self.stages;
        self.valid = !prev[2] && prev[1];
        if self.valid {
            self.data = byte;
        }
        self.stages = [flag, prev[0], prev[1]];
        if self.valid { Some(self.data) } else { None }
    }

    pub fn stages(&self) -> [bool; SYNC_STAGES] {
        self.stages
    }

    /// Capture state for save state.
    pub fn save_state(&self) -> crate::savestate::SyncState {
        crate::savestate::SyncState { stages: self.stages, valid: self.valid, data: self.data }
    }

    /// Restore state from save state.
    pub fn load_state(&mut self, s: &crate::savestate::SyncState) {
        self.stages = s.stages;
        self.valid = s.valid;
        self.data = s.data;
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}
