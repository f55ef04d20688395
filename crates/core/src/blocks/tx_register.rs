//! Host-domain transmit register.
//!
//! Holds the 16-bit word the transmitter shifts out. Overwritten on a host
//! clock edge with the load pulse asserted, otherwise retained indefinitely,
//! across transactions too. There is no acknowledge: if the host does not
//! refresh it, the same word is sent again.

pub struct TxRegister {
    pub value: u16,
    /// Debug counter: load pulses since reset
    pub dbg_loads: u64,
}

impl TxRegister {
    pub fn new() -> Self {
        TxRegister { value: 0, dbg_loads: 0 }
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Host clock edge with an optional load pulse.
    pub fn tick(&mut self, load: Option<u16>) {
        if let Some(word) = load {
            self.value = word;
            self.dbg_loads += 1;
        }
    }
}

impl Default for TxRegister {
    fn default() -> Self {
        Self::new()
    }
}
