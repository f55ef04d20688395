//! Hardware blocks of the SPI slave endpoint.
//!
//! Dependency order, leaves first:
//!
//! - [`SpiMode`]: clock polarity/phase, effective clock and edge selection
//! - [`Receiver`]: bus-domain MOSI shift-in, 8-bit framing
//! - [`Transmitter`]: bus-domain MISO shift-out, 16-bit framing with preload
//! - [`Synchronizer`]: 3-stage crossing of the byte-complete flag into the host domain
//! - [`TxRegister`]: host-domain transmit word
//! - [`driver`]: tri-state output stage and shared-line resolution

mod mode;
mod receiver;
mod transmitter;
mod synchronizer;
mod tx_register;
pub mod driver;

pub use mode::{SpiMode, Edge};
pub use receiver::{Receiver, RX_FRAME_BITS};
pub use transmitter::{Transmitter, TX_FRAME_BITS};
pub use synchronizer::{Synchronizer, SYNC_STAGES};
pub use tx_register::TxRegister;
pub use driver::{PinOutput, BusLevel};
