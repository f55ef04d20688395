//! Save state for the SPI slave engine.
//!
//! Captures every register of both clock domains plus the last seen pin
//! levels using bincode serialization with deflate compression, so a
//! simulation can be paused mid-transaction and resumed later.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "SPSS"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Clock mode       |  u8 (0-3, CPOL << 1 | CPHA)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Serialize, Deserialize};
use std::path::Path;

/// Magic bytes identifying an spi-slave save state file.
const MAGIC: &[u8; 4] = b"SPSS";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 9;

// ─── Per-block state structs ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverState {
    pub count: u8,
    pub shift: u8,
    pub byte: u8,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmitterState {
    pub count: u8,
    pub shift_bit: bool,
    pub preload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub stages: [bool; 3],
    pub valid: bool,
    pub data: u8,
}

// ─── Top-level save state ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    // Pins
    pub sck: bool,
    pub cs_n: bool,
    pub mosi: bool,
    pub host_rst_n: bool,

    // Bus domain
    pub receiver: ReceiverState,
    pub transmitter: TransmitterState,

    // Host domain
    pub sync: SyncState,
    pub tx_word: u16,
    pub host_ticks: u64,
}

// ─── File I/O ───────────────────────────────────────────────────────────────

/// Fixed-size prefix of a save state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    version: u32,
    mode: u8,
}

impl Header {
    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(MAGIC);
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8] = self.mode;
        out
    }

    /// Split `data` into header and payload.
    fn parse(data: &[u8]) -> Result<(Header, &[u8]), String> {
        let (head, payload) = match data.split_first_chunk::<HEADER_LEN>() {
            Some(split) => split,
            None => return Err("File too small".into()),
        };
        if &head[..4] != MAGIC {
            return Err("Invalid save state file (bad magic)".into());
        }
        let version = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);
        Ok((Header { version, mode: head[8] }, payload))
    }
}

/// Serialize a state into the on-disk representation.
pub fn encode(state: &SaveState, mode_byte: u8) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(state)
        .map_err(|e| format!("Serialize error: {}", e))?;
    let header = Header { version: FORMAT_VERSION, mode: mode_byte };
    let mut out = header.to_bytes().to_vec();
    out.extend(miniz_oxide::deflate::compress_to_vec(&payload, 6));
    Ok(out)
}

/// Parse the on-disk representation, verifying magic, version and mode.
pub fn decode(data: &[u8], expected_mode: u8) -> Result<SaveState, String> {
    let (header, payload) = Header::parse(data)?;
    if header.version != FORMAT_VERSION {
        return Err(format!("Unsupported save state version {} (expected {})",
            header.version, FORMAT_VERSION));
    }
    if header.mode != expected_mode {
        return Err(format!("SPI mode mismatch: save=mode{} current=mode{}",
            header.mode, expected_mode));
    }
    let raw = miniz_oxide::inflate::decompress_to_vec(payload)
        .map_err(|e| format!("Decompress error: {:?}", e))?;
    bincode::deserialize(&raw)
        .map_err(|e| format!("Deserialize error: {}", e))
}

/// Save state to file with header and deflate compression.
pub fn save_to_file(state: &SaveState, mode_byte: u8, path: &Path) -> Result<(), String> {
    let out = encode(state, mode_byte)?;
    std::fs::write(path, &out)
        .map_err(|e| format!("Write error: {}", e))
}

/// Load state from file, verifying magic, version, and clock mode.
pub fn load_from_file(path: &Path, expected_mode: u8) -> Result<SaveState, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Read error: {}", e))?;
    decode(&data, expected_mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SaveState {
        SaveState {
            sck: true, cs_n: false, mosi: true, host_rst_n: true,
            receiver: ReceiverState { count: 3, shift: 0b101, byte: 0xA5, done: false },
            transmitter: TransmitterState { count: 12, shift_bit: true, preload: false },
            sync: SyncState { stages: [true, false, false], valid: false, data: 0x3C },
            tx_word: 0x1234,
            host_ticks: 1000,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample_state(), 2).unwrap();
        assert_eq!(&bytes[0..4], b"SPSS");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 1);
        assert_eq!(bytes[8], 2);
        assert_eq!(decode(&bytes, 2).unwrap(), sample_state());
    }

    #[test]
    fn test_rejects_bad_headers() {
        let bytes = encode(&sample_state(), 0).unwrap();
        assert!(decode(&bytes[..5], 0).unwrap_err().contains("too small"));

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(decode(&bad_magic, 0).unwrap_err().contains("magic"));

        let mut bad_version = bytes.clone();
        bad_version[4] = 9;
        assert!(decode(&bad_version, 0).unwrap_err().contains("version"));

        assert!(decode(&bytes, 3).unwrap_err().contains("mode mismatch"));
    }

    #[test]
    fn test_header_parse_splits_payload() {
        let mut data = Header { version: 7, mode: 3 }.to_bytes().to_vec();
        data.extend_from_slice(&[0xAA, 0xBB]);
        let (header, payload) = Header::parse(&data).unwrap();
        assert_eq!(header, Header { version: 7, mode: 3 });
        assert_eq!(payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_rejects_corrupt_payload() {
        let mut bytes = encode(&sample_state(), 1).unwrap();
        bytes.truncate(HEADER_LEN + 1);
        assert!(decode(&bytes, 1).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("spi-slave-savestate-{}.state", std::process::id()));
        save_to_file(&sample_state(), 1, &path).unwrap();
        let loaded = load_from_file(&path, 1).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, sample_state());
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("spi-slave-does-not-exist.state");
        assert!(load_from_file(&path, 0).unwrap_err().starts_with("Read error"));
    }
}
