//! Clock mode and edge selection.
//!
//! The four SPI modes encode a polarity bit (CPOL, idle level of SCK) and a
//! phase bit (CPHA). The engine never branches on the mode past this file:
//! it derives an *effective* clock, `sck ^ cpha`, whose rising edge is always
//! the sampling edge and whose falling edge is always the driving edge.

use serde::{Serialize, Deserialize};

/// A raw clock transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    pub fn opposite(self) -> Edge {
        match self {
            Edge::Rising => Edge::Falling,
            Edge::Falling => Edge::Rising,
        }
    }

    /// Classify a level change. `None` if the level did not change.
    pub fn between(old: bool, new: bool) -> Option<Edge> {
        match (old, new) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        }
    }
}

/// Clock polarity × phase configuration, fixed for an engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    pub const ALL: [SpiMode; 4] = [SpiMode::Mode0, SpiMode::Mode1, SpiMode::Mode2, SpiMode::Mode3];

    pub fn from_index(index: u8) -> Result<SpiMode, String> {
        match index {
            0 => Ok(SpiMode::Mode0),
            1 => Ok(SpiMode::Mode1),
            2 => Ok(SpiMode::Mode2),
            3 => Ok(SpiMode::Mode3),
            _ => Err(format!("Invalid SPI mode {} (expected 0-3)", index)),
        }
    }

    pub fn index(self) -> u8 {
        ((self.cpol() as u8) << 1) | (self.cpha() as u8)
    }

    pub fn cpol(self) -> bool {
        matches!(self, SpiMode::Mode2 | SpiMode::Mode3)
    }

    pub fn cpha(self) -> bool {
        matches!(self, SpiMode::Mode1 | SpiMode::Mode3)
    }

    /// Level of the raw clock while the master is idle.
    pub fn idle_level(self) -> bool {
        self.cpol()
    }

    /// Effective clock: raw clock for phase 0, inverted raw clock for phase 1.
    pub fn effective_clock(self, sck: bool) -> bool {
        sck ^ self.cpha()
    }

    /// Raw clock transition on which data-in is sampled.
    pub fn sample_edge(self) -> Edge {
        if self.cpha() { Edge::Falling } else { Edge::Rising }
    }

    /// Raw clock transition on which data-out is shifted.
    pub fn drive_edge(self) -> Edge {
        self.sample_edge().opposite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index_roundtrip() {
        for mode in SpiMode::ALL {
            assert_eq!(SpiMode::from_index(mode.index()), Ok(mode));
        }
        assert!(SpiMode::from_index(4).is_err());
    }

    #[test]
    fn test_polarity_phase_bits() {
        assert_eq!((SpiMode::Mode0.cpol(), SpiMode::Mode0.cpha()), (false, false));
        assert_eq!((SpiMode::Mode1.cpol(), SpiMode::Mode1.cpha()), (false, true));
        assert_eq!((SpiMode::Mode2.cpol(), SpiMode::Mode2.cpha()), (true, false));
        assert_eq!((SpiMode::Mode3.cpol(), SpiMode::Mode3.cpha()), (true, true));
    }

    #[test]
    fn test_effective_clock_follows_phase() {
        for mode in SpiMode::ALL {
            for sck in [false, true] {
                let eff = mode.effective_clock(sck);
                if mode.cpha() { assert_eq!(eff, !sck); } else { assert_eq!(eff, sck); }
            }
        }
    }

    #[test]
    fn test_sample_edge_maps_to_effective_rising() {
        // Whatever the mode, the raw sampling edge must be a rising edge of the effective clock
        for mode in SpiMode::ALL {
            let (from, to) = match mode.sample_edge() {
                Edge::Rising => (false, true),
                Edge::Falling => (true, false),
            };
            let eff = Edge::between(mode.effective_clock(from), mode.effective_clock(to));
            assert_eq!(eff, Some(Edge::Rising), "{:?}", mode);
            assert_eq!(mode.drive_edge(), mode.sample_edge().opposite());
        }
    }

    #[test]
    fn test_phase_selects_raw_edge() {
        // phase=0: sampling on the raw rising edge, same transition as the effective clock.
        // phase=1: sampling on the raw falling edge, opposite transition.
        assert_eq!(SpiMode::Mode0.sample_edge(), Edge::Rising);
        assert_eq!(SpiMode::Mode2.sample_edge(), Edge::Rising);
        assert_eq!(SpiMode::Mode1.sample_edge(), Edge::Falling);
        assert_eq!(SpiMode::Mode3.sample_edge(), Edge::Falling);
    }

    #[test]
    fn test_edge_between() {
        assert_eq!(Edge::between(false, true), Some(Edge::Rising));
        assert_eq!(Edge::between(true, false), Some(Edge::Falling));
        assert_eq!(Edge::between(true, true), None);
    }
}
