//! MISO output driver and shared-line resolution.

use serde::{Serialize, Deserialize};

/// Tri-state output of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PinOutput {
    DriveLow,
    DriveHigh,
    /// High impedance: not contributing to the line
    #[default]
    Float,
}

impl PinOutput {
    pub fn from_level(level: bool) -> PinOutput {
        if level { PinOutput::DriveHigh } else { PinOutput::DriveLow }
    }

    /// Driven level, `None` when floating.
    pub fn level(self) -> Option<bool> {
        match self {
            PinOutput::DriveLow => Some(false),
            PinOutput::DriveHigh => Some(true),
            PinOutput::Float => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            PinOutput::DriveLow => '0',
            PinOutput::DriveHigh => '1',
            PinOutput::Float => 'Z',
        }
    }
}

/// Combinational output stage: float when deselected, preload bit before the
/// first driving edge, shifted bit afterwards.
pub fn drive(cs_n: bool, preload: bool, preload_bit: bool, shift_bit: bool) -> PinOutput {
    if cs_n {
        PinOutput::Float
    } else if preload {
        PinOutput::from_level(preload_bit)
    } else {
        PinOutput::from_level(shift_bit)
    }
}

/// Resulting level of a line shared by several endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusLevel {
    Floating,
    Low,
    High,
    /// Two endpoints drive opposite levels
    Contention,
}

/// Wired tri-state resolution. No arbitration: a disagreement is reported,
/// not settled.
pub fn resolve<I: IntoIterator<Item = PinOutput>>(outputs: I) -> BusLevel {
    let mut line = BusLevel::Floating;
    for out in outputs {
        line = match (line, out.level()) {
            (l, None) => l,
            (BusLevel::Floating, Some(false)) => BusLevel::Low,
            (BusLevel::Floating, Some(true)) => BusLevel::High,
            (BusLevel::Low, Some(false)) => BusLevel::Low,
            (BusLevel::High, Some(true)) => BusLevel::High,
            _ => BusLevel::Contention,
        };
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_when_deselected() {
        for preload in [false, true] {
            for a in [false, true] {
                for b in [false, true] {
                    assert_eq!(drive(true, preload, a, b), PinOutput::Float);
                }
            }
        }
    }

    #[test]
    fn test_preload_selects_source() {
        assert_eq!(drive(false, true, true, false), PinOutput::DriveHigh);
        assert_eq!(drive(false, false, true, false), PinOutput::DriveLow);
        assert_eq!(drive(false, false, false, true), PinOutput::DriveHigh);
    }

    #[test]
    fn test_resolve_shared_line() {
        use PinOutput::*;
        assert_eq!(resolve(Vec::new()), BusLevel::Floating);
        assert_eq!(resolve([Float, Float]), BusLevel::Floating);
        assert_eq!(resolve([Float, DriveHigh, Float]), BusLevel::High);
        assert_eq!(resolve([DriveLow, Float]), BusLevel::Low);
        assert_eq!(resolve([DriveLow, DriveLow]), BusLevel::Low);
        assert_eq!(resolve([DriveLow, DriveHigh]), BusLevel::Contention);
        assert_eq!(resolve([DriveLow, DriveHigh, Float]), BusLevel::Contention);
    }
}
