// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! SunSpec lookup tables.

use std::fmt;

use serde::Serialize;

// =============================================================================
// SunspecDid
// =============================================================================

/// SunSpec model identifier reported in a device's DID register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SunspecDid {
    /// 101
    SinglePhaseInverter,
    /// 102
    SplitPhaseInverter,
    /// 103
    ThreePhaseInverter,
    /// 201
    SinglePhaseMeter,
    /// 202
    SplitPhaseMeter,
    /// 203
    WyeThreePhaseMeter,
    /// 204
    DeltaThreePhaseMeter,
}

impl SunspecDid {
    /// All known identifiers.
    pub const ALL: [Self; 7] = [
        Self::SinglePhaseInverter,
        Self::SplitPhaseInverter,
        Self::ThreePhaseInverter,
        Self::SinglePhaseMeter,
        Self::SplitPhaseMeter,
        Self::WyeThreePhaseMeter,
        Self::DeltaThreePhaseMeter,
    ];

    /// Looks up an identifier by its register value.
    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|did| u64::from(did.code()) == code)
    }

    /// Register value.
    pub const fn code(&self) -> u16 {
        match self {
            Self::SinglePhaseInverter => 101,
            Self::SplitPhaseInverter => 102,
            Self::ThreePhaseInverter => 103,
            Self::SinglePhaseMeter => 201,
            Self::SplitPhaseMeter => 202,
            Self::WyeThreePhaseMeter => 203,
            Self::DeltaThreePhaseMeter => 204,
        }
    }

    /// Human-readable model name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SinglePhaseInverter => "Single Phase Inverter",
            Self::SplitPhaseInverter => "Split Phase Inverter",
            Self::ThreePhaseInverter => "Three Phase Inverter",
            Self::SinglePhaseMeter => "Single Phase Meter",
            Self::SplitPhaseMeter => "Split Phase Meter",
            Self::WyeThreePhaseMeter => "Wye 3P1N Three Phase Meter",
            Self::DeltaThreePhaseMeter => "Delta 3P Three Phase Meter",
        }
    }

    /// Returns `true` for meter models.
    pub const fn is_meter(&self) -> bool {
        self.code() >= 200
    }
}

impl fmt::Display for SunspecDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// InverterStatus
// =============================================================================

/// Operating state reported in the inverter status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InverterStatus {
    /// 0
    Undefined,
    /// 1
    Off,
    /// 2
    Sleeping,
    /// 3: starting up, waiting for the grid.
    GridMonitoring,
    /// 4: tracking the maximum power point.
    Producing,
    /// 5
    Throttled,
    /// 6
    ShuttingDown,
    /// 7
    Fault,
    /// 8
    Standby,
}

impl InverterStatus {
    const TABLE: [Self; 9] = [
        Self::Undefined,
        Self::Off,
        Self::Sleeping,
        Self::GridMonitoring,
        Self::Producing,
        Self::Throttled,
        Self::ShuttingDown,
        Self::Fault,
        Self::Standby,
    ];

    /// Looks up a status by its register value.
    pub fn from_code(code: u64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::TABLE.get(i))
            .copied()
    }

    /// Register value.
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Human-readable state name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Off => "Off",
            Self::Sleeping => "Sleeping",
            Self::GridMonitoring => "Grid Monitoring",
            Self::Producing => "Producing",
            Self::Throttled => "Producing (Throttled)",
            Self::ShuttingDown => "Shutting Down",
            Self::Fault => "Fault",
            Self::Standby => "Standby",
        }
    }
}

impl fmt::Display for InverterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_lookup() {
        assert_eq!(SunspecDid::from_code(101), Some(SunspecDid::SinglePhaseInverter));
        assert_eq!(
            SunspecDid::from_code(203).map(|d| d.name()),
            Some("Wye 3P1N Three Phase Meter")
        );
        assert!(SunspecDid::from_code(204).is_some_and(|d| d.is_meter()));
        assert!(!SunspecDid::ThreePhaseInverter.is_meter());
        assert_eq!(SunspecDid::from_code(0xFFFF), None);
    }

    #[test]
    fn test_status_lookup() {
        assert_eq!(InverterStatus::from_code(0), Some(InverterStatus::Undefined));
        assert_eq!(InverterStatus::from_code(4).map(|s| s.name()), Some("Producing"));
        assert_eq!(
            InverterStatus::from_code(5).map(|s| s.to_string()),
            Some("Producing (Throttled)".to_string())
        );
        assert_eq!(InverterStatus::Standby.code(), 8);
        assert_eq!(InverterStatus::from_code(9), None);
    }
}
