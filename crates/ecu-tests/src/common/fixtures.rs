// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Register images and configuration documents modelled on a real ECU.
//!
//! ```text
//! 0x9c42  common block     c_did=1, "APsystems", "QS1", "2.1.29D", serial
//! 0x9c85  inverter block   DID 101, 1.23 A, 230.1 V, 283 W, 50.00 Hz, 74565 Wh
//!                          apparent/reactive power and temperature unimplemented
//! 0x9cfc  meter 1 probe    0 (no meter) unless added
//! 0x9daa  meter 2 probe    0 (no meter) unless added
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use ecu_modbus::{Inverter, RetryConfig, RetryStrategy};

use super::mocks::ScriptedTransport;

/// Unit id used by the fixtures.
pub const UNIT_ID: u8 = 1;

/// Sentinel of signed 16-bit and scale registers.
pub const INT16_NOT_IMPLEMENTED: u16 = 0x8000;

/// Sentinel of unsigned 16-bit registers.
pub const UINT16_NOT_IMPLEMENTED: u16 = 0xFFFF;

// =============================================================================
// ECU Fixtures
// =============================================================================

/// Fixture providing ECU register images.
pub struct EcuFixtures;

impl EcuFixtures {
    /// A connected transport holding a producing single-phase inverter.
    pub fn transport() -> ScriptedTransport {
        ScriptedTransport::new()
            .connected()
            // Common block
            .holding(0x9c42, &[1, 65])
            .text(0x9c44, 16, "APsystems")
            .text(0x9c54, 16, "QS1")
            .text(0x9c6c, 8, "2.1.29D")
            .text(0x9c74, 16, "806000012345")
            .holding(0x9c84, &[1])
            // Inverter block
            .holding(0x9c85, &[101, 50])
            .holding(0x9c88, &[123, 123])
            .holding(0x9c8c, &[(-2i16) as u16])
            .holding(0x9c90, &[2301])
            .holding(0x9c93, &[(-1i16) as u16])
            .holding(0x9c94, &[283, 0])
            .holding(0x9c96, &[5000, (-2i16) as u16])
            .holding(0x9c98, &[INT16_NOT_IMPLEMENTED; 6])
            .holding(0x9c9e, &[0x0001, 0x2345, 0])
            .holding(0x9ca7, &[INT16_NOT_IMPLEMENTED])
            .holding(0x9cab, &[INT16_NOT_IMPLEMENTED, 4])
    }

    /// Adds a single-phase meter behind the first probe; the second probe
    /// reports "not implemented".
    pub fn with_first_meter(transport: ScriptedTransport) -> ScriptedTransport {
        transport
            .holding(0x9cfc, &[201])
            .holding(0x9daa, &[UINT16_NOT_IMPLEMENTED])
    }

    /// Retry budget without pauses.
    pub fn retry(attempts: u32) -> RetryConfig {
        RetryConfig::new(attempts).with_strategy(RetryStrategy::Immediate)
    }

    /// Builds an inverter over `transport`, keeping access to the recorded calls.
    pub fn inverter(transport: ScriptedTransport, attempts: u32) -> (Rc<RefCell<ScriptedTransport>>, Inverter) {
        let (handle, shared) = transport.shared();
        (handle, Inverter::new(shared, UNIT_ID, Self::retry(attempts)))
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// TCP connection in YAML.
    pub fn yaml_tcp() -> &'static str {
        r#"
connection:
  type: tcp
  host: 192.168.1.50
  port: 502
  unit_id: 1
  timeout: 2s
  retries: 3
logging:
  level: info
  format: compact
output:
  format: json
"#
    }

    /// RTU connection in TOML.
    pub fn toml_rtu() -> &'static str {
        r#"
[connection]
type = "rtu"
device = "/dev/ttyUSB0"
baud_rate = 9600
parity = "none"
stop_bits = "one"
unit_id = 2
timeout = "1s"

[logging]
level = "warn"
"#
    }

    /// TCP connection in JSON with a host placeholder.
    pub fn json_placeholder() -> &'static str {
        r#"{
  "connection": {
    "type": "tcp",
    "host": "${ECU_FIXTURE_HOST:ecu.local}",
    "retries": 5
  }
}"#
    }

    /// YAML with an unknown top-level section.
    pub fn yaml_unknown_section() -> &'static str {
        r#"
connection:
  type: tcp
  host: ecu
gateway:
  id: legacy
"#
    }
}
