// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP/RTU client for APsystems ECU inverters and the meters
//! behind them.
//!
//! Registers are described by a [`Catalog`] of named fields. Fields that
//! share a batch are fetched with one contiguous read planned by
//! [`BatchPlanner`], decoded by [`codec`] (SunSpec big-endian words, with
//! "not implemented" sentinels mapped to [`Value::Absent`]) and handed out
//! as [`Readings`]. An [`Inverter`] owns its transport; the [`Meter`]s it
//! discovers borrow it.
//!
//! ```text
//!   Inverter --meters()--> Meter 1..3
//!      |   plan (BatchPlanner)   decode (codec)
//!      v
//!   RegisterClient  (attempt budget, reconnect)
//!      |
//!   Rc<RefCell<dyn Transport>>  (TCP | RTU)
//! ```
//!
//! ```rust,ignore
//! use ecu_modbus::{Inverter, TcpConfig};
//!
//! let config = TcpConfig::new("192.168.1.50").with_unit_id(1);
//! config.validate()?;
//!
//! let inverter = Inverter::tcp(config);
//! inverter.connect()?;
//! let power = inverter.read("power_ac")?;        // Absent if the ECU is silent
//! let snapshot = inverter.snapshot();            // inverter fields + "meters"
//! println!("{}", serde_json::to_string_pretty(&snapshot)?);
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod client;
pub mod codec;
pub mod device;
pub mod error;
pub mod planner;
pub mod registers;
pub mod sunspec;
pub mod types;
pub mod value;

pub use catalog::{Catalog, FieldDescriptor};
pub use client::{
    share, RegisterClient, RequestTally, RetryConfig, RetryStrategy, RtuTransport, SharedTransport,
    TcpTransport, Transport, TransportHandle, TransportState,
};
pub use device::{Device, Inverter, Meter};
pub use error::{
    ConfigurationError, ConnectionError, ConversionError, ErrorCode, ErrorSeverity, ModbusError,
    ModbusResult, OperationError, ProtocolError, TimeoutError,
};
pub use planner::{BatchPlanner, ReadBatch, RegisterSpan};
pub use sunspec::{InverterStatus, SunspecDid};
pub use types::{
    ConnectionConfig, DataBits, DataType, Parity, RegisterClass, RtuConfig, StopBits, TargetType,
    TcpConfig,
};
pub use value::{Readings, Snapshot, Value};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
