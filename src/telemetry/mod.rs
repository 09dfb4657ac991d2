// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging setup and step spans.
//!
//! The library only emits `tracing` events; the binary installs the subscriber:
//!
//! ```rust,ignore
//! use go_instrument::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```

mod init;
mod spans;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use spans::StepSpan;
