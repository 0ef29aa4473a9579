//! # WAYPOST Grid
//!
//! A simulated virtual-world grid implementing [`waypost_core::Grid`].
//!
//! ## Features
//!
//! - Replies delivered from a pool of network threads, never the caller's
//! - Latency and jitter presets, seeded for reproducible runs
//! - Reply kinds can be suppressed or delayed to force timeouts and late
//!   replies
//! - Every request is logged for inspection
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypost_grid::{SimulatedGrid, SimulationConfig, NetworkConditions};
//!
//! let grid = SimulatedGrid::with_config(SimulationConfig {
//!     network: NetworkConditions::AVERAGE,
//!     ..SimulationConfig::default()
//! });
//! grid.world().balance = 500;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod conditions;
pub mod remote;
pub mod simulated;

pub use conditions::{Jitter, NetworkConditions};
pub use remote::RemoteWorld;
pub use simulated::{GridRequest, SimulatedGrid, SimulationConfig};
