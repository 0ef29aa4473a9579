//! # WAYPOST Commands
//!
//! The command surface of a session: group-authenticated, capability-gated
//! handlers that read and change session state and talk to the grid.
//!
//! ## Flow
//!
//! ```text
//! key=value line ─► Params ─► Dispatcher ─► execute
//!                                             │ authenticate group
//!                                             │ look up handler
//!                                             ▼
//!                                   handler(ctx, invocation)
//!                                             │ authorize capability
//!                                             │ locate, lock, request, bridge
//!                                             ▼
//!                                   Response ─► key=value line
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypost_commands::{Dispatcher, Params, Session, WaypostConfig};
//!
//! let config = WaypostConfig::load("waypost.toml")?;
//! let session = Session::start(store, grid, &config);
//! let dispatcher = Dispatcher::start(Arc::clone(session.context()));
//!
//! let response = dispatcher.call(Params::decode("command=getbalance&group=Builders"));
//! println!("{}", response.encode());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod notifications;
pub mod params;
pub mod permissions;
pub mod rebake;

pub use config::{ConfigError, GroupConfig, SessionConfig, WaypostConfig};
pub use context::{CommandContext, Invocation, Session};
pub use dispatch::{execute, Dispatcher, Response};
pub use error::{CommandError, CommandResult, ErrorCategory, ErrorCode};
pub use notifications::{
    LanguageDetector, Notification, NotificationEmitter, NotificationKind, UnknownLanguage,
};
pub use params::{Params, ResultMap};
pub use permissions::{Capability, GroupIdentity, PermissionGate};
pub use rebake::RebakeScheduler;
