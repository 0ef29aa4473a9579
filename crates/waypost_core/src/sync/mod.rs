//! # Synchronization
//!
//! Named partition locks and the reply bridge.

pub mod bridge;
pub mod locks;

pub use bridge::Bridge;
pub use locks::{held_domains, Domain, LockSet, LockToken, NamedLock, Partition};
