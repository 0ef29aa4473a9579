//! # WAYPOST Core
//!
//! Session state and the machinery that lets synchronous command handlers
//! work against a session that network threads update concurrently.
//!
//! ## Design Principles
//!
//! 1. **Named partitions** - session state is split into eight partitions,
//!    each behind its own lock, acquired in one global order
//! 2. **Bounded waits** - every request/reply exchange with the grid goes
//!    through the [`Bridge`] and gives up after its timeout
//! 3. **No lock across a wait** - handlers lock for local reads, local
//!    mutations and request issue only
//! 4. **Owned results** - lookups hand back copies, never references into
//!    locked state
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypost_core::{Bridge, Locator, SessionStore};
//!
//! let store = SessionStore::default();
//! let bridge = Bridge::new(grid.events().clone());
//! let locator = Locator::new(&store, grid.as_ref(), &bridge, data_timeout);
//!
//! let folder = locator.find_folder("/Objects/Furniture")?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod grid;
pub mod locator;
pub mod offers;
pub mod session;
pub mod shape;
pub mod sync;
pub mod types;

pub use error::{BridgeError, EntityKind, LocateError};
pub use grid::{EventHub, EventKind, Grid, GridEvent, Subscription};
pub use locator::{AgentReference, Locator, Reference};
pub use offers::{OfferDecision, OfferError, OfferRegistry};
pub use session::{SessionFeed, SessionStore};
pub use shape::ShapeData;
pub use sync::{Bridge, Domain, LockSet, Partition};
pub use types::{
    AssetKind, DerezDestination, InventoryType, PermissionMask, Quaternion, RegionHandle, Uuid,
    Vector3, WearableType,
};
