//! # Command Handlers
//!
//! Every handler follows the same shape:
//!
//! 1. authorize the caller's group for the command's capability
//! 2. read and validate parameters
//! 3. resolve references through the locator
//! 4. mutate or request under the narrowest partition lock, bridging each
//!    request/reply step separately
//! 5. fill the result map
//!
//! The first failure aborts the command. Steps already confirmed by the
//! grid are not rolled back.

mod appearance;
mod balance;
mod derez;
mod group;
mod lure;
mod offers;
mod primitive;
mod rez;
mod terrain;
mod upload;

pub use appearance::change_appearance;
pub use balance::get_balance;
pub use derez::derez;
pub use group::leave;
pub use lure::lure;
pub use offers::reply_to_inventory_offer;
pub use primitive::{
    set_primitive_scale, set_primitive_shape_data, MAXIMUM_PRIMITIVE_SIZE, MINIMUM_PRIMITIVE_SIZE,
};
pub use rez::{rez, MAXIMUM_REZ_ALTITUDE};
pub use terrain::get_terrain_height;
pub use upload::upload;

use crate::context::{CommandContext, Invocation};
use crate::error::CommandResult;
use crate::params::ResultMap;

/// Signature every command handler has.
pub type Handler = fn(&CommandContext, &Invocation) -> CommandResult<ResultMap>;

/// The command table.
pub const COMMANDS: &[(&str, Handler)] = &[
    ("getbalance", get_balance),
    ("leave", leave),
    ("lure", lure),
    ("derez", derez),
    ("rez", rez),
    ("replytoinventoryoffer", reply_to_inventory_offer),
    ("changeappearance", change_appearance),
    ("getterrainheight", get_terrain_height),
    ("setprimitivescale", set_primitive_scale),
    ("setprimitiveshapedata", set_primitive_shape_data),
    ("upload", upload),
];

/// Finds a handler by command name (case-insensitive).
#[must_use]
pub fn lookup(command: &str) -> Option<Handler> {
    let command = command.trim();
    COMMANDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(command))
        .map(|(_, handler)| *handler)
}

/// Result map with a single `data` entry.
fn data(value: impl Into<String>) -> ResultMap {
    ResultMap::from([("data".to_string(), value.into())])
}
