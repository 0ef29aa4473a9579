use super::data;
use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::ResultMap;
use crate::permissions::Capability;
use waypost_core::{EventKind, GridEvent};

/// `getbalance`: asks the grid for the current balance.
pub fn get_balance(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::ECONOMY)?;
    let balance = refresh_balance(ctx)?;
    Ok(data(balance.to_string()))
}

/// Bridged balance request. The session feed records the reply in the
/// agent partition as well.
pub(crate) fn refresh_balance(ctx: &CommandContext) -> CommandResult<i64> {
    ctx.bridge
        .call(
            "balance",
            EventKind::BalanceReply,
            ctx.session.services_timeout(),
            |event| match event {
                GridEvent::BalanceReply { balance } => Some(*balance),
                _ => None,
            },
            || {
                ctx.grid.request_balance();
                None
            },
        )
        .map_err(CommandError::bridged(ErrorCode::TimeoutGettingBalance))
}
