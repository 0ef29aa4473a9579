use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::ResultMap;
use crate::permissions::Capability;
use waypost_core::session::GroupMembership;
use waypost_core::{EventKind, GridEvent};

/// `leave`: the agent leaves the caller's group.
pub fn leave(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<ResultMap> {
    let caller = ctx.authorize(invocation, Capability::GROUP)?;
    let (group, name) = (caller.id, caller.name.clone());

    if !current_groups(ctx)?.iter().any(|m| m.id == group) {
        return Err(CommandError::with_detail(ErrorCode::GroupNotFound, name));
    }

    let left = ctx
        .bridge
        .call(
            &format!("leave:{group}"),
            EventKind::GroupLeaveReply,
            ctx.session.services_timeout(),
            move |event| match event {
                GridEvent::GroupLeaveReply {
                    group: left,
                    success,
                } if *left == group => Some(*success),
                _ => None,
            },
            || {
                ctx.grid.leave_group(group);
                None
            },
        )
        .map_err(CommandError::bridged(ErrorCode::TimeoutLeavingGroup))?;

    if !left {
        return Err(CommandError::with_detail(ErrorCode::CouldNotLeaveGroup, name));
    }
    tracing::info!(group = %name, "left group");
    Ok(ResultMap::new())
}

/// Bridged refresh of the agent's group memberships.
pub(crate) fn current_groups(ctx: &CommandContext) -> CommandResult<Vec<GroupMembership>> {
    ctx.bridge
        .call(
            "currentgroups",
            EventKind::CurrentGroups,
            ctx.session.services_timeout(),
            |event| match event {
                GridEvent::CurrentGroups { groups } => Some(groups.clone()),
                _ => None,
            },
            || {
                ctx.grid.request_current_groups();
                None
            },
        )
        .map_err(CommandError::bridged(ErrorCode::TimeoutGettingGroups))
}
