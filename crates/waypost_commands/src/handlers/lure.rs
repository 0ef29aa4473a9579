use crate::context::{CommandContext, Invocation};
use crate::error::CommandResult;
use crate::params::ResultMap;
use crate::permissions::Capability;
use waypost_core::{AgentReference, Uuid};

/// `lure`: invites an agent, named by `agent` or by `firstname` and
/// `lastname`, to teleport to us.
pub fn lure(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::MOVEMENT)?;
    let params = &invocation.params;

    let reference = match params.get("agent").and_then(|a| a.trim().parse::<Uuid>().ok()) {
        Some(id) => AgentReference::Id(id),
        None => AgentReference::Name {
            first: params.get("firstname").unwrap_or_default(),
            last: params.get("lastname").unwrap_or_default(),
        },
    };
    let agent = ctx.locator().find_agent(reference)?;
    let message = params.get("message").unwrap_or_default();

    ctx.store
        .agent
        .read(|_| ctx.grid.send_teleport_lure(agent, message));
    Ok(ResultMap::new())
}
