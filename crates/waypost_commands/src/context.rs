//! # Command Context
//!
//! Everything a handler may touch, injected once and shared by every
//! dispatch worker: the session store, the grid, the reply bridge, the
//! offer registry, the permission gate and the session settings.

use crate::config::{SessionConfig, WaypostConfig};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::Params;
use crate::permissions::{Capability, GroupIdentity, PermissionGate};
use crate::rebake::RebakeScheduler;
use std::sync::Arc;
use waypost_core::{Bridge, Grid, Locator, OfferRegistry, SessionFeed, SessionStore};

/// One command call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Command name, lowercase
    pub command: String,
    /// Caller group, by name or uuid
    pub group: String,
    /// Command parameters
    pub params: Params,
}

impl Invocation {
    /// Builds an invocation.
    #[must_use]
    pub fn new(command: impl Into<String>, group: impl Into<String>, params: Params) -> Self {
        Self {
            command: command.into().to_lowercase(),
            group: group.into(),
            params,
        }
    }
}

/// Shared state handed to every handler.
pub struct CommandContext {
    /// Session state
    pub store: Arc<SessionStore>,
    /// Grid connection
    pub grid: Arc<dyn Grid>,
    /// Reply bridge over the grid's hub
    pub bridge: Bridge,
    /// Pending inventory offers
    pub offers: Arc<OfferRegistry>,
    /// Capability lookup
    pub gate: PermissionGate,
    /// Session settings
    pub session: SessionConfig,
    /// Debounced appearance rebakes
    pub rebake: RebakeScheduler,
}

impl CommandContext {
    /// Builds a context. The bridge attaches to `grid`'s hub.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        grid: Arc<dyn Grid>,
        offers: Arc<OfferRegistry>,
        config: &WaypostConfig,
    ) -> Self {
        let bridge = Bridge::new(Arc::clone(grid.events()));
        let rebake = RebakeScheduler::start(Arc::clone(&grid), config.session.rebake_delay());
        Self {
            store,
            grid,
            bridge,
            offers,
            gate: PermissionGate::new(&config.groups),
            session: config.session.clone(),
            rebake,
        }
    }

    /// Reference resolution bounded by the data timeout.
    #[must_use]
    pub fn locator(&self) -> Locator<'_> {
        Locator::new(
            &self.store,
            self.grid.as_ref(),
            &self.bridge,
            self.session.data_timeout(),
        )
    }

    /// Checks that the caller's group holds `capability`.
    pub fn authorize(
        &self,
        invocation: &Invocation,
        capability: Capability,
    ) -> CommandResult<&GroupIdentity> {
        self.gate
            .group(&invocation.group)
            .filter(|group| group.capabilities.contains(capability))
            .ok_or_else(|| {
                tracing::debug!(
                    group = %invocation.group,
                    command = %invocation.command,
                    capability = capability.name(),
                    "permission denied"
                );
                CommandError::new(ErrorCode::NoPermission)
            })
    }

    /// Primitive search radius: the `range` parameter or the default.
    #[must_use]
    pub fn range(&self, invocation: &Invocation) -> f32 {
        let range = invocation.params.parse_or("range", self.session.range);
        if range.is_finite() && range >= 0.0 {
            range
        } else {
            self.session.range
        }
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("groups", &self.gate.groups().len())
            .field("outstanding", &self.bridge.outstanding())
            .finish_non_exhaustive()
    }
}

/// A running session: the feed keeping the store current and the context
/// commands run against.
pub struct Session {
    context: Arc<CommandContext>,
    _feed: SessionFeed,
}

impl Session {
    /// Attaches the session feed to `grid`, then builds the command
    /// context. The feed subscribes first so reply side effects land in
    /// the store before any bridged call sees the reply.
    #[must_use]
    pub fn start(store: Arc<SessionStore>, grid: Arc<dyn Grid>, config: &WaypostConfig) -> Self {
        let offers = Arc::new(OfferRegistry::new());
        let feed = SessionFeed::start(
            Arc::clone(&store),
            Arc::clone(&offers),
            Arc::clone(&grid),
            config.session.offer_timeout(),
        );
        let context = Arc::new(CommandContext::new(store, grid, offers, config));
        Self {
            context,
            _feed: feed,
        }
    }

    /// The shared command context.
    #[must_use]
    pub fn context(&self) -> &Arc<CommandContext> {
        &self.context
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
