//! Connection saturation - exhaust session slots and check whether one more gets in

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{FaultInjector, InjectionContext};
use crate::adapter::{close_bounded, connect_bounded, pool_stats_bounded, Session, TargetAdapter};
use crate::experiment::{BlastRadius, Experiment, Observation};
use crate::{Error, Result};

/// Parameters for [`ConnectionSaturationInjector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSaturationParams {
    /// Include the injector in the default registry
    pub enabled: bool,
    /// Extra sessions to open and hold
    pub max_connections: usize,
    /// How long the sessions are held before probing
    pub hold_ms: u64,
    /// Deadline for the one additional probe session
    pub probe_timeout_ms: u64,
}

impl Default for ConnectionSaturationParams {
    fn default() -> Self {
        Self {
            enabled: true,
            max_connections: 10,
            hold_ms: 2_000,
            probe_timeout_ms: 2_000,
        }
    }
}

impl ConnectionSaturationParams {
    /// Hold duration.
    #[must_use]
    pub const fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Probe deadline.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// # Errors
    /// `Error::InvalidConfig` for zero connections or a zero probe deadline.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "injectors.connection_saturation.max_connections must be greater than zero"
                    .to_string(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "injectors.connection_saturation.probe_timeout_ms must be greater than zero"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Sessions opened by an injector, released together.
///
/// Call [`HeldSessions::release_all`] on every exit path. Dropping a non-empty
/// set logs a warning because the sessions can no longer be closed.
pub struct HeldSessions<'a> {
    adapter: &'a dyn TargetAdapter,
    close_timeout: Duration,
    sessions: Vec<Session>,
}

impl<'a> HeldSessions<'a> {
    /// Empty set bound to `adapter`; each close is abandoned after `close_timeout`.
    #[must_use]
    pub fn new(adapter: &'a dyn TargetAdapter, close_timeout: Duration) -> Self {
        Self {
            adapter,
            close_timeout,
            sessions: Vec::new(),
        }
    }

    /// Take ownership of an open session.
    pub fn hold(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Number of held sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close every held session, continuing past individual close errors and timeouts.
    ///
    /// Returns how many sessions were handed to the adapter for closing.
    pub async fn release_all(&mut self) -> usize {
        let sessions = std::mem::take(&mut self.sessions);
        let count = sessions.len();
        for session in sessions {
            let id = session.id();
            if let Err(e) = close_bounded(self.adapter, session, self.close_timeout).await {
                warn!(session = id, error = %e, "failed to release held session");
            }
        }
        count
    }
}

impl std::fmt::Debug for HeldSessions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeldSessions")
            .field("close_timeout", &self.close_timeout)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Drop for HeldSessions<'_> {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            warn!(
                leaked = self.sessions.len(),
                "held sessions dropped without release"
            );
        }
    }
}

/// Opens `max_connections` sessions, holds them, probes for one more, releases all.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSaturationInjector {
    params: ConnectionSaturationParams,
}

impl ConnectionSaturationInjector {
    /// Create the injector.
    #[must_use]
    pub const fn new(params: ConnectionSaturationParams) -> Self {
        Self { params }
    }

    async fn saturate(
        &self,
        ctx: &InjectionContext<'_>,
        held: &mut HeldSessions<'_>,
        experiment: &mut Experiment,
    ) -> Result<()> {
        for _ in 0..self.params.max_connections {
            let session = connect_bounded(ctx.adapter, ctx.target, ctx.timeouts.connect()).await?;
            held.hold(session);
        }
        experiment.observe(Observation::note(format!(
            "Created {} connections",
            held.len()
        )));
        experiment.observe(Observation::count("connections_held", held.len()));

        let stats = pool_stats_bounded(ctx.adapter, ctx.session, ctx.timeouts.query()).await?;
        experiment.observe(Observation::count(
            "active_connections_during_hold",
            usize::try_from(stats.active_connections).unwrap_or(usize::MAX),
        ));

        tokio::time::sleep(self.params.hold()).await;

        match connect_bounded(ctx.adapter, ctx.target, self.params.probe_timeout()).await {
            Ok(extra) => {
                if let Err(e) = close_bounded(ctx.adapter, extra, ctx.timeouts.connect()).await {
                    warn!(error = %e, "failed to release probe session");
                }
                experiment.observe(Observation::note("Additional connection succeeded"));
                experiment.observe(Observation::count("probe_blocked", 0));
            }
            Err(e) => {
                info!(error = %e, "additional connection blocked");
                experiment.observe(Observation::note(format!(
                    "Additional connection blocked (expected): {e}"
                )));
                experiment.observe(Observation::count("probe_blocked", 1));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FaultInjector for ConnectionSaturationInjector {
    fn name(&self) -> &str {
        "Connection Saturation"
    }

    fn description(&self) -> &str {
        "Exhaust available database connections"
    }

    fn blast_radius(&self) -> BlastRadius {
        BlastRadius::ConnectionPool
    }

    async fn inject(&self, ctx: &mut InjectionContext<'_>, experiment: &mut Experiment) -> Result<()> {
        info!(
            max_connections = self.params.max_connections,
            "Saturating connection pool..."
        );
        let mut held = HeldSessions::new(ctx.adapter, ctx.timeouts.connect());
        let outcome = self.saturate(ctx, &mut held, experiment).await;
        let released = held.release_all().await;
        experiment.observe(Observation::count("connections_released", released));
        outcome
    }
}
