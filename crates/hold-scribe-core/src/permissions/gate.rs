//! Permission gate consulted before every recording.
//!
//! Queries run in a fixed sequence (accessibility, then microphone). A
//! query that errors counts as `Denied`; there is no path by which a failed
//! or missing answer becomes a grant.

use crate::permissions::{
    AuthStatus, Authorization, Capability, PermissionProvider, PermissionState,
};

use tracing::{debug, info, instrument, warn};

/// Result of running the gate for one press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Recording may proceed.
    Allowed {
        /// Capabilities that were granted by a prompt during this check.
        newly_granted: Vec<Capability>,
    },
    /// Recording must not start.
    Denied {
        /// First capability found refused.
        capability: Capability,
    },
}

/// Caching permission gate over a [`PermissionProvider`].
pub struct PermissionGate<P> {
    provider: P,
    state: PermissionState,
    /// Capabilities whose cached denial came from an explicit request.
    /// These stay denied without re-prompting until invalidated.
    refused_on_request: Vec<Capability>,
}

impl<P: PermissionProvider> PermissionGate<P> {
    /// Create a gate with nothing cached.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: PermissionState::default(),
            refused_on_request: Vec::new(),
        }
    }

    /// Snapshot of cached knowledge.
    pub fn state(&self) -> PermissionState {
        self.state
    }

    /// Query status without prompting. Errors map to `Denied`.
    #[instrument(skip(self))]
    pub async fn check_status(&self, capability: Capability) -> AuthStatus {
        match self.provider.auth_status(capability).await {
            Ok(status) => status,
            Err(e) => {
                warn!(capability = %capability, error = ?e, "Permission status query failed, treating as denied");
                AuthStatus::Denied
            }
        }
    }

    /// Prompt for access and cache the answer. Never returns `NotDetermined`.
    #[instrument(skip(self))]
    pub async fn request_status(&mut self, capability: Capability) -> AuthStatus {
        let status = match self.provider.request_access(capability).await {
            Ok(true) => AuthStatus::Authorized,
            Ok(false) => AuthStatus::Denied,
            Err(e) => {
                warn!(capability = %capability, error = ?e, "Permission request failed, treating as denied");
                AuthStatus::Denied
            }
        };

        if status == AuthStatus::Authorized {
            self.record(capability, Authorization::Granted);
        } else {
            self.record(capability, Authorization::Denied);
            self.refused_on_request.push(capability);
        }

        info!(capability = %capability, status = ?status, "Permission request resolved");
        status
    }

    /// Fresh query for a capability, updating the cache. Used to detect
    /// revocation while a session is in flight.
    #[instrument(skip(self))]
    pub async fn recheck(&mut self, capability: Capability) -> AuthStatus {
        let status = self.check_status(capability).await;
        match status {
            AuthStatus::Authorized => self.record(capability, Authorization::Granted),
            AuthStatus::Denied => self.record(capability, Authorization::Denied),
            AuthStatus::NotDetermined => self.record(capability, Authorization::Unknown),
        }
        status
    }

    /// Run every capability through the gate in sequence.
    #[instrument(skip(self))]
    pub async fn authorize(&mut self) -> GateDecision {
        let mut newly_granted = Vec::new();

        for capability in Capability::ALL {
            match self.state.get(capability) {
                Authorization::Granted => continue,
                Authorization::Denied if self.refused_on_request.contains(&capability) => {
                    debug!(capability = %capability, "Cached refusal, not prompting again");
                    return GateDecision::Denied { capability };
                }
                _ => {}
            }

            match self.check_status(capability).await {
                AuthStatus::Authorized => self.record(capability, Authorization::Granted),
                AuthStatus::Denied => {
                    self.record(capability, Authorization::Denied);
                    return GateDecision::Denied { capability };
                }
                AuthStatus::NotDetermined => match self.request_status(capability).await {
                    AuthStatus::Authorized => newly_granted.push(capability),
                    _ => return GateDecision::Denied { capability },
                },
            }
        }

        GateDecision::Allowed { newly_granted }
    }

    /// Forget cached answers, e.g. after the user changed OS settings.
    pub fn invalidate(&mut self) {
        info!("Permission cache invalidated");
        self.state = PermissionState::default();
        self.refused_on_request.clear();
    }

    fn record(&mut self, capability: Capability, value: Authorization) {
        if value != Authorization::Denied {
            self.refused_on_request.retain(|c| *c != capability);
        }
        self.state.set(capability, value);
    }
}
