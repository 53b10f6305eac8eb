use crate::CoreResult;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// OS capability the dictation flow depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Synthetic keystrokes and reading the focused element.
    Accessibility,
    /// Audio capture from the default input device.
    Microphone,
}

impl Capability {
    /// Checked in this order on every press.
    pub const ALL: [Capability; 2] = [Capability::Accessibility, Capability::Microphone];

    /// Short remediation text for the user.
    pub fn remediation(self) -> &'static str {
        match self {
            Capability::Accessibility => {
                "Grant Accessibility access to Hold-Scribe in your system privacy settings, then try again."
            }
            Capability::Microphone => {
                "Grant Microphone access to Hold-Scribe in your system privacy settings, then try again."
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Accessibility => f.write_str("accessibility"),
            Capability::Microphone => f.write_str("microphone"),
        }
    }
}

/// Answer of an OS authorization query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStatus {
    /// The capability is granted.
    Authorized,
    /// The capability is refused.
    Denied,
    /// The user has not been asked yet.
    NotDetermined,
}

/// Cached knowledge about one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authorization {
    /// No OS answer recorded since start or the last invalidation.
    #[default]
    Unknown,
    /// The OS said yes.
    Granted,
    /// The OS said no, or the query failed.
    Denied,
}

/// What the gate currently knows, mutated only by OS query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionState {
    /// Accessibility authorization.
    pub accessibility_ok: Authorization,
    /// Microphone authorization.
    pub microphone_ok: Authorization,
}

impl PermissionState {
    /// Cached authorization for `capability`.
    pub fn get(&self, capability: Capability) -> Authorization {
        match capability {
            Capability::Accessibility => self.accessibility_ok,
            Capability::Microphone => self.microphone_ok,
        }
    }

    pub(crate) fn set(&mut self, capability: Capability, value: Authorization) {
        match capability {
            Capability::Accessibility => self.accessibility_ok = value,
            Capability::Microphone => self.microphone_ok = value,
        }
    }
}

/// Platform permission query surface.
///
/// Requests may show OS UI and complete later, so both calls are async.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current status without prompting.
    async fn auth_status(&self, capability: Capability) -> CoreResult<AuthStatus>;

    /// Ask the OS for access; resolves once the user has answered.
    async fn request_access(&self, capability: Capability) -> CoreResult<bool>;
}

#[async_trait]
impl<P: PermissionProvider + ?Sized> PermissionProvider for Arc<P> {
    async fn auth_status(&self, capability: Capability) -> CoreResult<AuthStatus> {
        (**self).auth_status(capability).await
    }

    async fn request_access(&self, capability: Capability) -> CoreResult<bool> {
        (**self).request_access(capability).await
    }
}
