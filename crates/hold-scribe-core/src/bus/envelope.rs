//! Versioned envelopes exchanged between the privileged and UI contexts.
//!
//! On the wire every message is a JSON object with a numeric `version`, a
//! mandatory `type` discriminant, and a `payload` object:
//!
//! ```json
//! {"version":1,"type":"press-start","payload":{"requestId":"…","timestamp":1200}}
//! ```

use crate::{CoreResult, DictationError, clock::Timestamp, permissions::Capability};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

/// Wire format version understood by this build.
pub const ENVELOPE_VERSION: u16 = 1;

/// Payload shared by press edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressPayload {
    /// Hold episode identifier.
    pub request_id: Uuid,
    /// Monotonic time of the edge.
    pub timestamp: Timestamp,
}

/// Payload of permission outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionPayload {
    /// Press the decision belongs to.
    pub request_id: Uuid,
    /// When the decision was made.
    pub timestamp: Timestamp,
    /// Capability concerned.
    pub capability: Capability,
}

/// Privileged context → UI context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// Shortcut fully held and permissions allow recording.
    PressStart {
        /// Edge details.
        payload: PressPayload,
    },
    /// Shortcut released.
    PressEnd {
        /// Edge details.
        payload: PressPayload,
    },
    /// A capability was granted by a prompt during this press.
    PermissionGranted {
        /// Decision details.
        payload: PermissionPayload,
    },
    /// A capability is refused; the press must not record, or must stop.
    PermissionDenied {
        /// Decision details.
        payload: PermissionPayload,
    },
}

/// UI context → privileged context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlEvent {
    /// Drop cached permission answers so the next press queries the OS again.
    InvalidatePermissions {
        /// Decision details of the denial that prompted this.
        payload: PermissionPayload,
    },
}

/// Any message that can ride the bus.
pub trait BusEvent: Serialize + DeserializeOwned + Send + 'static {
    /// Session the message belongs to.
    fn request_id(&self) -> Uuid;
}

impl BusEvent for LifecycleEvent {
    fn request_id(&self) -> Uuid {
        match self {
            LifecycleEvent::PressStart { payload } | LifecycleEvent::PressEnd { payload } => {
                payload.request_id
            }
            LifecycleEvent::PermissionGranted { payload }
            | LifecycleEvent::PermissionDenied { payload } => payload.request_id,
        }
    }
}

impl BusEvent for ControlEvent {
    fn request_id(&self) -> Uuid {
        match self {
            ControlEvent::InvalidatePermissions { payload } => payload.request_id,
        }
    }
}

/// A message plus its wire version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<E> {
    /// Wire format version.
    pub version: u16,
    /// The message; its `type` tag is flattened into the envelope.
    #[serde(flatten)]
    pub event: E,
}

impl<E: BusEvent> Envelope<E> {
    /// Wrap a message at the current version.
    pub fn new(event: E) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            event,
        }
    }

    /// Serialize to a JSON frame.
    #[track_caller]
    pub fn encode(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| DictationError::MalformedEnvelope {
            reason: format!("Failed to encode envelope: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Validate and decode a JSON frame.
    ///
    /// The frame must be an object carrying a string `type` and the
    /// current `version`; anything else is rejected whole.
    #[track_caller]
    pub fn decode(frame: &str) -> CoreResult<Self> {
        let malformed = |reason: String| DictationError::MalformedEnvelope {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        let value: Value =
            serde_json::from_str(frame).map_err(|e| malformed(format!("Invalid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| malformed("Envelope is not an object".to_string()))?;

        match object.get("type") {
            Some(Value::String(_)) => {}
            Some(_) => return Err(malformed("Discriminant 'type' is not a string".to_string())),
            None => return Err(malformed("Missing discriminant 'type'".to_string())),
        }

        let version = object
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("Missing or non-numeric 'version'".to_string()))?;
        if version != u64::from(ENVELOPE_VERSION) {
            return Err(malformed(format!(
                "Unsupported version {} (expected {})",
                version, ENVELOPE_VERSION
            )));
        }

        serde_json::from_value(value).map_err(|e| malformed(format!("Invalid envelope: {}", e)))
    }
}
