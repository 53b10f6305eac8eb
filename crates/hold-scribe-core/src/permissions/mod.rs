mod gate;
mod types;

pub use {
    gate::{GateDecision, PermissionGate},
    types::{AuthStatus, Authorization, Capability, PermissionProvider, PermissionState},
};
