mod channel;
mod envelope;

pub use {
    channel::{BusReceiver, BusSender, channel},
    envelope::{
        BusEvent, ControlEvent, ENVELOPE_VERSION, Envelope, LifecycleEvent, PermissionPayload,
        PressPayload,
    },
};
