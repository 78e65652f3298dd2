//! Error types for the surface engine.

use apcmirror_core::MidiMessageKind;
use thiserror::Error;

/// An outbound light command could not be delivered to the device.
///
/// Local state is already committed when this is raised; the caller
/// treats it as a warning, not a fault, since LED state can always be
/// re-established with a resync or clear.
#[derive(Debug, Clone, Error)]
#[error("light command for note {raw_id} not delivered: {reason}")]
pub struct DeliveryError {
    pub raw_id: u8,
    pub reason: String,
}

/// Errors raised while processing surface traffic.
///
/// None of these are fatal: the engine recovers locally and keeps
/// processing subsequent events.
#[derive(Debug, Clone, Error)]
pub enum SurfaceError {
    /// A raw id outside the ranges the device defines for this message
    /// kind. Rejected explicitly rather than silently ignored.
    #[error("no control mapped to {kind:?} id {raw_id}")]
    UnknownControl { raw_id: u8, kind: MidiMessageKind },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
