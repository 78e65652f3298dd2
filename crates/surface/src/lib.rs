//! APC mini control-surface engine.
//!
//! This crate mirrors and drives the state of an Akai APC mini:
//! - Bidirectional mapping between device note/control numbers and
//!   logical controls (clip pads, scene/mode buttons, shift, faders)
//! - Per-pad light state machine with toggle and gate behaviors
//! - MIDI transport module wiring the engine to the physical device
//!
//! # Control Layout
//!
//! ```text
//! Notes (channel messages):
//! 0-63:  8x8 clip pad grid, note = row*8 + col, row 0 at the bottom
//! 64-71: mode buttons below the grid
//! 82-89: scene buttons right of the grid, top row first
//! 98:    shift
//!
//! Control change:
//! 48-56: the nine faders
//! ```
//!
//! LED feedback goes back out as Note On messages where the velocity
//! selects the pad color.

pub mod engine;
pub mod error;
pub mod layout;
pub mod light;
pub mod module;

pub use engine::{ControlSurfaceEngine, LightSink, SurfaceConfig, SurfaceObserver};
pub use error::{DeliveryError, SurfaceError};
pub use layout::ControlLayout;
pub use module::ApcMiniModule;
