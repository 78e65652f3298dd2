use serde::{Deserialize, Serialize};

/// LED colors supported by the APC mini pads.
///
/// The device also understands a blinking variant of each solid color;
/// blinking is a property of the outbound command, not of the state
/// machine, so it is not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Off,
    Green,
    Red,
    Yellow,
}

/// How pad lights react to press/release events.
///
/// Chosen once at startup for the whole surface; there is no per-button
/// override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightBehavior {
    /// Each press advances the color cycle; release does nothing.
    #[default]
    Toggle,
    /// Light follows the button: default color while held, off on release.
    Gate,
}

/// The two independent identifier namespaces on the device.
///
/// Note numbers and control-change numbers may overlap numerically
/// without referring to the same control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiMessageKind {
    Note,
    ControlChange,
}

/// One physical control on the surface.
///
/// Pad rows are numbered from the bottom edge of the device upward,
/// matching the hardware's own note layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalControl {
    /// One of the 64 clip-launch pads (row 0-7, col 0-7).
    ClipPad { row: u8, col: u8 },
    /// Scene launch button to the right of a grid row (row 0-7).
    SceneButton { row: u8 },
    /// Mode button below the grid (index 0-7).
    ModeButton { index: u8 },
    /// The shift button (bottom-right corner).
    Shift,
    /// One of the nine faders (index 0-8).
    Fader { index: u8 },
}

impl LogicalControl {
    /// Whether this control has an LED the engine tracks.
    ///
    /// Faders and the shift button have no light state.
    pub fn has_light(&self) -> bool {
        matches!(
            self,
            LogicalControl::ClipPad { .. }
                | LogicalControl::SceneButton { .. }
                | LogicalControl::ModeButton { .. }
        )
    }
}

/// A decoded inbound event from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    NoteOn { note: u8, channel: u8 },
    NoteOff { note: u8, channel: u8 },
    ControlChange { control: u8, value: u8, channel: u8 },
}

impl SurfaceEvent {
    /// Decode a raw MIDI message into a surface event.
    ///
    /// Note On with velocity 0 is treated as Note Off, per MIDI
    /// convention. Messages the engine has no use for (aftertouch,
    /// pitch bend, system messages) decode to `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        let status = bytes[0] & 0xF0;
        let channel = bytes[0] & 0x0F;

        match status {
            0x90 if bytes[2] == 0 => Some(SurfaceEvent::NoteOff {
                note: bytes[1],
                channel,
            }),
            0x90 => Some(SurfaceEvent::NoteOn {
                note: bytes[1],
                channel,
            }),
            0x80 => Some(SurfaceEvent::NoteOff {
                note: bytes[1],
                channel,
            }),
            0xB0 => Some(SurfaceEvent::ControlChange {
                control: bytes[1],
                value: bytes[2],
                channel,
            }),
            _ => None,
        }
    }

    /// The MIDI channel this event arrived on.
    pub fn channel(&self) -> u8 {
        match self {
            SurfaceEvent::NoteOn { channel, .. }
            | SurfaceEvent::NoteOff { channel, .. }
            | SurfaceEvent::ControlChange { channel, .. } => *channel,
        }
    }
}

/// Local state changes reported by the surface engine.
///
/// These reflect the engine's own state, not device feedback: an update
/// is emitted even when no outbound MIDI command was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceUpdate {
    ButtonState {
        control: LogicalControl,
        pressed: bool,
        color: LightColor,
    },
    FaderState {
        control: LogicalControl,
        value: u8,
    },
    /// An inbound event referenced a raw id with no mapped control.
    MappingMiss {
        raw_id: u8,
        kind: MidiMessageKind,
    },
}

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // MIDI settings
    pub midi_device: String,
    pub midi_channel: u8,

    // Light feedback settings
    pub light_behavior: LightBehavior,
    pub default_color: LightColor,
    pub blink: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            midi_device: "APC MINI".to_string(),
            midi_channel: 0,
            light_behavior: LightBehavior::Toggle,
            default_color: LightColor::Green,
            blink: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_note_on() {
        let event = SurfaceEvent::from_bytes(&[0x90, 36, 127]);
        assert_eq!(
            event,
            Some(SurfaceEvent::NoteOn {
                note: 36,
                channel: 0
            })
        );
    }

    #[test]
    fn test_decode_note_on_zero_velocity_as_note_off() {
        let event = SurfaceEvent::from_bytes(&[0x90, 36, 0]);
        assert_eq!(
            event,
            Some(SurfaceEvent::NoteOff {
                note: 36,
                channel: 0
            })
        );
    }

    #[test]
    fn test_decode_control_change_with_channel() {
        let event = SurfaceEvent::from_bytes(&[0xB3, 48, 99]);
        assert_eq!(
            event,
            Some(SurfaceEvent::ControlChange {
                control: 48,
                value: 99,
                channel: 3
            })
        );
        assert_eq!(event.unwrap().channel(), 3);
    }

    #[test]
    fn test_decode_rejects_short_and_unknown_messages() {
        assert_eq!(SurfaceEvent::from_bytes(&[]), None);
        assert_eq!(SurfaceEvent::from_bytes(&[0x90, 36]), None);
        // Pitch bend is not a surface event
        assert_eq!(SurfaceEvent::from_bytes(&[0xE0, 0x00, 0x40]), None);
    }

    #[test]
    fn test_fader_and_shift_have_no_light() {
        assert!(!LogicalControl::Fader { index: 0 }.has_light());
        assert!(!LogicalControl::Shift.has_light());
        assert!(LogicalControl::ClipPad { row: 0, col: 0 }.has_light());
        assert!(LogicalControl::SceneButton { row: 7 }.has_light());
        assert!(LogicalControl::ModeButton { index: 3 }.has_light());
    }
}
