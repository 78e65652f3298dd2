//! APC mini control layout.
//!
//! Pure, stateless translation between the device's raw identifiers and
//! logical controls, plus enumeration of the full control set for
//! engine initialization.
//!
//! # Raw id layout
//!
//! ```text
//! Note namespace:
//! Row 7 (56-63): clip pads          Scene (82)
//! Row 6 (48-55): clip pads          Scene (83)
//!   ...                               ...
//! Row 0 (0-7):   clip pads          Scene (89)
//! Mode buttons:  64-71
//! Shift:         98
//!
//! Control-change namespace:
//! Faders:        48-56
//! ```
//!
//! Rows are numbered from the bottom of the grid upward, matching the
//! device's own note numbering. The note and control-change namespaces
//! are independent; CC 48 (fader 0) and note 48 (pad row 6, col 0) do
//! not collide.

use apcmirror_core::{LogicalControl, MidiMessageKind};

use crate::error::SurfaceError;

/// APC mini layout constants and raw id translation.
pub struct ControlLayout;

impl ControlLayout {
    /// Highest clip pad note (row 7, col 7).
    pub const PAD_MAX: u8 = 63;

    /// First mode button note.
    pub const MODE_BASE: u8 = 64;
    pub const MODE_COUNT: u8 = 8;

    /// Scene button note for the top grid row; scene notes count down
    /// the grid from here.
    pub const SCENE_BASE: u8 = 82;

    /// The shift button note.
    pub const SHIFT_NOTE: u8 = 98;

    /// First fader control number (control-change namespace).
    pub const FADER_BASE: u8 = 48;
    pub const FADER_COUNT: u8 = 9;

    pub const GRID_ROWS: u8 = 8;
    pub const GRID_COLS: u8 = 8;

    /// Resolve a raw device id to a logical control.
    ///
    /// Fails with [`SurfaceError::UnknownControl`] for ids outside the
    /// defined ranges of the given namespace.
    pub fn resolve(raw_id: u8, kind: MidiMessageKind) -> Result<LogicalControl, SurfaceError> {
        match kind {
            MidiMessageKind::Note => match raw_id {
                0..=Self::PAD_MAX => Ok(LogicalControl::ClipPad {
                    row: raw_id / Self::GRID_COLS,
                    col: raw_id % Self::GRID_COLS,
                }),
                Self::MODE_BASE..=71 => Ok(LogicalControl::ModeButton {
                    index: raw_id - Self::MODE_BASE,
                }),
                Self::SCENE_BASE..=89 => Ok(LogicalControl::SceneButton {
                    row: (Self::GRID_ROWS - 1) - (raw_id - Self::SCENE_BASE),
                }),
                Self::SHIFT_NOTE => Ok(LogicalControl::Shift),
                _ => Err(SurfaceError::UnknownControl { raw_id, kind }),
            },
            MidiMessageKind::ControlChange => match raw_id {
                Self::FADER_BASE..=56 => Ok(LogicalControl::Fader {
                    index: raw_id - Self::FADER_BASE,
                }),
                _ => Err(SurfaceError::UnknownControl { raw_id, kind }),
            },
        }
    }

    /// The raw device id of a logical control.
    ///
    /// Total function and exact inverse of [`ControlLayout::resolve`].
    pub fn raw_id_of(control: LogicalControl) -> u8 {
        match control {
            LogicalControl::ClipPad { row, col } => row * Self::GRID_COLS + col,
            LogicalControl::SceneButton { row } => {
                Self::SCENE_BASE + ((Self::GRID_ROWS - 1) - row)
            }
            LogicalControl::ModeButton { index } => Self::MODE_BASE + index,
            LogicalControl::Shift => Self::SHIFT_NOTE,
            LogicalControl::Fader { index } => Self::FADER_BASE + index,
        }
    }

    /// Which identifier namespace a control lives in.
    pub fn message_kind_of(control: LogicalControl) -> MidiMessageKind {
        match control {
            LogicalControl::Fader { .. } => MidiMessageKind::ControlChange,
            _ => MidiMessageKind::Note,
        }
    }

    /// Every control on the surface: buttons, then shift, then faders.
    pub fn controls() -> Vec<LogicalControl> {
        let mut controls = Self::buttons();
        controls.push(LogicalControl::Shift);
        for index in 0..Self::FADER_COUNT {
            controls.push(LogicalControl::Fader { index });
        }
        controls
    }

    /// Every button-class control (the ones with light state), in raw id
    /// order within each group: pads, mode buttons, scene buttons.
    pub fn buttons() -> Vec<LogicalControl> {
        let mut buttons = Vec::with_capacity(80);
        for row in 0..Self::GRID_ROWS {
            for col in 0..Self::GRID_COLS {
                buttons.push(LogicalControl::ClipPad { row, col });
            }
        }
        for index in 0..Self::MODE_COUNT {
            buttons.push(LogicalControl::ModeButton { index });
        }
        for row in (0..Self::GRID_ROWS).rev() {
            buttons.push(LogicalControl::SceneButton { row });
        }
        buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_note_formula() {
        assert_eq!(
            ControlLayout::resolve(0, MidiMessageKind::Note).unwrap(),
            LogicalControl::ClipPad { row: 0, col: 0 }
        );
        assert_eq!(
            ControlLayout::resolve(63, MidiMessageKind::Note).unwrap(),
            LogicalControl::ClipPad { row: 7, col: 7 }
        );
        // Bottom-up numbering: note 8 starts the second row from the bottom
        assert_eq!(
            ControlLayout::resolve(8, MidiMessageKind::Note).unwrap(),
            LogicalControl::ClipPad { row: 1, col: 0 }
        );
    }

    #[test]
    fn test_scene_buttons_count_down_from_top_row() {
        assert_eq!(
            ControlLayout::resolve(82, MidiMessageKind::Note).unwrap(),
            LogicalControl::SceneButton { row: 7 }
        );
        assert_eq!(
            ControlLayout::resolve(89, MidiMessageKind::Note).unwrap(),
            LogicalControl::SceneButton { row: 0 }
        );
    }

    #[test]
    fn test_mode_shift_and_fader_mapping() {
        assert_eq!(
            ControlLayout::resolve(64, MidiMessageKind::Note).unwrap(),
            LogicalControl::ModeButton { index: 0 }
        );
        assert_eq!(
            ControlLayout::resolve(98, MidiMessageKind::Note).unwrap(),
            LogicalControl::Shift
        );
        assert_eq!(
            ControlLayout::resolve(48, MidiMessageKind::ControlChange).unwrap(),
            LogicalControl::Fader { index: 0 }
        );
        assert_eq!(
            ControlLayout::resolve(56, MidiMessageKind::ControlChange).unwrap(),
            LogicalControl::Fader { index: 8 }
        );
    }

    #[test]
    fn test_unmapped_ids_are_rejected() {
        // Gaps in the note namespace
        for raw_id in [72, 81, 90, 97, 99, 127, 200] {
            assert!(matches!(
                ControlLayout::resolve(raw_id, MidiMessageKind::Note),
                Err(SurfaceError::UnknownControl { .. })
            ));
        }
        // Outside the fader range
        for raw_id in [0, 47, 57, 98] {
            assert!(matches!(
                ControlLayout::resolve(raw_id, MidiMessageKind::ControlChange),
                Err(SurfaceError::UnknownControl { .. })
            ));
        }
    }

    #[test]
    fn test_raw_id_round_trip_is_a_bijection() {
        let controls = ControlLayout::controls();
        assert_eq!(controls.len(), 64 + 8 + 8 + 1 + 9);

        let mut seen_notes = std::collections::HashSet::new();
        let mut seen_ccs = std::collections::HashSet::new();

        for control in controls {
            let raw_id = ControlLayout::raw_id_of(control);
            let kind = ControlLayout::message_kind_of(control);
            assert_eq!(ControlLayout::resolve(raw_id, kind).unwrap(), control);

            // No two controls share a raw id within a namespace
            let fresh = match kind {
                MidiMessageKind::Note => seen_notes.insert(raw_id),
                MidiMessageKind::ControlChange => seen_ccs.insert(raw_id),
            };
            assert!(fresh, "duplicate raw id {} in {:?}", raw_id, kind);
        }
    }

    #[test]
    fn test_buttons_excludes_shift_and_faders() {
        let buttons = ControlLayout::buttons();
        assert_eq!(buttons.len(), 80);
        assert!(buttons.iter().all(|c| c.has_light()));
    }
}
