//! Pad light state machine.
//!
//! Holds the color of one button and computes transitions for the
//! configured light behavior. Pure logic; the engine forwards emitted
//! commands to the device.

use apcmirror_core::{LightBehavior, LightColor};

/// APC mini LED velocity values.
///
/// The device sets a pad's LED from the velocity byte of a Note On
/// addressed to the pad's own note number.
pub mod velocities {
    pub const OFF: u8 = 0;
    pub const GREEN: u8 = 1;
    pub const GREEN_BLINK: u8 = 2;
    pub const RED: u8 = 3;
    pub const RED_BLINK: u8 = 4;
    pub const YELLOW: u8 = 5;
    pub const YELLOW_BLINK: u8 = 6;
}

/// The velocity byte that selects `color` on the device.
///
/// `blink` picks the blinking variant of lit colors; off has no
/// blinking form.
pub fn velocity_for(color: LightColor, blink: bool) -> u8 {
    match (color, blink) {
        (LightColor::Off, _) => velocities::OFF,
        (LightColor::Green, false) => velocities::GREEN,
        (LightColor::Green, true) => velocities::GREEN_BLINK,
        (LightColor::Red, false) => velocities::RED,
        (LightColor::Red, true) => velocities::RED_BLINK,
        (LightColor::Yellow, false) => velocities::YELLOW,
        (LightColor::Yellow, true) => velocities::YELLOW_BLINK,
    }
}

/// The fixed solid-color cycle order for toggle behavior.
pub const SOLID_CYCLE: [LightColor; 4] = [
    LightColor::Off,
    LightColor::Green,
    LightColor::Red,
    LightColor::Yellow,
];

/// A press or release on a button-class control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadAction {
    Press,
    Release,
}

/// Light state for a single button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLight {
    color: LightColor,
}

impl ButtonLight {
    pub fn new() -> Self {
        Self {
            color: LightColor::Off,
        }
    }

    pub fn color(&self) -> LightColor {
        self.color
    }

    /// Apply a press/release under the given behavior.
    ///
    /// Returns the color to send to the device, or `None` when no
    /// outbound command is due.
    ///
    /// Toggle: a press from `Off` lands on the configured default color
    /// (not "next after Off in the cycle" - the two coincide for the
    /// current cycle order, but the jump-to-default rule is the
    /// authoritative one). Any other press advances the solid cycle,
    /// wrapping from yellow back to off. Release changes nothing.
    ///
    /// Gate: the light follows the button, so a press always commands
    /// the default color and a release always commands off, whatever
    /// the prior color was.
    pub fn apply(
        &mut self,
        action: PadAction,
        behavior: LightBehavior,
        default_color: LightColor,
    ) -> Option<LightColor> {
        match (behavior, action) {
            (LightBehavior::Toggle, PadAction::Press) => {
                let next = if self.color == LightColor::Off {
                    default_color
                } else {
                    next_in_cycle(self.color)
                };
                let changed = next != self.color;
                self.color = next;
                changed.then_some(next)
            }
            (LightBehavior::Toggle, PadAction::Release) => None,
            (LightBehavior::Gate, PadAction::Press) => {
                self.color = default_color;
                Some(default_color)
            }
            (LightBehavior::Gate, PadAction::Release) => {
                self.color = LightColor::Off;
                Some(LightColor::Off)
            }
        }
    }

    /// Force the light back to off (clear-all / initial state).
    pub fn reset(&mut self) {
        self.color = LightColor::Off;
    }
}

impl Default for ButtonLight {
    fn default() -> Self {
        Self::new()
    }
}

fn next_in_cycle(color: LightColor) -> LightColor {
    let position = SOLID_CYCLE
        .iter()
        .position(|&c| c == color)
        .unwrap_or(SOLID_CYCLE.len() - 1);
    SOLID_CYCLE[(position + 1) % SOLID_CYCLE.len()]
}
