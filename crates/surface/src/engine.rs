//! Control-surface engine.
//!
//! Owns the light state of every button and the value of every fader,
//! consumes decoded inbound events, and pushes LED feedback to a
//! [`LightSink`] and local state changes to a [`SurfaceObserver`].
//!
//! All mutation goes through [`ControlSurfaceEngine::handle_event`] and
//! [`ControlSurfaceEngine::clear_all`]; callers must serialize these
//! (one event at a time), since transitions read-then-write the stored
//! color. In the full system the engine lives inside a single module
//! loop, so this falls out naturally.

use std::collections::HashMap;

use apcmirror_core::{LightBehavior, LightColor, LogicalControl, MidiMessageKind, SurfaceEvent};

use crate::error::{DeliveryError, SurfaceError};
use crate::layout::ControlLayout;
use crate::light::{ButtonLight, PadAction};

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// MIDI channel the engine listens on (0-15). Traffic on other
    /// channels is discarded before any state is touched.
    pub channel: u8,
    pub behavior: LightBehavior,
    pub default_color: LightColor,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            behavior: LightBehavior::Toggle,
            default_color: LightColor::Green,
        }
    }
}

/// Outbound light commands toward the device.
///
/// Fire-and-forget: the engine never blocks on delivery and never rolls
/// back local state when a send fails.
pub trait LightSink {
    fn send(&mut self, raw_id: u8, color: LightColor) -> Result<(), DeliveryError>;
}

/// Receiver for local state changes.
///
/// Notified on every visible change whether or not an outbound MIDI
/// command was sent; the observer reflects local state, the sink
/// reflects device feedback.
pub trait SurfaceObserver {
    fn on_button_state(&mut self, control: LogicalControl, pressed: bool, color: LightColor);
    fn on_fader_state(&mut self, control: LogicalControl, value: u8);
    fn on_mapping_miss(&mut self, raw_id: u8, kind: MidiMessageKind);
}

/// The control-surface state engine.
pub struct ControlSurfaceEngine<S: LightSink, O: SurfaceObserver> {
    config: SurfaceConfig,
    lights: HashMap<LogicalControl, ButtonLight>,
    faders: [u8; ControlLayout::FADER_COUNT as usize],
    sink: S,
    observer: O,
}

impl<S: LightSink, O: SurfaceObserver> ControlSurfaceEngine<S, O> {
    /// Build an engine with one light entry per button-class control
    /// (all off) and every fader at the 63 mid-point.
    pub fn new(config: SurfaceConfig, sink: S, observer: O) -> Self {
        let lights = ControlLayout::buttons()
            .into_iter()
            .map(|control| (control, ButtonLight::new()))
            .collect();

        Self {
            config,
            lights,
            faders: [63; ControlLayout::FADER_COUNT as usize],
            sink,
            observer,
        }
    }

    /// Process one inbound event.
    ///
    /// Channel mismatches and unknown raw ids are discarded locally and
    /// never surface as errors. The only `Err` this returns is a
    /// delivery failure from the sink, raised after local state is
    /// already committed and the observer notified.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> Result<(), SurfaceError> {
        if event.channel() != self.config.channel {
            tracing::debug!(
                channel = event.channel(),
                configured = self.config.channel,
                "discarding event on foreign channel"
            );
            return Ok(());
        }

        match event {
            SurfaceEvent::NoteOn { note, .. } => self.handle_button(note, PadAction::Press),
            SurfaceEvent::NoteOff { note, .. } => self.handle_button(note, PadAction::Release),
            SurfaceEvent::ControlChange { control, value, .. } => {
                self.handle_fader(control, value)
            }
        }
    }

    fn handle_button(&mut self, note: u8, action: PadAction) -> Result<(), SurfaceError> {
        let control = match ControlLayout::resolve(note, MidiMessageKind::Note) {
            Ok(control) => control,
            Err(SurfaceError::UnknownControl { raw_id, kind }) => {
                tracing::debug!(raw_id, ?kind, "mapping miss");
                self.observer.on_mapping_miss(raw_id, kind);
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        let pressed = action == PadAction::Press;

        if control == LogicalControl::Shift {
            // Shift has no light of its own; a press clears the surface.
            self.observer
                .on_button_state(control, pressed, LightColor::Off);
            if pressed {
                return self.clear_all();
            }
            return Ok(());
        }

        let light = self
            .lights
            .get_mut(&control)
            .expect("every button-class control has a light entry");
        let command = light.apply(action, self.config.behavior, self.config.default_color);
        let color = light.color();

        self.observer.on_button_state(control, pressed, color);

        if let Some(color) = command {
            self.sink.send(note, color)?;
        }
        Ok(())
    }

    fn handle_fader(&mut self, cc: u8, value: u8) -> Result<(), SurfaceError> {
        let control = match ControlLayout::resolve(cc, MidiMessageKind::ControlChange) {
            Ok(control) => control,
            Err(SurfaceError::UnknownControl { raw_id, kind }) => {
                tracing::debug!(raw_id, ?kind, "mapping miss");
                self.observer.on_mapping_miss(raw_id, kind);
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        if let LogicalControl::Fader { index } = control {
            // Out-of-range values are clamped, not rejected
            let value = value.min(127);
            self.faders[index as usize] = value;
            self.observer.on_fader_state(control, value);
        }
        Ok(())
    }

    /// Force every button light off.
    ///
    /// One command is sent per button even when it is already off: this
    /// is an idempotent broadcast reset, not a delta. Delivery failures
    /// do not stop the broadcast; the first one is reported after every
    /// button has been handled.
    pub fn clear_all(&mut self) -> Result<(), SurfaceError> {
        let mut first_failure = None;

        for control in ControlLayout::buttons() {
            let light = self
                .lights
                .get_mut(&control)
                .expect("every button-class control has a light entry");
            light.reset();
            self.observer
                .on_button_state(control, false, LightColor::Off);

            let raw_id = ControlLayout::raw_id_of(control);
            if let Err(e) = self.sink.send(raw_id, LightColor::Off) {
                tracing::warn!(raw_id, "clear-all delivery failure: {e}");
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Re-send the current color of every button to the device without
    /// changing any local state. Used to re-establish LEDs after the
    /// transport was momentarily down.
    pub fn resync(&mut self) -> Result<(), SurfaceError> {
        let mut first_failure = None;

        for control in ControlLayout::buttons() {
            let color = self
                .lights
                .get(&control)
                .expect("every button-class control has a light entry")
                .color();
            let raw_id = ControlLayout::raw_id_of(control);
            if let Err(e) = self.sink.send(raw_id, color) {
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Current color of a button-class control.
    pub fn button_color(&self, control: LogicalControl) -> Option<LightColor> {
        self.lights.get(&control).map(|light| light.color())
    }

    /// Current value of a fader.
    pub fn fader_value(&self, index: u8) -> Option<u8> {
        self.faders.get(index as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use apcmirror_core::SurfaceUpdate;

    use super::*;

    /// Sink that records every command and can be told to fail.
    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Rc<RefCell<Vec<(u8, LightColor)>>>,
        fail: Rc<RefCell<bool>>,
    }

    impl LightSink for RecordingSink {
        fn send(&mut self, raw_id: u8, color: LightColor) -> Result<(), DeliveryError> {
            if *self.fail.borrow() {
                return Err(DeliveryError {
                    raw_id,
                    reason: "transport closed".to_string(),
                });
            }
            self.sent.borrow_mut().push((raw_id, color));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingObserver {
        updates: Rc<RefCell<Vec<SurfaceUpdate>>>,
    }

    impl SurfaceObserver for RecordingObserver {
        fn on_button_state(&mut self, control: LogicalControl, pressed: bool, color: LightColor) {
            self.updates.borrow_mut().push(SurfaceUpdate::ButtonState {
                control,
                pressed,
                color,
            });
        }

        fn on_fader_state(&mut self, control: LogicalControl, value: u8) {
            self.updates
                .borrow_mut()
                .push(SurfaceUpdate::FaderState { control, value });
        }

        fn on_mapping_miss(&mut self, raw_id: u8, kind: MidiMessageKind) {
            self.updates
                .borrow_mut()
                .push(SurfaceUpdate::MappingMiss { raw_id, kind });
        }
    }

    fn engine_with(
        config: SurfaceConfig,
    ) -> (
        ControlSurfaceEngine<RecordingSink, RecordingObserver>,
        RecordingSink,
        RecordingObserver,
    ) {
        let sink = RecordingSink::default();
        let observer = RecordingObserver::default();
        let engine = ControlSurfaceEngine::new(config, sink.clone(), observer.clone());
        (engine, sink, observer)
    }

    fn press(note: u8) -> SurfaceEvent {
        SurfaceEvent::NoteOn { note, channel: 0 }
    }

    fn release(note: u8) -> SurfaceEvent {
        SurfaceEvent::NoteOff { note, channel: 0 }
    }

    #[test]
    fn test_toggle_presses_cycle_and_releases_send_nothing() {
        let (mut engine, sink, _observer) = engine_with(SurfaceConfig::default());
        let pad = LogicalControl::ClipPad { row: 0, col: 0 };

        let mut colors = Vec::new();
        for _ in 0..5 {
            engine.handle_event(press(0)).unwrap();
            engine.handle_event(release(0)).unwrap();
            colors.push(engine.button_color(pad).unwrap());
        }

        assert_eq!(
            colors,
            vec![
                LightColor::Green,
                LightColor::Red,
                LightColor::Yellow,
                LightColor::Off,
                LightColor::Green,
            ]
        );
        // One command per press, none for the releases
        assert_eq!(sink.sent.borrow().len(), 5);
    }

    #[test]
    fn test_gate_press_release_always_sends() {
        let config = SurfaceConfig {
            behavior: LightBehavior::Gate,
            ..SurfaceConfig::default()
        };
        let (mut engine, sink, _observer) = engine_with(config);

        engine.handle_event(press(10)).unwrap();
        engine.handle_event(release(10)).unwrap();

        assert_eq!(
            *sink.sent.borrow(),
            vec![(10, LightColor::Green), (10, LightColor::Off)]
        );
        assert_eq!(
            engine.button_color(LogicalControl::ClipPad { row: 1, col: 2 }),
            Some(LightColor::Off)
        );
    }

    #[test]
    fn test_foreign_channel_is_ignored() {
        let (mut engine, sink, observer) = engine_with(SurfaceConfig::default());

        engine
            .handle_event(SurfaceEvent::NoteOn {
                note: 0,
                channel: 5,
            })
            .unwrap();
        engine
            .handle_event(SurfaceEvent::ControlChange {
                control: 48,
                value: 100,
                channel: 5,
            })
            .unwrap();

        assert!(sink.sent.borrow().is_empty());
        assert!(observer.updates.borrow().is_empty());
        assert_eq!(
            engine.button_color(LogicalControl::ClipPad { row: 0, col: 0 }),
            Some(LightColor::Off)
        );
        assert_eq!(engine.fader_value(0), Some(63));
    }

    #[test]
    fn test_unknown_note_reports_mapping_miss_and_changes_nothing() {
        let (mut engine, sink, observer) = engine_with(SurfaceConfig::default());

        engine.handle_event(press(75)).unwrap();

        assert!(sink.sent.borrow().is_empty());
        assert_eq!(
            *observer.updates.borrow(),
            vec![SurfaceUpdate::MappingMiss {
                raw_id: 75,
                kind: MidiMessageKind::Note
            }]
        );
    }

    #[test]
    fn test_fader_value_is_clamped() {
        let (mut engine, _sink, observer) = engine_with(SurfaceConfig::default());

        engine
            .handle_event(SurfaceEvent::ControlChange {
                control: 50,
                value: 200,
                channel: 0,
            })
            .unwrap();

        assert_eq!(engine.fader_value(2), Some(127));
        assert_eq!(
            *observer.updates.borrow(),
            vec![SurfaceUpdate::FaderState {
                control: LogicalControl::Fader { index: 2 },
                value: 127
            }]
        );
    }

    #[test]
    fn test_faders_ignore_light_behavior() {
        let config = SurfaceConfig {
            behavior: LightBehavior::Gate,
            ..SurfaceConfig::default()
        };
        let (mut engine, sink, _observer) = engine_with(config);

        engine
            .handle_event(SurfaceEvent::ControlChange {
                control: 48,
                value: 40,
                channel: 0,
            })
            .unwrap();

        assert_eq!(engine.fader_value(0), Some(40));
        // Fader updates are display-only; nothing goes to the device
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn test_shift_press_clears_everything() {
        let (mut engine, sink, _observer) = engine_with(SurfaceConfig::default());

        engine.handle_event(press(0)).unwrap();
        engine.handle_event(press(63)).unwrap();
        sink.sent.borrow_mut().clear();

        engine.handle_event(press(98)).unwrap();

        assert_eq!(
            engine.button_color(LogicalControl::ClipPad { row: 0, col: 0 }),
            Some(LightColor::Off)
        );
        assert_eq!(
            engine.button_color(LogicalControl::ClipPad { row: 7, col: 7 }),
            Some(LightColor::Off)
        );
        // Broadcast reset: one off command per button-class control
        assert_eq!(sink.sent.borrow().len(), 80);

        // Shift release is not a second clear
        sink.sent.borrow_mut().clear();
        engine.handle_event(release(98)).unwrap();
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn test_clear_all_is_an_idempotent_broadcast() {
        let (mut engine, sink, _observer) = engine_with(SurfaceConfig::default());

        engine.clear_all().unwrap();
        assert_eq!(sink.sent.borrow().len(), 80);
        assert!(sink
            .sent
            .borrow()
            .iter()
            .all(|&(_, color)| color == LightColor::Off));

        // A second clear sends the full broadcast again
        engine.clear_all().unwrap();
        assert_eq!(sink.sent.borrow().len(), 160);
    }

    #[test]
    fn test_delivery_failure_keeps_committed_state() {
        let (mut engine, sink, observer) = engine_with(SurfaceConfig::default());
        *sink.fail.borrow_mut() = true;

        let result = engine.handle_event(press(0));

        assert!(matches!(result, Err(SurfaceError::Delivery(_))));
        // Local state stays committed and the observer was told
        assert_eq!(
            engine.button_color(LogicalControl::ClipPad { row: 0, col: 0 }),
            Some(LightColor::Green)
        );
        assert_eq!(observer.updates.borrow().len(), 1);

        // The engine keeps processing afterwards
        *sink.fail.borrow_mut() = false;
        engine.handle_event(press(1)).unwrap();
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn test_resync_reemits_without_mutating() {
        let (mut engine, sink, _observer) = engine_with(SurfaceConfig::default());

        engine.handle_event(press(0)).unwrap();
        engine.handle_event(press(0)).unwrap(); // Red
        sink.sent.borrow_mut().clear();

        engine.resync().unwrap();

        assert_eq!(sink.sent.borrow().len(), 80);
        assert!(sink
            .sent
            .borrow()
            .contains(&(0, LightColor::Red)));
        assert_eq!(
            engine.button_color(LogicalControl::ClipPad { row: 0, col: 0 }),
            Some(LightColor::Red)
        );
    }
}
