//! ApcMiniModule - async module wiring the surface engine to the device.

use std::collections::HashMap;

use apcmirror_core::{
    AsyncModule, LightColor, LogicalControl, MidiMessageKind, ModuleEvent, ModuleId,
    ModuleMessage, Settings, SurfaceEvent, SurfaceUpdate,
};
use async_trait::async_trait;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tokio::sync::mpsc;

use crate::engine::{ControlSurfaceEngine, LightSink, SurfaceConfig, SurfaceObserver};
use crate::error::DeliveryError;
use crate::light::velocity_for;

/// Light sink backed by the device's MIDI output port.
///
/// An LED set on the APC mini is a Note On addressed to the control's
/// own note number, with the velocity byte selecting the color.
pub struct MidiLightSink {
    output: Option<MidiOutputConnection>,
    channel: u8,
    blink: bool,
}

impl MidiLightSink {
    pub fn new(output: Option<MidiOutputConnection>, channel: u8, blink: bool) -> Self {
        Self {
            output,
            channel,
            blink,
        }
    }
}

impl LightSink for MidiLightSink {
    fn send(&mut self, raw_id: u8, color: LightColor) -> Result<(), DeliveryError> {
        let output = self.output.as_mut().ok_or_else(|| DeliveryError {
            raw_id,
            reason: "MIDI output not connected".to_string(),
        })?;

        let message = [
            0x90 | (self.channel & 0x0F),
            raw_id,
            velocity_for(color, self.blink),
        ];
        output.send(&message).map_err(|e| DeliveryError {
            raw_id,
            reason: e.to_string(),
        })
    }
}

/// Observer forwarding local state changes up to the module manager.
struct ChannelObserver {
    tx: mpsc::Sender<ModuleMessage>,
}

impl ChannelObserver {
    fn new(tx: mpsc::Sender<ModuleMessage>) -> Self {
        Self { tx }
    }

    fn forward(&self, update: SurfaceUpdate) {
        // Use try_send to avoid blocking the event loop; if the channel
        // is full the update is dropped (acceptable for display state)
        if let Err(e) = self.tx.try_send(ModuleMessage::Event(update)) {
            tracing::debug!("Failed to forward surface update (channel full): {}", e);
        }
    }
}

impl SurfaceObserver for ChannelObserver {
    fn on_button_state(&mut self, control: LogicalControl, pressed: bool, color: LightColor) {
        self.forward(SurfaceUpdate::ButtonState {
            control,
            pressed,
            color,
        });
    }

    fn on_fader_state(&mut self, control: LogicalControl, value: u8) {
        self.forward(SurfaceUpdate::FaderState { control, value });
    }

    fn on_mapping_miss(&mut self, raw_id: u8, kind: MidiMessageKind) {
        self.forward(SurfaceUpdate::MappingMiss { raw_id, kind });
    }
}

/// APC mini controller module.
///
/// Owns the MIDI connections and runs the surface engine in a single
/// event loop, so every inbound event is processed serially.
pub struct ApcMiniModule {
    /// Substring matched against MIDI port names
    device_name: String,

    /// Engine configuration derived from settings
    config: SurfaceConfig,

    /// Use blinking color variants for LED feedback
    blink: bool,

    /// MIDI input connection
    midi_input: Option<MidiInputConnection<mpsc::UnboundedSender<Vec<u8>>>>,

    /// MIDI output connection for LED feedback
    midi_output: Option<MidiOutputConnection>,

    /// MIDI message receiver (from callback)
    midi_rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,

    /// Module status
    status: HashMap<String, String>,
}

impl ApcMiniModule {
    pub fn new(settings: &Settings) -> Self {
        Self {
            device_name: settings.midi_device.clone(),
            config: SurfaceConfig {
                channel: settings.midi_channel & 0x0F,
                behavior: settings.light_behavior,
                default_color: settings.default_color,
            },
            blink: settings.blink,
            midi_input: None,
            midi_output: None,
            midi_rx: None,
            status: HashMap::new(),
        }
    }

    /// Names of all MIDI input ports currently visible.
    pub fn list_ports() -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let midi_in = MidiInput::new("apcmirror_probe")?;
        let names = midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect();
        Ok(names)
    }

    /// Connect to the device's MIDI ports.
    ///
    /// Input is required; a missing output port degrades to input-only
    /// operation with LED feedback disabled.
    fn connect_midi(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let midi_in = MidiInput::new("apcmirror_in")?;

        let in_ports = midi_in.ports();
        let in_port = in_ports.iter().find(|p| {
            midi_in
                .port_name(p)
                .map(|n| n.contains(&self.device_name))
                .unwrap_or(false)
        });

        let in_port = match in_port {
            Some(p) => p.clone(),
            None => {
                self.status
                    .insert("midi_input".to_string(), "not_found".to_string());
                return Err(format!("MIDI input matching '{}' not found", self.device_name).into());
            }
        };

        // Channel for raw MIDI bytes from the callback thread into the
        // module loop; the single queue preserves device event order
        let (tx, rx) = mpsc::unbounded_channel();
        self.midi_rx = Some(rx);

        let connection = midi_in.connect(
            &in_port,
            "apcmirror-input",
            move |_timestamp, message, tx| {
                let _ = tx.send(message.to_vec());
            },
            tx,
        )
        .map_err(|e| e.to_string())?;

        self.midi_input = Some(connection);
        self.status
            .insert("midi_input".to_string(), "connected".to_string());

        let midi_out = MidiOutput::new("apcmirror_out")?;
        let out_ports = midi_out.ports();
        let out_port = out_ports.iter().find(|p| {
            midi_out
                .port_name(p)
                .map(|n| n.contains(&self.device_name))
                .unwrap_or(false)
        });

        if let Some(port) = out_port {
            let connection = midi_out
                .connect(port, "apcmirror-output")
                .map_err(|e| e.to_string())?;
            self.midi_output = Some(connection);
            self.status
                .insert("midi_output".to_string(), "connected".to_string());
        } else {
            self.status
                .insert("midi_output".to_string(), "not_found".to_string());
            tracing::warn!(
                "MIDI output matching '{}' not found - LED feedback disabled",
                self.device_name
            );
        }

        tracing::info!("APC mini MIDI connected");
        Ok(())
    }
}

#[async_trait]
impl AsyncModule for ApcMiniModule {
    fn id(&self) -> ModuleId {
        ModuleId::Surface
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Initializing APC mini module for '{}'", self.device_name);

        self.connect_midi()?;

        self.status
            .insert("state".to_string(), "initialized".to_string());
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("APC mini module running");
        self.status
            .insert("state".to_string(), "running".to_string());

        // Take ownership of the MIDI plumbing for the engine
        let mut midi_rx = self.midi_rx.take();
        let sink = MidiLightSink::new(self.midi_output.take(), self.config.channel, self.blink);
        let mut engine =
            ControlSurfaceEngine::new(self.config, sink, ChannelObserver::new(tx.clone()));

        // Establish a known LED state on the device
        if let Err(e) = engine.clear_all() {
            tracing::warn!("Initial LED clear not delivered: {}", e);
        }

        loop {
            tokio::select! {
                // Handle module events
                Some(event) = rx.recv() => {
                    match event {
                        ModuleEvent::Shutdown => {
                            tracing::info!("APC mini module received shutdown");
                            break;
                        }
                        ModuleEvent::ResyncLights => {
                            if let Err(e) = engine.resync() {
                                tracing::warn!("LED resync incomplete: {}", e);
                            }
                        }
                        ModuleEvent::ClearLights => {
                            if let Err(e) = engine.clear_all() {
                                tracing::warn!("LED clear incomplete: {}", e);
                            }
                        }
                    }
                }

                // Handle MIDI input
                Some(message) = async {
                    if let Some(ref mut rx) = midi_rx {
                        rx.recv().await
                    } else {
                        std::future::pending().await
                    }
                } => {
                    match SurfaceEvent::from_bytes(&message) {
                        Some(event) => {
                            if let Err(e) = engine.handle_event(event) {
                                // Local state is committed; delivery is
                                // re-established by the next resync
                                tracing::warn!("LED feedback not delivered: {}", e);
                            }
                        }
                        None => {
                            tracing::trace!(?message, "ignoring non-surface MIDI message");
                        }
                    }
                }
            }
        }

        // Leave the device dark on the way out
        if let Err(e) = engine.clear_all() {
            tracing::debug!("Shutdown LED clear not delivered: {}", e);
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Shutting down APC mini module");

        // Close connections (dropped automatically)
        self.midi_input = None;
        self.midi_output = None;
        self.midi_rx = None;

        self.status
            .insert("state".to_string(), "shutdown".to_string());
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_reads_settings() {
        let mut settings = Settings::default();
        settings.midi_channel = 3;
        settings.blink = true;

        let module = ApcMiniModule::new(&settings);
        assert_eq!(module.id(), ModuleId::Surface);
        assert_eq!(module.config.channel, 3);
        assert!(module.blink);
    }

    #[test]
    fn test_disconnected_sink_reports_delivery_error() {
        let mut sink = MidiLightSink::new(None, 0, false);
        let result = sink.send(12, LightColor::Green);
        assert!(result.is_err());
    }
}
