use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::messages::SurfaceUpdate;

/// Unique identifier for each module type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    Surface,
}

/// Events that can be sent to modules
#[derive(Debug, Clone)]
pub enum ModuleEvent {
    /// Re-send the current light state of every button to the device.
    /// Local state is not mutated; this re-establishes device LEDs after
    /// a transport hiccup.
    ResyncLights,
    /// Force every button light off, on the device and locally.
    ClearLights,
    /// System events
    Shutdown,
}

/// Messages passed between modules and the module manager
#[derive(Debug)]
pub enum ModuleMessage {
    Event(SurfaceUpdate),
    Status(String),
    Error(String),
}

/// Trait that all async modules must implement
#[async_trait]
pub trait AsyncModule: Send {
    /// Get the unique identifier for this module
    fn id(&self) -> ModuleId;

    /// Initialize the module (called once at startup)
    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Start the module's main loop
    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Shutdown the module gracefully
    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Get the module's status
    fn status(&self) -> HashMap<String, String>;
}
