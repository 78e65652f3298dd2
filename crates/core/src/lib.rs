pub use config::{ConfigError, ConfigManager, ConfigSchema};
pub use messages::{
    LightBehavior, LightColor, LogicalControl, MidiMessageKind, Settings, SurfaceEvent,
    SurfaceUpdate,
};
// Async module system exports
pub use modules::{AsyncModule, ModuleEvent, ModuleId, ModuleManager, ModuleMessage};

mod config;
pub mod messages;
mod modules;
