use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use apcmirror_core::{
    ConfigManager, LightBehavior, LightColor, ModuleEvent, ModuleId, ModuleManager, ModuleMessage,
    SurfaceUpdate,
};
use apcmirror_surface::ApcMiniModule;
use clap::Parser;

/// Mirror for the Akai APC mini control surface.
#[derive(Parser, Debug)]
#[command(name = "apcmirror")]
#[command(about = "Mirrors an APC mini and drives its LED feedback")]
struct Args {
    /// Path to the configuration file (default: config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Substring matched against MIDI port names (overrides config)
    #[arg(short, long)]
    device: Option<String>,

    /// MIDI channel to listen on, 0-15 (overrides config)
    #[arg(long)]
    channel: Option<u8>,

    /// Light behavior: "toggle" or "gate" (overrides config)
    #[arg(long, value_parser = parse_behavior)]
    behavior: Option<LightBehavior>,

    /// Color lit pads take on their first press: "green", "red" or "yellow"
    #[arg(long, value_parser = parse_color)]
    default_color: Option<LightColor>,

    /// Use the blinking variant of each LED color
    #[arg(long)]
    blink: bool,

    /// Re-assert the LED state on the device every N seconds
    #[arg(long)]
    resync_secs: Option<u64>,

    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn parse_behavior(s: &str) -> Result<LightBehavior, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "toggle" => Ok(LightBehavior::Toggle),
        "gate" => Ok(LightBehavior::Gate),
        other => Err(format!(
            "invalid behavior {other:?} (expected: \"toggle\", \"gate\")"
        )),
    }
}

fn parse_color(s: &str) -> Result<LightColor, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "green" => Ok(LightColor::Green),
        "red" => Ok(LightColor::Red),
        "yellow" => Ok(LightColor::Yellow),
        other => Err(format!(
            "invalid color {other:?} (expected: \"green\", \"red\", \"yellow\")"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let args = Args::parse();

    if args.list_ports {
        for name in ApcMiniModule::list_ports().map_err(|e| anyhow!("{e}"))? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config_manager = ConfigManager::new(args.config.clone());
    let mut settings = config_manager.load()?;

    // CLI flags win over the config file
    if let Some(device) = args.device {
        settings.midi_device = device;
    }
    if let Some(channel) = args.channel {
        settings.midi_channel = channel;
    }
    if let Some(behavior) = args.behavior {
        settings.light_behavior = behavior;
    }
    if let Some(color) = args.default_color {
        settings.default_color = color;
    }
    if args.blink {
        settings.blink = true;
    }

    ConfigManager::validate_settings(&settings)
        .map_err(|errors| anyhow!("Invalid settings: {}", errors.join(", ")))?;

    log::info!(
        "Mirroring '{}' on channel {} with {:?} lights",
        settings.midi_device,
        settings.midi_channel,
        settings.light_behavior
    );

    let mut manager = ModuleManager::new();
    manager.register_module(Box::new(ApcMiniModule::new(&settings)));
    manager.initialize().await.map_err(|e| anyhow!("{e}"))?;

    let mut messages = manager
        .take_message_receiver()
        .ok_or_else(|| anyhow!("module message receiver already taken"))?;
    manager.start().await.map_err(|e| anyhow!("{e}"))?;

    let resync_period = args
        .resync_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received, shutting down");
                break;
            }

            Some(message) = messages.recv() => {
                report(message);
            }

            _ = async {
                match resync_period {
                    Some(period) => tokio::time::sleep(period).await,
                    None => std::future::pending().await,
                }
            } => {
                if let Err(e) = manager
                    .send_to_module(ModuleId::Surface, ModuleEvent::ResyncLights)
                    .await
                {
                    log::warn!("Failed to request LED resync: {}", e);
                }
            }
        }
    }

    manager.shutdown().await.map_err(|e| anyhow!("{e}"))?;
    Ok(())
}

/// Terminal stand-in for the rendering layer: echo every local state
/// change the surface reports.
fn report(message: ModuleMessage) {
    match message {
        ModuleMessage::Event(update) => match update {
            SurfaceUpdate::ButtonState {
                control,
                pressed,
                color,
            } => {
                let action = if pressed { "press" } else { "release" };
                log::info!("{} {:?} ({:?})", action, control, color);
            }
            SurfaceUpdate::FaderState { control, value } => {
                log::info!("{:?} = {}", control, value);
            }
            SurfaceUpdate::MappingMiss { raw_id, kind } => {
                log::warn!("No control mapped to {:?} id {}", kind, raw_id);
            }
        },
        ModuleMessage::Status(status) => log::info!("{}", status),
        ModuleMessage::Error(error) => log::error!("{}", error),
    }
}
