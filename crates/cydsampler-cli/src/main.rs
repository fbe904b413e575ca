//! cyd-sampler - upload samples to a Novation Circuit Tracks
//!
//! Host front end for the sampler engine: detects the device over a MIDI
//! port, loads sample files into slots and sends them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use cydsampler_core::{
    list_ports, CircuitTracks, Config, FsSampleStorage, MidirPort, SampleRegistry, SlotStatus,
};

#[derive(Parser)]
#[command(name = "cyd-sampler")]
#[command(author, version, about = "Upload samples to a Novation Circuit Tracks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/cyd-sampler/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// MIDI input port name pattern
    #[arg(long, global = true)]
    input: Option<String>,

    /// MIDI output port name pattern
    #[arg(long, global = true)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
    /// List available MIDI ports
    ListPorts,
    /// Look for a Circuit Tracks on the configured ports
    Detect,
    /// Print incoming MIDI messages
    Monitor {
        /// How long to listen, in seconds
        #[arg(short, long, default_value = "10")]
        seconds: u64,
    },
    /// Load samples into slots and upload them
    Upload {
        /// Assignments as SLOT=PATH, e.g. 5=kick.wav
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(usize, PathBuf)>,
    },
    /// Query a sample slot
    Query {
        /// Slot number
        slot: usize,
    },
    /// Save the current project on the device
    Save,
}

fn parse_assignment(s: &str) -> std::result::Result<(usize, PathBuf), String> {
    let (slot, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=PATH, got '{}'", s))?;
    let slot = slot
        .trim()
        .parse()
        .map_err(|_| format!("invalid slot number '{}'", slot))?;
    if path.is_empty() {
        return Err(format!("missing path in '{}'", s));
    }
    Ok((slot, PathBuf::from(path)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config; a broken file is an error, only a missing one means defaults
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_or_default().context("loading default config file")?,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_filter()))
        .init();

    log::debug!(
        "Device: {} slots, manufacturer {}, device id {:#04X}",
        config.device.num_slots,
        config.device.manufacturer_id,
        config.device.device_id
    );

    // Apply CLI overrides
    if let Some(input) = cli.input {
        config.midi.input_port = input;
    }
    if let Some(output) = cli.output {
        config.midi.output_port = output;
    }

    match cli.command {
        Commands::Init => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
        }
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
        Commands::ListPorts => {
            let (inputs, outputs) = list_ports(&config.midi.client_name)?;
            print_ports("input", &inputs);
            print_ports("output", &outputs);
        }
        Commands::Detect => {
            let mut device = open_device(&config)?;
            if device.detect()? {
                println!("Circuit Tracks detected");
            } else {
                println!("Circuit Tracks not found");
            }
        }
        Commands::Monitor { seconds } => {
            let mut device = open_device(&config)?;
            monitor(&mut device, Duration::from_secs(seconds));
        }
        Commands::Upload { assignments } => {
            let mut device = connect(&config)?;
            let storage = FsSampleStorage::from_config(&config);
            let mut registry = SampleRegistry::from_config(&config);

            for (slot, path) in &assignments {
                if let Err(e) = registry.assign(*slot, path, &storage) {
                    log::warn!("Slot {}: cannot load {}: {}", slot, path.display(), e);
                }
            }
            log::info!("{} slot(s) queued for upload", registry.pending_count());

            if registry.pending_count() == 0 {
                bail!("No samples loaded");
            }

            let report = registry.upload_all_pending(&mut device);
            print_slots(&registry);

            if !report.is_complete() {
                log::error!("Upload pass finished with {} failure(s)", report.failed.len());
                bail!("Upload failed for slots {:?}", report.failed);
            }
            println!("Upload complete: {} slot(s)", report.uploaded.len());
        }
        Commands::Query { slot } => {
            if slot >= config.device.num_slots {
                bail!("Slot {} out of range (device has {} slots)", slot, config.device.num_slots);
            }
            let mut device = connect(&config)?;
            device.query_slot(slot)?;
            println!("Query sent for slot {}", slot);
        }
        Commands::Save => {
            let mut device = connect(&config)?;
            device.save_project()?;
            println!("Project saved");
        }
    }

    Ok(())
}

fn open_device(config: &Config) -> Result<CircuitTracks<MidirPort>> {
    let port = MidirPort::open(&config.midi.client_name, &config.midi.input_port, &config.midi.output_port)?;
    Ok(CircuitTracks::from_config(port, config))
}

/// Open the link and require a detected device
fn connect(config: &Config) -> Result<CircuitTracks<MidirPort>> {
    let mut device = open_device(config)?;
    if !device.detect()? {
        bail!("Circuit Tracks not connected");
    }
    log::info!("Circuit Tracks connected on '{}'", device.port().output_name());
    Ok(device)
}

fn monitor(device: &mut CircuitTracks<MidirPort>, duration: Duration) {
    println!(
        "Listening on '{}' for {}s...",
        device.port().input_name(),
        duration.as_secs()
    );
    let start = Instant::now();
    while start.elapsed() < duration {
        match device.read_message() {
            Some(message) => println!("{}", message),
            None => std::thread::sleep(Duration::from_millis(5)),
        }
    }
}

fn print_ports(kind: &str, ports: &[String]) {
    if ports.is_empty() {
        println!("No MIDI {} ports found", kind);
    } else {
        println!("Available MIDI {} ports:", kind);
        for (i, port) in ports.iter().enumerate() {
            println!("  [{}] {}", i, port);
        }
    }
}

fn print_slots(registry: &SampleRegistry) {
    for (index, slot) in registry.slots() {
        if slot.status() == SlotStatus::Empty {
            continue;
        }
        println!(
            "  {:>3}  {:<9} {:>8} bytes  {}",
            index,
            slot.status(),
            slot.size(),
            slot.name().unwrap_or("-")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("5=kick.wav").unwrap(), (5, PathBuf::from("kick.wav")));
        assert_eq!(
            parse_assignment("12=/sd/samples/a=b.raw").unwrap(),
            (12, PathBuf::from("/sd/samples/a=b.raw"))
        );
        assert!(parse_assignment("kick.wav").is_err());
        assert!(parse_assignment("x=kick.wav").is_err());
        assert!(parse_assignment("3=").is_err());
    }

    #[test]
    fn test_cli_parses_upload() {
        let cli = Cli::try_parse_from(["cyd-sampler", "upload", "1=a.wav", "2=b.raw", "--input", "usb"]).unwrap();
        assert_eq!(cli.input.as_deref(), Some("usb"));
        match cli.command {
            Commands::Upload { assignments } => assert_eq!(assignments.len(), 2),
            _ => panic!("Expected Upload"),
        }
    }
}
