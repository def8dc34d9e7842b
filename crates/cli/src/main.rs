//! turretctl
//!
//! Drives every connected USB desk turret from the command line. Each turret
//! gets its own command sequencer; the requested action is queued on all of
//! them at once and the program exits after every queue has drained.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use common::setup_logging;
use driver::Turret;
use driver::usb::{DiscoveredTurret, find_turrets, list_turrets};
use rusb::Context as UsbContext;
use std::path::PathBuf;
use tracing::{error, info};
use turretctl::{ActionKind, TurretAction, TurretConfig};

#[derive(Parser, Debug)]
#[command(name = "turretctl")]
#[command(author, version, about = "Control USB desk turrets")]
#[command(long_about = "
Moves, fires and lights USB desk turrets. The action is sent to every
matching turret that is plugged in.

EXAMPLES:
    # Pan left for 1.5 seconds, then stop
    turretctl left 1500

    # Fire two missiles
    turretctl fire 2

    # Light on / off
    turretctl light on
    turretctl light off

    # Park every turret bottom-left
    turretctl reset

    # List matching turrets
    turretctl --list

CONFIGURATION:
    turretctl looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/rust-turret/turretctl.toml
    3. /etc/rust-turret/turretctl.toml
    4. Built-in defaults
")]
struct Args {
    /// Action to perform
    #[arg(value_enum, required_unless_present_any = ["list", "save_config"])]
    action: Option<ActionKind>,

    /// Action argument: milliseconds for moves, shot or blink count, "on" for light
    #[arg(value_name = "VALUE")]
    value: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List matching turrets and exit
    #[arg(long)]
    list: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = TurretConfig::default();
        let path = TurretConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = match args.config {
        Some(ref path) => TurretConfig::load(Some(path.clone())),
        None => TurretConfig::load_or_default(),
    }
    .context("Failed to load configuration")?;

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("turretctl v{}", env!("CARGO_PKG_VERSION"));

    let context = UsbContext::new().context("Failed to initialize USB")?;
    let known = config.known_devices()?;

    if args.list {
        return list_mode(&context, &known);
    }

    let kind = args.action.ok_or_else(|| anyhow!("No action given"))?;
    let action = TurretAction::parse(kind, args.value.as_deref())?;

    let discovered =
        find_turrets(&context, &known, config.usb_timeout()).context("Failed to find turrets")?;

    run_action(&config, discovered, action)
}

/// Print matching turrets without opening them
fn list_mode(context: &UsbContext, known: &[driver::usb::KnownDevice]) -> Result<()> {
    let turrets = list_turrets(context, known).context("Failed to enumerate USB devices")?;

    if turrets.is_empty() {
        println!("No turrets found.");
    } else {
        println!("Found {} turret(s):\n", turrets.len());
        for turret in turrets {
            println!(
                "  [{}] {} - {}",
                turret.label(),
                turret.identity,
                driver::describe(turret.family, turret.identity)
            );
        }
    }

    Ok(())
}

/// Queue `action` on every turret, then drain and release them all
fn run_action(
    config: &TurretConfig,
    discovered: Vec<DiscoveredTurret>,
    action: TurretAction,
) -> Result<()> {
    let mut turrets = Vec::with_capacity(discovered.len());
    for found in discovered {
        let label = found.info.label();
        let turret = Turret::open(
            found.transport,
            found.info.family,
            found.info.identity,
            config.sequencer_config(label.clone())?,
            config.pacing(),
        )
        .with_context(|| format!("Failed to start turret {}", label))?;
        turrets.push((label, turret));
    }

    info!("Sending {} to {} turret(s)", action, turrets.len());

    // Enqueue may block on a full queue, so each turret gets its own thread
    let failures: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = turrets
            .iter()
            .map(|(label, turret)| {
                s.spawn(move || {
                    let queued = action.apply(turret);
                    let drained = turret.shutdown();
                    queued
                        .and(drained)
                        .map_err(|e| format!("{} ({}): {}", label, turret.human_readable_name(), e))
                })
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| match handle.join() {
                Ok(Ok(())) => None,
                Ok(Err(message)) => Some(message),
                Err(_) => Some("turret thread panicked".to_string()),
            })
            .collect()
    });

    if failures.is_empty() {
        info!("Done");
        return Ok(());
    }

    for failure in &failures {
        error!("{}", failure);
    }
    Err(anyhow!("{} of {} turret(s) failed", failures.len(), turrets.len()))
}
