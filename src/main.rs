//! AtHome bridge - trace replay tool
//!
//! Drives the remote core from a line-oriented trace on stdin, using the
//! logging mock radio and input layer, and prints every event the core
//! queues for userspace as hex.
//!
//! Trace lines:
//!   adv <hex>                      advertising batch, starting at the device count
//!   connecting <mac>               transport started a connection
//!   encrypting <mac>               link encryption started
//!   connected <mac>                link is up
//!   rx <mac> <type> <hex>          packet from a remote
//!   disconnected <mac>             link is gone
//!   ctl <hex>                      control message from userspace
//!
//! Blank lines and lines starting with '#' are skipped.

use anyhow::{anyhow, bail, Context, Result};
use athome_rs::athome::constants::MIN_PROTO_VERSION;
use athome_rs::athome::{MacAddr, ProtoVersion};
use athome_rs::backend::{MockActivityIndicator, MockInputBackend, MockTransport};
use athome_rs::{AthomeManager, Config};
use log::{info, warn};
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

type Bridge = AthomeManager<MockInputBackend, MockTransport>;

fn main() -> Result<()> {
    let (config, source) = load_config(std::env::args().nth(1))?;

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    info!("=== AtHome bridge ===");
    match &source {
        Some(path) => info!("✓ Loaded configuration from {}", path.display()),
        None => info!("No configuration file, using defaults"),
    }

    let manager = AthomeManager::new(config, MockInputBackend::new(), MockTransport::new());
    manager.set_activity_indicator(Box::new(MockActivityIndicator::new()))?;

    // Versions of remotes we decided to connect to, by address
    let mut pending: HashMap<MacAddr, ProtoVersion> = HashMap::new();

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(e) = replay_line(&manager, &mut pending, line) {
            warn!("line {}: {:#}", n + 1, e);
        }
        print_events(&manager)?;
    }

    info!("Trace done");
    Ok(())
}

/// Configuration named on the command line, else configs/default.toml if
/// present, else defaults; returns the file it came from
fn load_config(arg: Option<String>) -> Result<(Config, Option<PathBuf>)> {
    let path = match arg {
        Some(path) => PathBuf::from(path),
        None if Path::new("configs/default.toml").exists() => PathBuf::from("configs/default.toml"),
        None => return Ok((Config::default(), None)),
    };
    let config = Config::load(&path).with_context(|| format!("loading {}", path.display()))?;
    Ok((config, Some(path)))
}

fn replay_line(
    manager: &Bridge,
    pending: &mut HashMap<MacAddr, ProtoVersion>,
    line: &str,
) -> Result<()> {
    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match cmd {
        "adv" => {
            let outcome = manager.handle_advertising_report(&parse_hex(&args.concat())?)?;
            if let Some(candidate) = outcome.candidate {
                pending.insert(candidate.mac, candidate.version);
            }
        }
        "connecting" => {
            let mac = parse_mac(&args)?;
            let version = pending
                .remove(&mac)
                .unwrap_or(ProtoVersion(MIN_PROTO_VERSION));
            manager.on_connecting(mac, version)?;
        }
        "encrypting" => manager.on_encrypting(parse_mac(&args)?)?,
        "connected" => manager.on_connected(parse_mac(&args)?)?,
        "disconnected" => {
            manager.on_disconnected(parse_mac(&args)?)?;
        }
        "rx" => {
            if args.len() < 2 {
                bail!("usage: rx <mac> <type> [hex]");
            }
            let mac = parse_mac(&args)?;
            let pkt_type = parse_u8(args[1])?;
            let payload = parse_hex(&args[2..].concat())?;
            manager.handle_chip_packet(&mac, pkt_type, &payload)?;
        }
        "ctl" => manager.handle_user_message(&parse_hex(&args.concat())?)?,
        other => bail!("unknown command '{}'", other),
    }
    Ok(())
}

fn print_events(manager: &Bridge) -> Result<()> {
    for event in manager.event_receiver().try_iter() {
        println!("{}", hex::encode(event.encode()?));
    }
    Ok(())
}

fn parse_mac(args: &[&str]) -> Result<MacAddr> {
    let text = args.first().ok_or_else(|| anyhow!("missing address"))?;
    text.parse().map_err(|_| anyhow!("bad address '{}'", text))
}

fn parse_u8(text: &str) -> Result<u8> {
    match text.strip_prefix("0x") {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => text.parse(),
    }
    .with_context(|| format!("bad packet type '{}'", text))
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text).with_context(|| format!("bad hex '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace_fields() {
        assert_eq!(parse_hex("0aFF").unwrap(), vec![0x0A, 0xFF]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());

        assert_eq!(parse_u8("12").unwrap(), 12);
        assert_eq!(parse_u8("0x77").unwrap(), 0x77);
        assert!(parse_u8("300").is_err());

        let mac = parse_mac(&["C1:50:40:30:20:10"]).unwrap();
        assert_eq!(mac, MacAddr([0x10, 0x20, 0x30, 0x40, 0x50, 0xC1]));
        assert!(parse_mac(&[]).is_err());
    }

    #[test]
    fn test_load_config_reports_source() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
        let arg = path.to_string_lossy().into_owned();
        let (config, source) = load_config(Some(arg)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(source, Some(path));

        assert!(load_config(Some("does/not/exist.toml".into())).is_err());
    }
}
