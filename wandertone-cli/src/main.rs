//! Wandertone CLI — play a randomly wandering sine tone in real time.

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wandertone_engine::{CpalOutput, ToneWanderer, WanderConfig};

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    duration_sec: Option<f64>,
    sample_rate: Option<u32>,
    base_freq: Option<f64>,
    min_freq: Option<f64>,
    max_freq: Option<f64>,
    amplitude: Option<f32>,
    speed: Option<f64>,
    seed: Option<u64>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate  = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--base-freq=")   { a.base_freq    = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--min-freq=")    { a.min_freq     = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--max-freq=")    { a.max_freq     = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--amplitude=")   { a.amplitude    = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--speed=")       { a.speed        = rest.parse().ok(); continue; }
        if let Some(rest) = s.strip_prefix("--seed=")        { a.seed         = rest.parse().ok(); continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

fn list_output_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = parse_args();

    if args.list_devices {
        return list_output_devices();
    }

    let mut cfg = WanderConfig::default();
    if let Some(sr) = args.sample_rate { cfg.sample_rate = sr; }
    if let Some(f)  = args.base_freq   { cfg.base_freq   = f; }
    if let Some(f)  = args.min_freq    { cfg.min_freq    = f; }
    if let Some(f)  = args.max_freq    { cfg.max_freq    = f; }
    if let Some(a)  = args.amplitude   { cfg.amplitude   = a; }
    if let Some(v)  = args.speed       { cfg.speed       = v; }

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut wanderer =
        ToneWanderer::new(cfg, rng).context("invalid generator configuration")?;

    let duration = args.duration_sec.unwrap_or(10.0);
    println!("wandertone-cli — wandering sine player\n");
    println!("State: {:?}", wanderer.state());
    println!("Playing for {duration} seconds…");

    wanderer
        .play_for(&CpalOutput::new(), duration)
        .context("playback failed")?;

    Ok(())
}
