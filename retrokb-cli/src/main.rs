mod layout;
mod monitor;
mod simulate;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use retrokb_engine::{profiles, DeviceProfile, EngineConfig, KeyboardReport, Keycode, Tone};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retrokb-cli")]
#[command(about = "Host tools for the retro keyboard USB adapter")]
struct Cli {
    /// Show engine debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the drive x sense matrix of a keyboard
    Layout {
        /// Keyboard profile name
        #[arg(short, long, default_value = "c64")]
        device: String,
        /// Write an HTML/SVG rendering to this file instead
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Replay a key script through the engine and print what the host sees
    Simulate {
        /// Keyboard profile name
        #[arg(short, long, default_value = "c64")]
        device: String,
        /// Script file: press/release <drive> <sense>, cycle [n], wait <ms>
        script: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Print boot reports sent by a connected adapter
    Monitor {
        /// USB vendor ID (hex)
        #[arg(long, default_value = "16c0", value_parser = parse_hex16)]
        vid: u16,
        /// USB product ID (hex)
        #[arg(long, default_value = "27db", value_parser = parse_hex16)]
        pid: u16,
        /// Stop after this many reports
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

/// Engine settings, defaulting to what the firmware ships with.
#[derive(Args)]
struct Tuning {
    /// Scan cycles a new level must persist before it commits
    #[arg(long, default_value_t = EngineConfig::new().debounce_delay)]
    debounce_delay: u8,
    /// Line settling time in microseconds
    #[arg(long, default_value_t = EngineConfig::new().settle_us)]
    settle_us: u16,
    /// Milliseconds per simulated scan cycle
    #[arg(long, default_value_t = 1)]
    cycle_ms: u32,
    /// Alt-lock reminder period in milliseconds
    #[arg(long, default_value_t = EngineConfig::new().heartbeat_interval_ms)]
    heartbeat_ms: u32,
    #[arg(long, default_value_t = EngineConfig::new().heartbeat_tone.freq_hz)]
    heartbeat_hz: u16,
    #[arg(long, default_value_t = EngineConfig::new().heartbeat_tone.duration_ms)]
    heartbeat_len: u16,
    #[arg(long, default_value_t = EngineConfig::new().confirm_tone.freq_hz)]
    confirm_hz: u16,
    #[arg(long, default_value_t = EngineConfig::new().confirm_tone.duration_ms)]
    confirm_len: u16,
}

impl Tuning {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            debounce_delay: self.debounce_delay,
            settle_us: self.settle_us,
            heartbeat_interval_ms: self.heartbeat_ms,
            heartbeat_tone: Tone {
                freq_hz: self.heartbeat_hz,
                duration_ms: self.heartbeat_len,
            },
            confirm_tone: Tone {
                freq_hz: self.confirm_hz,
                duration_ms: self.confirm_len,
            },
        }
    }
}

fn parse_hex16(s: &str) -> Result<u16> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).with_context(|| format!("invalid hex ID {:?}", s))
}

fn profile(name: &str) -> Result<&'static DeviceProfile> {
    profiles::by_name(name).with_context(|| {
        let known: Vec<_> = profiles::ALL.iter().map(|p| p.name).collect();
        format!("unknown device {:?} (known: {})", name, known.join(", "))
    })
}

/// One-line human form of a boot report.
fn describe(report: &KeyboardReport) -> String {
    let mods: Vec<_> = report.mods().names().collect();
    let keys: Vec<_> = report
        .keys
        .iter()
        .filter(|&&k| k != 0)
        .map(|&k| match Keycode::from_usage(k) {
            Some(code) => code.display_name().to_string(),
            None => format!("0x{:02X}", k),
        })
        .collect();

    format!(
        "mods=[{}] keys=[{}]",
        mods.join(" "),
        keys.join(" ")
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Layout { device, html } => {
            let profile = profile(&device)?;
            match html {
                Some(path) => {
                    fs::write(&path, layout::generate_html(profile))
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", layout::render_table(profile)),
            }
        }
        Command::Simulate {
            device,
            script,
            tuning,
        } => {
            let profile = profile(&device)?;
            let text = fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let steps = simulate::parse_script(&text)
                .with_context(|| format!("parsing {}", script.display()))?;

            let mut sim = simulate::Simulator::new(profile, tuning.config(), tuning.cycle_ms)?;
            for event in sim.run(&steps)? {
                println!("{}", event);
            }
        }
        Command::Monitor { vid, pid, count } => monitor::run(vid, pid, count)?,
    }

    Ok(())
}
