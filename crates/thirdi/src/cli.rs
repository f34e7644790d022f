//! Clap derive structures for the `thirdi` CLI.
//!
//! Defines the complete command tree and global flags.

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// thirdi -- control panel for the Third-I camera, headless
#[derive(Debug, Parser)]
#[command(
    name = "thirdi",
    version,
    about = "Control a Third-I camera from the command line",
    long_about = "Talks to a Third-I camera over its REST API and media WebSockets:\n\
        query device status, join it to a WiFi network, watch the live\n\
        streams, take photos, and manage configuration and recordings.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device base URL, e.g. http://192.168.42.1
    #[arg(long, short = 'd', env = "THIRDI_DEVICE", global = true)]
    pub device: Option<String>,

    /// Talk to an in-memory simulated device instead of real hardware
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Request timeout in seconds
    #[arg(long, env = "THIRDI_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the device's current network state
    #[command(alias = "st")]
    Status,

    /// Scan for nearby WiFi networks
    #[command(alias = "net", alias = "scan")]
    Networks(NetworksArgs),

    /// Join the device to a WiFi network
    Join(JoinArgs),

    /// Revert the device to hosting its own access point
    #[command(alias = "ap")]
    Hotspot,

    /// Watch the live video/audio streams and their up/down state
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Take a still photo
    Photo,

    /// Read or change device configuration
    Config(ConfigArgs),

    /// Browse and manage recorded files
    Files(FilesArgs),

    /// Show storage occupancy
    Disk,

    /// Manage configuration presets
    Preset(PresetArgs),
}

// ── Networks ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NetworksArgs {
    /// Collapse repeated essids from overlapping access points
    #[arg(long)]
    pub dedup: bool,
}

// ── Join ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct JoinArgs {
    /// Network name to join
    pub essid: String,

    /// Network password (omit and use --ask for networks that need one)
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Prompt for the password interactively
    #[arg(long, conflicts_with = "password")]
    pub ask: bool,

    /// The network is hidden (not expected in scan results)
    #[arg(long)]
    pub hidden: bool,

    /// Give up if the join has not settled after this many seconds
    #[arg(long, default_value = "120")]
    pub settle_timeout: u64,
}

// ── Monitor ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long)]
    pub duration: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the full configuration (or one field)
    Get {
        /// Field name, e.g. video_bitrate
        field: Option<String>,
    },
    /// Apply one or more key=value changes
    Set {
        /// Changes as key=value pairs, e.g. exposure=night
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

// ── Files ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub command: FilesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// List the recorded-file tree
    Ls,
    /// Rename/move a file (paths as shown by `files ls`)
    Mv { src: String, dst: String },
    /// Delete a file
    Rm { path: String },
}

// ── Presets ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PresetArgs {
    #[command(subcommand)]
    pub command: PresetCommand,
}

#[derive(Debug, Subcommand)]
pub enum PresetCommand {
    /// List saved presets
    Ls,
    /// Save the given key=value pairs as a named preset
    Save {
        name: String,
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Delete a preset
    Rm { name: String },
}
