//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ego capture - drive one CARLA vehicle and record its sensors to disk
#[derive(Parser, Debug)]
#[command(
    name = "ego-capture",
    author,
    version,
    about = "CARLA ego vehicle sensor capture",
    long_about = "Spawns an autopilot ego vehicle in a running CARLA server, attaches RGB, depth,\n\
                  LIDAR and semantic segmentation sensors, and writes every sensor frame\n\
                  to disk until interrupted.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "EGO_CAPTURE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "EGO_CAPTURE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "EGO_CAPTURE_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands; without one the capture runs
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a capture profile without connecting
    Validate(ValidateArgs),

    /// Print the effective capture profile
    Profile(ProfileArgs),
}

/// Arguments for a capture run
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// IP of the host server
    #[arg(long, default_value = "127.0.0.1", env = "CARLA_HOST")]
    pub host: String,

    /// TCP port to listen to
    #[arg(short, long, default_value = "2000", env = "CARLA_PORT")]
    pub port: u16,

    /// Directory that receives the per-sensor frame folders
    #[arg(short, long, default_value = "./output", env = "EGO_CAPTURE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Keep existing files in the output directory instead of clearing it
    #[arg(long)]
    pub keep_output: bool,

    /// Capture profile (TOML or JSON); the builtin profile is used if omitted
    #[arg(long, env = "EGO_CAPTURE_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Start the simulator recorder, writing to this file on the server
    #[arg(long, value_name = "FILE")]
    pub record: Option<String>,

    /// Simulator request timeout in seconds
    #[arg(long, default_value = "10", env = "EGO_CAPTURE_TIMEOUT")]
    pub timeout: u64,

    /// Stop after this many simulator ticks (0 = until interrupted)
    #[arg(long, default_value = "0", env = "EGO_CAPTURE_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run against the in-process mock simulator
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the capture profile to validate
    #[arg(long)]
    pub profile: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `profile` command
#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Profile to load instead of the builtin one
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Output as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ego-capture"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.host, "127.0.0.1");
        assert_eq!(cli.run.port, 2000);
        assert_eq!(cli.run.output_dir, PathBuf::from("./output"));
        assert_eq!(cli.run.timeout, 10);
        assert_eq!(cli.run.max_ticks, 0);
        assert_eq!(cli.metrics_port, 0);
        assert!(!cli.run.mock);
    }

    #[test]
    fn test_host_and_port() {
        let cli =
            Cli::try_parse_from(["ego-capture", "--host", "10.0.0.5", "-p", "3000", "--mock"])
                .unwrap();
        assert_eq!(cli.run.host, "10.0.0.5");
        assert_eq!(cli.run.port, 3000);
        assert!(cli.run.mock);
    }

    #[test]
    fn test_validate_subcommand() {
        let cli = Cli::try_parse_from(["ego-capture", "validate", "--profile", "rig.toml"]).unwrap();
        match cli.command {
            Some(Commands::Validate(args)) => assert_eq!(args.profile, PathBuf::from("rig.toml")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["ego-capture", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["ego-capture", "--port", "70000"]).is_err());
    }
}
