//! Capture command implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actor_factory::{CarlaClient, MockCarlaClient, MockConfig};
use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{CaptureProfile, FrameSink};
use frame_sink::{reset_output_dir, FileSink, FileSinkConfig};
use tracing::info;

use crate::cli::RunArgs;
use crate::session::{CaptureSession, SessionConfig, SessionStats};

/// Execute a capture run
pub async fn run_capture(args: &RunArgs) -> Result<SessionStats> {
    let profile = load_profile(args)?;

    // Clear old frames before connecting so a failure here never leaves actors behind
    if args.keep_output {
        info!(output = %args.output_dir.display(), "Keeping existing output");
    } else {
        let removed = reset_output_dir(&args.output_dir).with_context(|| {
            format!("Failed to clear output directory {}", args.output_dir.display())
        })?;
        info!(output = %args.output_dir.display(), removed, "Output directory ready");
    }

    let sink_config = FileSinkConfig {
        base_path: args.output_dir.clone(),
    };
    let sink: Arc<dyn FrameSink> = Arc::new(
        FileSink::for_profile("disk", sink_config, &profile)
            .context("Failed to create frame sink")?,
    );

    let config = session_config(args, profile);

    if args.mock {
        info!("Running in MOCK mode (no CARLA server required)");
        return run_session(config, MockCarlaClient::with_config(MockConfig::default()), sink)
            .await;
    }

    #[cfg(feature = "real-carla")]
    {
        run_session(config, actor_factory::RealCarlaClient::new(), sink).await
    }

    #[cfg(not(feature = "real-carla"))]
    {
        let _ = (config, sink);
        anyhow::bail!("built without the `real-carla` feature; rerun with --mock")
    }
}

fn load_profile(args: &RunArgs) -> Result<CaptureProfile> {
    let profile = ConfigLoader::load(args.profile.as_deref()).with_context(|| match &args.profile {
        Some(path) => format!("Failed to load profile from {}", path.display()),
        None => "Builtin profile is invalid".to_string(),
    })?;

    info!(
        vehicle = %profile.vehicle.blueprint,
        sensors = profile.sensors.len(),
        source = args
            .profile
            .as_ref()
            .map_or_else(|| "builtin".to_string(), |p| p.display().to_string()),
        "Profile loaded"
    );
    Ok(profile)
}

fn session_config(args: &RunArgs, profile: CaptureProfile) -> SessionConfig {
    SessionConfig {
        host: args.host.clone(),
        port: args.port,
        timeout: Duration::from_secs(args.timeout),
        record: args.record.clone(),
        max_ticks: (args.max_ticks > 0).then_some(args.max_ticks),
        profile,
    }
}

async fn run_session<C: CarlaClient>(
    config: SessionConfig,
    client: C,
    sink: Arc<dyn FrameSink>,
) -> Result<SessionStats> {
    // Handlers are in place before the first simulator call
    let shutdown = shutdown_signal();
    let stats = CaptureSession::new(config, client, sink)
        .run(shutdown)
        .await?;

    info!(
        exit = %stats.exit,
        ticks = stats.ticks,
        frames = stats.capture.total_frames(),
        duration_secs = stats.duration.as_secs_f64(),
        "Capture completed"
    );
    Ok(stats)
}

/// Resolves on Ctrl+C or SIGTERM
///
/// The handlers are registered when this is called, not when the returned
/// future is first polled, so a signal that arrives in between is still
/// observed. If a handler cannot be installed that signal is never observed.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::SignalKind;

    first_signal(&[
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ])
}

/// Registers a handler for each of `kinds` now; resolves on the first delivery
#[cfg(unix)]
fn first_signal(
    kinds: &[(tokio::signal::unix::SignalKind, &'static str)],
) -> impl Future<Output = ()> + Send + 'static {
    let streams: Vec<_> = kinds
        .iter()
        .filter_map(|&(kind, name)| match tokio::signal::unix::signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::error!(error = %e, signal = name, "Failed to install signal handler");
                None
            }
        })
        .collect();

    async move {
        let mut waiting = tokio::task::JoinSet::new();
        for mut stream in streams {
            waiting.spawn(async move {
                stream.recv().await;
            });
        }
        if waiting.join_next().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

/// Resolves on Ctrl+C
#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    let ctrl_c = tokio::spawn(tokio::signal::ctrl_c());
    async move {
        match ctrl_c.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Ctrl+C handler task failed");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> RunArgs {
        let mut argv = vec!["ego-capture"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().run
    }

    #[tokio::test]
    async fn test_mock_capture_clears_and_fills_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("output");
        std::fs::create_dir_all(output.join("stale")).unwrap();
        std::fs::write(output.join("stale/old.jpg"), b"x").unwrap();

        let args = parse(&[
            "--mock",
            "--max-ticks",
            "2",
            "--output-dir",
            output.to_str().unwrap(),
        ]);
        let stats = run_capture(&args).await.unwrap();

        assert_eq!(stats.capture.total_frames(), 8);
        assert!(!output.join("stale").exists());
        for subdir in ["RGB", "LogDepth", "LIDAR", "2dSemantic"] {
            assert_eq!(std::fs::read_dir(output.join(subdir)).unwrap().count(), 2, "{subdir}");
        }
    }

    #[tokio::test]
    async fn test_reset_failure_aborts_before_connecting() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("output");
        std::fs::write(&output, b"not a directory").unwrap();

        let args = parse(&["--mock", "--output-dir", output.to_str().unwrap()]);
        let err = run_capture(&args).await.unwrap_err();
        assert!(err.to_string().contains("Failed to clear output directory"));
    }

    #[tokio::test]
    async fn test_keep_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("output");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("notes.txt"), b"keep me").unwrap();

        let args = parse(&[
            "--mock",
            "--keep-output",
            "--max-ticks",
            "1",
            "--output-dir",
            output.to_str().unwrap(),
        ]);
        run_capture(&args).await.unwrap();
        assert!(output.join("notes.txt").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_delivered_before_first_poll() {
        use tokio::signal::unix::SignalKind;

        let shutdown = first_signal(&[(SignalKind::user_defined1(), "SIGUSR1")]);
        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("signal sent before the first poll was lost");
    }

    #[test]
    fn test_session_config_from_args() {
        let args = parse(&["--timeout", "3", "--record", "ego.log"]);
        let config = session_config(&args, CaptureProfile::default());
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.record.as_deref(), Some("ego.log"));
        assert_eq!(config.max_ticks, None);
    }
}
