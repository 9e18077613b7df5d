//! Capture session orchestrator - coordinates all components.
//!
//! connect → (recorder) → provision → subscribe → engage → idle → teardown.
//! An interrupt during any step skips ahead to teardown, which runs on every path.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actor_factory::{CarlaClient, EgoFactory, TeardownReport, TickSnapshot};
use anyhow::{Context, Result};
use contracts::{ActorRegistry, CaptureProfile, ContractError, FrameSink, SensorPacket};
use observability::{record_actor_destroyed, record_actor_spawned, record_tick, CaptureCounters};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{ExitReason, SessionStats};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// CARLA server host
    pub host: String,
    /// CARLA server port
    pub port: u16,
    /// Simulator request timeout
    pub timeout: Duration,
    /// Recorder file, if recording was requested
    pub record: Option<String>,
    /// Tick budget (None = until interrupted)
    pub max_ticks: Option<u64>,
    /// Vehicle and sensor rig
    pub profile: CaptureProfile,
}

/// One capture session
pub struct CaptureSession<C: CarlaClient> {
    config: SessionConfig,
    factory: EgoFactory<C>,
    sink: Arc<dyn FrameSink>,
    counters: Arc<CaptureCounters>,
}

impl<C: CarlaClient> CaptureSession<C> {
    /// Create a session that writes through `sink`
    pub fn new(config: SessionConfig, client: C, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            config,
            factory: EgoFactory::new(client),
            sink,
            counters: Arc::new(CaptureCounters::new()),
        }
    }

    /// Run until `shutdown` resolves, the tick budget is spent, or an error
    ///
    /// Actors and the recorder are torn down on every path. An error from
    /// the capture itself takes precedence over a teardown error.
    pub async fn run<S>(mut self, shutdown: S) -> Result<SessionStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let mut registry = ActorRegistry::new();

        let outcome = self.capture(&mut registry, shutdown).await;

        info!("tearing down actors...");
        let report = self.factory.teardown(&mut registry).await;
        record_teardown(&report);
        let actors_destroyed = report.destroyed.len();
        let recorder_stopped = report.recorder_stopped;
        let teardown = report.into_result();

        let (exit, ticks, last_frame) = match (outcome, teardown) {
            (Ok(progress), Ok(())) => progress,
            (Err(e), Err(teardown_err)) => {
                warn!(error = %teardown_err, "teardown also failed");
                return Err(e);
            }
            (Err(e), Ok(())) => return Err(e),
            (Ok(_), Err(e)) => return Err(e).context("Failed to tear down actors"),
        };

        Ok(SessionStats {
            exit,
            ticks,
            last_frame,
            actors_destroyed,
            recorder_stopped,
            duration: start_time.elapsed(),
            capture: self.counters.snapshot(),
        })
    }

    async fn capture<S>(
        &mut self,
        registry: &mut ActorRegistry,
        shutdown: S,
    ) -> Result<(ExitReason, u64, Option<u64>)>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        // Whatever setup registered before an interrupt is left for teardown
        let (first, mut faults) = tokio::select! {
            biased;

            _ = &mut shutdown => {
                warn!(
                    vehicle = registry.vehicle().is_some(),
                    sensors = registry.sensors().len(),
                    "Received shutdown signal during setup"
                );
                return Ok((ExitReason::Interrupted, 0, None));
            }
            started = self.start(registry) => started?,
        };

        let max_ticks = self.config.max_ticks;
        record_tick(first.frame);
        let mut ticks = 1u64;
        let mut last_frame = Some(first.frame);

        info!(
            frame = first.frame,
            max_ticks = ?max_ticks,
            sensors = registry.sensors().len(),
            "Capture running"
        );

        let exit = loop {
            if max_ticks.is_some_and(|max| ticks >= max) {
                info!(ticks, "Reached max ticks limit");
                break ExitReason::MaxTicks;
            }

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping capture...");
                    break ExitReason::Interrupted;
                }
                Some(fault) = faults.recv() => {
                    error!(error = %fault, "sensor frame could not be written");
                    return Err(fault).context("Failed to write sensor frame");
                }
                tick = self.factory.tick() => {
                    let tick = tick.context("Failed waiting for simulator tick")?;
                    record_tick(tick.frame);
                    ticks += 1;
                    last_frame = Some(tick.frame);
                }
            }
        };

        Ok((exit, ticks, last_frame))
    }

    /// Connect, provision and engage; returns the first tick and the write fault channel
    async fn start(
        &mut self,
        registry: &mut ActorRegistry,
    ) -> Result<(TickSnapshot, mpsc::UnboundedReceiver<ContractError>)> {
        let config = &self.config;

        info!(host = %config.host, port = config.port, "Connecting to CARLA server...");
        self.factory
            .connect(&config.host, config.port, config.timeout)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to CARLA at {}:{}",
                    config.host, config.port
                )
            })?;

        if let Some(path) = &config.record {
            self.factory
                .start_recording(path, registry)
                .await
                .with_context(|| format!("Failed to start recorder '{path}'"))?;
        }

        info!(blueprint = %config.profile.vehicle.blueprint, "Spawning ego vehicle...");
        let provisioned = self.factory.provision(&config.profile, registry).await;
        if registry.vehicle().is_some() {
            record_actor_spawned(actor_factory::VEHICLE_ROLE);
        }
        for _ in registry.sensors() {
            record_actor_spawned(actor_factory::SENSOR_ROLE);
        }
        provisioned.context("Failed to spawn actors")?;

        let faults = self.subscribe(registry);

        let first = self
            .factory
            .engage(registry)
            .await
            .context("Failed to engage autopilot")?;

        Ok((first, faults))
    }

    /// Listen on every registered sensor; write faults arrive on the returned channel
    fn subscribe(&self, registry: &ActorRegistry) -> mpsc::UnboundedReceiver<ContractError> {
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();

        for handle in registry.sensors() {
            let Some(source) = &handle.source else {
                warn!(sensor_id = %handle.sensor_id, "sensor has no data source, nothing will be written");
                continue;
            };

            let sink = self.sink.clone();
            let counters = self.counters.clone();
            let faults = fault_tx.clone();
            source.listen(Arc::new(move |packet: SensorPacket| {
                let started = Instant::now();
                match sink.write(&packet) {
                    Ok(_) => counters.frame_written(
                        &packet.sensor_id,
                        packet.frame,
                        started.elapsed().as_secs_f64() * 1000.0,
                    ),
                    Err(e) => {
                        counters.frame_failed(&packet.sensor_id);
                        // The receiver is gone only once the session is over
                        let _ = faults.send(e);
                    }
                }
            }));
        }

        fault_rx
    }
}

fn record_teardown(report: &TeardownReport) {
    for (role, _) in &report.destroyed {
        record_actor_destroyed(role, true);
    }
    for (role, _) in &report.failed {
        record_actor_destroyed(role, false);
    }
}
