//! EgoFactory 核心实现
//!
//! 按 CaptureProfile spawn ego 车辆及其传感器，把所有句柄登记到 ActorRegistry，
//! 并在任意退出路径上负责 teardown。

use std::time::Duration;

use contracts::{ActorId, ActorRegistry, CaptureProfile, SensorHandle, SensorProfile, Transform};
use rand::seq::IndexedRandom;
use tracing::{error, info, instrument, warn};

use crate::client::{CarlaClient, SpawnRequest, TickSnapshot};
use crate::error::{ActorFactoryError, Result};

/// Role label used for the ego vehicle in logs and metrics
pub const VEHICLE_ROLE: &str = "vehicle";

/// Role label used for sensors in logs and metrics
pub const SENSOR_ROLE: &str = "sensor";

/// Outcome of a teardown pass
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Whether an active recording was stopped
    pub recorder_stopped: bool,
    /// Destroyed actors as `(role, actor_id)`, in destroy order
    pub destroyed: Vec<(&'static str, ActorId)>,
    /// Actors whose destroy call failed
    pub failed: Vec<(&'static str, ActorId)>,
    /// First error encountered
    pub first_error: Option<ActorFactoryError>,
}

impl TeardownReport {
    fn record_error(&mut self, err: ActorFactoryError) {
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
    }

    /// `Err` with the first failure, if any
    pub fn into_result(self) -> Result<()> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Ego vehicle factory
///
/// 负责连接、spawn ego 车辆与传感器、交给 autopilot，以及 teardown。
pub struct EgoFactory<C: CarlaClient> {
    client: C,
}

impl<C: CarlaClient> EgoFactory<C> {
    /// 创建新的 EgoFactory
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// 连接 CARLA 服务器
    #[instrument(name = "ego_factory_connect", skip(self, timeout))]
    pub async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        self.client.connect(host, port, timeout).await?;
        info!(timeout_secs = timeout.as_secs_f64(), "connected to simulator");
        Ok(())
    }

    /// 启动录制，并在 registry 中登记以便 teardown 停止
    #[instrument(name = "ego_factory_start_recording", skip(self, registry))]
    pub async fn start_recording(&self, path: &str, registry: &mut ActorRegistry) -> Result<()> {
        self.client.start_recorder(path).await?;
        registry.set_recording(path);
        info!(path, "recording started");
        Ok(())
    }

    /// Spawn ego 车辆和 profile 中的全部传感器
    ///
    /// 每个 spawn 成功的 actor 立即登记到 `registry`；出错时返回错误，
    /// 已登记的 actor 留给调用方 teardown。
    ///
    /// 没有可用出生点时车辆槽位保持为空，跳过传感器挂载并返回 `Ok`。
    #[instrument(
        name = "ego_factory_provision",
        skip(self, profile, registry),
        fields(blueprint = %profile.vehicle.blueprint, sensor_count = profile.sensors.len())
    )]
    pub async fn provision(
        &self,
        profile: &CaptureProfile,
        registry: &mut ActorRegistry,
    ) -> Result<()> {
        let Some(vehicle_id) = self.spawn_vehicle(profile).await? else {
            let skipped: Vec<&str> = profile.sensors.iter().map(|s| s.id.as_str()).collect();
            warn!(?skipped, "no ego vehicle, skipping sensor attachment");
            return Ok(());
        };
        registry.set_vehicle(vehicle_id);

        for sensor in &profile.sensors {
            let handle = self.spawn_sensor(vehicle_id, sensor).await?;
            registry.register_sensor(handle);
        }

        info!(
            vehicle = vehicle_id,
            sensors = registry.sensors().len(),
            "provisioning completed"
        );
        Ok(())
    }

    /// 等待首个 tick，把观察者相机移到车辆上并开启 autopilot
    ///
    /// 没有车辆时只等待 tick。
    #[instrument(name = "ego_factory_engage", skip(self, registry))]
    pub async fn engage(&self, registry: &ActorRegistry) -> Result<TickSnapshot> {
        let tick = self.client.wait_for_tick().await?;

        if let Some(vehicle_id) = registry.vehicle() {
            let transform = self.client.actor_transform(vehicle_id).await?;
            self.client.set_spectator_transform(transform).await?;
            self.client.set_autopilot(vehicle_id, true).await?;
            info!(vehicle = vehicle_id, frame = tick.frame, "autopilot engaged");
        }

        Ok(tick)
    }

    /// 等待下一个 tick
    pub async fn tick(&self) -> Result<TickSnapshot> {
        self.client.wait_for_tick().await
    }

    /// 停止录制并销毁 registry 中的所有 actors
    ///
    /// 先停止并销毁各传感器，再销毁车辆。单个 actor 销毁失败只记录日志，
    /// 继续处理其余 actors；首个错误保存在报告中。
    ///
    /// # 幂等性
    /// 句柄从 registry 中取出，重复调用不会再访问模拟器。
    #[instrument(
        name = "ego_factory_teardown",
        skip(self, registry),
        fields(
            sensor_count = registry.sensors().len(),
            has_vehicle = registry.vehicle().is_some(),
            recording = registry.recording().is_some()
        )
    )]
    pub async fn teardown(&self, registry: &mut ActorRegistry) -> TeardownReport {
        let mut report = TeardownReport::default();
        if registry.is_empty() {
            return report;
        }
        info!("starting teardown");

        if let Some(path) = registry.take_recording() {
            match self.client.stop_recorder().await {
                Ok(()) => {
                    info!(path = %path, "recording stopped");
                    report.recorder_stopped = true;
                }
                Err(e) => {
                    error!(path = %path, error = %e, "failed to stop recorder");
                    report.record_error(e);
                }
            }
        }

        // 先销毁 sensors
        for handle in registry.take_sensors() {
            if let Some(source) = &handle.source {
                source.stop();
            }
            self.destroy_actor_safe(handle.actor_id, SENSOR_ROLE, &handle.sensor_id, &mut report)
                .await;
        }

        // 再销毁 vehicle
        if let Some(vehicle_id) = registry.take_vehicle() {
            self.destroy_actor_safe(vehicle_id, VEHICLE_ROLE, "ego", &mut report)
                .await;
        }

        info!(
            destroyed = report.destroyed.len(),
            failed = report.failed.len(),
            "teardown completed"
        );
        report
    }

    /// 安全销毁 actor（错误仅记录日志并保存到报告）
    #[instrument(
        name = "ego_factory_destroy_actor",
        skip(self, label, report),
        fields(label = %label)
    )]
    async fn destroy_actor_safe(
        &self,
        actor_id: ActorId,
        role: &'static str,
        label: &str,
        report: &mut TeardownReport,
    ) {
        info!(actor_id, label, "destroying actor");

        match self.client.destroy_actor(actor_id).await {
            Ok(()) => report.destroyed.push((role, actor_id)),
            Err(e) => {
                error!(actor_id, label, error = %e, "failed to destroy actor");
                report.failed.push((role, actor_id));
                report.record_error(e);
            }
        }
    }

    #[instrument(name = "ego_factory_spawn_vehicle", skip(self, profile))]
    async fn spawn_vehicle(&self, profile: &CaptureProfile) -> Result<Option<ActorId>> {
        let vehicle = &profile.vehicle;
        let mut request = SpawnRequest::new(&vehicle.blueprint, Transform::default())
            .with_attribute("role_name", &vehicle.role_name);

        if vehicle.random_color {
            let colors = self
                .client
                .recommended_values(&vehicle.blueprint, "color")
                .await?;
            if let Some(color) = pick(&colors) {
                info!(color = %color, "ego vehicle color");
                request = request.with_attribute("color", color);
            }
        }

        let spawn_points = self.client.spawn_points().await?;
        let Some(spawn_point) = pick(&spawn_points) else {
            warn!("could not find any spawn points");
            return Ok(None);
        };
        request.transform = *spawn_point;

        let actor_id = self
            .client
            .spawn_actor(&request)
            .await
            .map_err(|e| with_actor("ego", &vehicle.blueprint, e))?;

        info!(
            actor_id,
            x = spawn_point.location.x,
            y = spawn_point.location.y,
            "ego vehicle spawned"
        );
        Ok(Some(actor_id))
    }

    #[instrument(
        name = "ego_factory_spawn_sensor",
        skip(self, sensor),
        fields(sensor_id = %sensor.id, kind = ?sensor.kind)
    )]
    async fn spawn_sensor(&self, vehicle_id: ActorId, sensor: &SensorProfile) -> Result<SensorHandle> {
        let blueprint = sensor.kind.blueprint();
        let mut request = SpawnRequest::new(blueprint, sensor.transform).attached_to(vehicle_id);
        for (key, value) in &sensor.attributes {
            request = request.with_attribute(key, value);
        }

        let actor_id = self
            .client
            .spawn_actor(&request)
            .await
            .map_err(|e| with_actor(&sensor.id, blueprint, e))?;

        let source = self
            .client
            .sensor_source(actor_id, sensor.id.clone(), sensor.kind);
        if source.is_none() {
            warn!(actor_id, "no data source for sensor");
        }

        info!(actor_id, "sensor spawned and attached successfully");
        Ok(SensorHandle {
            sensor_id: sensor.id.clone(),
            kind: sensor.kind,
            actor_id,
            source,
        })
    }
}

/// Uniformly random element, `None` when empty
fn pick<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::rng())
}

/// Name the profile actor in spawn errors raised by the client
fn with_actor(actor: &str, blueprint: &str, err: ActorFactoryError) -> ActorFactoryError {
    match err {
        ActorFactoryError::SpawnFailed { message, .. } => {
            ActorFactoryError::spawn(actor, blueprint, message)
        }
        other => other,
    }
}
