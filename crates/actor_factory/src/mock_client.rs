//! Mock CARLA 客户端
//!
//! 用于单元测试和 `--mock` 运行的进程内模拟器，支持注入失败场景。
//! 每次 `wait_for_tick` 推进一帧，并向所有正在监听的 mock 传感器各推送一帧数据。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use contracts::{ActorId, Location, Rotation, SensorKind, SensorSource, Transform};
use tracing::{debug, instrument};

use crate::client::{CarlaClient, SpawnRequest, TickSnapshot};
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{MockSensor, MockSensorConfig};

/// 第一个分配的 actor ID，便于在日志中识别
const FIRST_ACTOR_ID: ActorId = 1000;

/// Mock 客户端配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 地图推荐的 spawn points（为空时模拟“无可用出生点”）
    pub spawn_points: Vec<Transform>,
    /// 车辆 `color` 属性的推荐值
    pub colors: Vec<String>,
    /// 连接失败
    pub fail_connect: bool,
    /// 在 blueprint library 中不存在的蓝图
    pub missing_blueprints: Vec<String>,
    /// spawn 时失败的蓝图
    pub fail_blueprints: Vec<String>,
    /// 应该失败的 destroy actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 到达该帧时 `wait_for_tick` 返回错误
    pub fail_tick_at: Option<u64>,
    /// 每个 tick 之间的真实等待时间
    pub tick_interval: Duration,
    /// 每次 spawn 前的真实等待时间
    pub spawn_latency: Duration,
    /// 每个 tick 推进的仿真时间（秒）
    pub delta_seconds: f64,
    /// mock 传感器配置
    pub sensor: MockSensorConfig,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            spawn_points: vec![
                Transform::new(
                    Location {
                        x: -48.8,
                        y: 24.9,
                        z: 0.6,
                    },
                    Rotation {
                        yaw: 90.0,
                        ..Default::default()
                    },
                ),
                Transform::at(106.4, -2.0, 0.6),
                Transform::at(-9.5, 130.2, 0.6),
            ],
            colors: vec![
                "17,37,103".to_string(),
                "255,255,255".to_string(),
                "220,20,60".to_string(),
            ],
            fail_connect: false,
            missing_blueprints: Vec::new(),
            fail_blueprints: Vec::new(),
            fail_destroy: Vec::new(),
            fail_tick_at: None,
            tick_interval: Duration::from_millis(50),
            spawn_latency: Duration::ZERO,
            delta_seconds: 0.05,
            sensor: MockSensorConfig::default(),
        }
    }
}

/// 一次客户端调用（仅记录会改变模拟器状态的调用）
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Connect { host: String, port: u16 },
    StartRecorder(String),
    StopRecorder,
    Spawn {
        blueprint: String,
        parent: Option<ActorId>,
    },
    SetAutopilot { vehicle_id: ActorId, enabled: bool },
    SetSpectator(Transform),
    Tick,
    Destroy(ActorId),
}

/// 已创建的 mock actor
#[derive(Debug, Clone, PartialEq)]
pub struct MockActor {
    pub blueprint: String,
    pub attributes: BTreeMap<String, String>,
    pub transform: Transform,
    pub parent: Option<ActorId>,
}

#[derive(Default)]
struct MockState {
    connected: bool,
    next_actor_id: ActorId,
    actors: HashMap<ActorId, MockActor>,
    sensors: HashMap<ActorId, MockSensor>,
    autopilot: HashSet<ActorId>,
    recorder: Option<String>,
    spectator: Option<Transform>,
    frame: u64,
    calls: Vec<MockCall>,
}

/// Mock CARLA 客户端
///
/// `Clone` 得到共享同一模拟器状态的句柄，测试可以在 factory 持有客户端时继续观察状态。
#[derive(Clone)]
pub struct MockCarlaClient {
    /// 配置（可注入失败场景）
    config: MockConfig,
    state: Arc<Mutex<MockState>>,
}

impl MockCarlaClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MockState {
                next_actor_id: FIRST_ACTOR_ID,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn connected_state(&self) -> Result<MutexGuard<'_, MockState>> {
        let state = self.state();
        if state.connected {
            Ok(state)
        } else {
            Err(ActorFactoryError::connection("not connected"))
        }
    }

    /// 所有状态变更调用，按调用顺序
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// 获取当前存活的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.state().actors.len()
    }

    /// 获取所有存活的 actor IDs（升序）
    pub fn alive_actor_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<_> = self.state().actors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// 查询单个 actor
    pub fn actor(&self, actor_id: ActorId) -> Option<MockActor> {
        self.state().actors.get(&actor_id).cloned()
    }

    /// 车辆是否处于 autopilot
    pub fn autopilot_enabled(&self, vehicle_id: ActorId) -> bool {
        self.state().autopilot.contains(&vehicle_id)
    }

    /// 正在录制的文件路径
    pub fn recorder_path(&self) -> Option<String> {
        self.state().recorder.clone()
    }

    /// 观察者相机的当前位姿
    pub fn spectator(&self) -> Option<Transform> {
        self.state().spectator
    }

    /// 当前帧号
    pub fn frame(&self) -> u64 {
        self.state().frame
    }

    /// 正在监听的 mock 传感器数量
    pub fn listening_sensors(&self) -> usize {
        self.state()
            .sensors
            .values()
            .filter(|s| s.is_listening())
            .count()
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::Connect {
            host: host.to_string(),
            port,
        });
        if self.config.fail_connect {
            return Err(ActorFactoryError::connection(format!(
                "{host}:{port} unreachable within {timeout:?}"
            )));
        }
        state.connected = true;
        Ok(())
    }

    #[instrument(name = "mock_carla_start_recorder", skip(self))]
    async fn start_recorder(&self, path: &str) -> Result<()> {
        let mut state = self.connected_state()?;
        state.calls.push(MockCall::StartRecorder(path.to_string()));
        state.recorder = Some(path.to_string());
        Ok(())
    }

    #[instrument(name = "mock_carla_stop_recorder", skip(self))]
    async fn stop_recorder(&self) -> Result<()> {
        let mut state = self.connected_state()?;
        state.calls.push(MockCall::StopRecorder);
        state.recorder = None;
        Ok(())
    }

    async fn recommended_values(&self, blueprint: &str, attribute: &str) -> Result<Vec<String>> {
        let _state = self.connected_state()?;
        if self.config.missing_blueprints.iter().any(|b| b == blueprint) {
            return Err(ActorFactoryError::BlueprintNotFound {
                blueprint: blueprint.to_string(),
            });
        }
        if blueprint.starts_with("vehicle.") && attribute == "color" {
            Ok(self.config.colors.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        let _state = self.connected_state()?;
        Ok(self.config.spawn_points.clone())
    }

    #[instrument(
        name = "mock_carla_spawn_actor",
        skip(self, request),
        fields(blueprint = %request.blueprint, parent = ?request.parent)
    )]
    async fn spawn_actor(&self, request: &SpawnRequest) -> Result<ActorId> {
        if !self.config.spawn_latency.is_zero() {
            tokio::time::sleep(self.config.spawn_latency).await;
        }
        let mut state = self.connected_state()?;
        state.calls.push(MockCall::Spawn {
            blueprint: request.blueprint.clone(),
            parent: request.parent,
        });

        if self.config.missing_blueprints.contains(&request.blueprint) {
            return Err(ActorFactoryError::BlueprintNotFound {
                blueprint: request.blueprint.clone(),
            });
        }
        if self.config.fail_blueprints.contains(&request.blueprint) {
            return Err(ActorFactoryError::spawn(
                &request.blueprint,
                &request.blueprint,
                "mock failure",
            ));
        }
        // 验证 parent 存在
        if let Some(parent) = request.parent {
            if !state.actors.contains_key(&parent) {
                return Err(ActorFactoryError::spawn(
                    &request.blueprint,
                    &request.blueprint,
                    format!("parent actor {parent} not found"),
                ));
            }
        }

        let actor_id = state.next_actor_id;
        state.next_actor_id += 1;
        state.actors.insert(
            actor_id,
            MockActor {
                blueprint: request.blueprint.clone(),
                attributes: request.attributes.clone(),
                transform: request.transform,
                parent: request.parent,
            },
        );
        Ok(actor_id)
    }

    #[instrument(name = "mock_carla_set_autopilot", skip(self))]
    async fn set_autopilot(&self, vehicle_id: ActorId, enabled: bool) -> Result<()> {
        let mut state = self.connected_state()?;
        state.calls.push(MockCall::SetAutopilot {
            vehicle_id,
            enabled,
        });
        if !state.actors.contains_key(&vehicle_id) {
            return Err(ActorFactoryError::ActorNotFound {
                actor_id: vehicle_id,
            });
        }
        if enabled {
            state.autopilot.insert(vehicle_id);
        } else {
            state.autopilot.remove(&vehicle_id);
        }
        Ok(())
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        let state = self.connected_state()?;
        state
            .actors
            .get(&actor_id)
            .map(|actor| actor.transform)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    async fn set_spectator_transform(&self, transform: Transform) -> Result<()> {
        let mut state = self.connected_state()?;
        state.calls.push(MockCall::SetSpectator(transform));
        state.spectator = Some(transform);
        Ok(())
    }

    async fn wait_for_tick(&self) -> Result<TickSnapshot> {
        drop(self.connected_state()?);
        if !self.config.tick_interval.is_zero() {
            tokio::time::sleep(self.config.tick_interval).await;
        }

        // 回调在锁外执行，回调内部可以再次访问客户端
        let (frame, sensors) = {
            let mut state = self.connected_state()?;
            state.calls.push(MockCall::Tick);
            let frame = state.frame + 1;
            if self.config.fail_tick_at == Some(frame) {
                return Err(ActorFactoryError::TickFailed {
                    message: format!("mock failure at frame {frame}"),
                });
            }
            state.frame = frame;
            let sensors: Vec<MockSensor> = state.sensors.values().cloned().collect();
            (frame, sensors)
        };

        let elapsed_seconds = frame as f64 * self.config.delta_seconds;
        for sensor in &sensors {
            sensor.emit(frame, elapsed_seconds);
        }

        Ok(TickSnapshot {
            frame,
            elapsed_seconds,
        })
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let mut state = self.connected_state()?;
        state.calls.push(MockCall::Destroy(actor_id));

        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // 幂等：即使不存在也返回 Ok
        if let Some(sensor) = state.sensors.remove(&actor_id) {
            sensor.stop();
        }
        state.autopilot.remove(&actor_id);
        if state.actors.remove(&actor_id).is_some() {
            debug!(actor_id, "mock actor destroyed");
        }
        Ok(())
    }

    fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let mut state = self.state();
        let actor = state.actors.get(&actor_id)?;
        if !actor.blueprint.starts_with("sensor.") {
            return None;
        }

        let sensor = MockSensor::new(sensor_id, kind, self.config.sensor.clone());
        state.sensors.insert(actor_id, sensor.clone());
        Some(Box::new(sensor))
    }
}
