//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需 CARLA）

#[cfg(test)]
mod contract_tests {
    use contracts::{FileFormat, SensorKind};

    #[test]
    fn test_builtin_rig_layout() {
        let profile = config_loader::ConfigLoader::builtin();
        let layout: Vec<_> = profile
            .sensors
            .iter()
            .map(|s| (s.kind, s.output.subdir.as_str(), s.output.format_for(s.kind)))
            .collect();

        assert_eq!(
            layout,
            vec![
                (SensorKind::RgbCamera, "RGB", FileFormat::Jpeg),
                (SensorKind::DepthCamera, "LogDepth", FileFormat::Jpeg),
                (SensorKind::Lidar, "LIDAR", FileFormat::Ply),
                (SensorKind::SemanticCamera, "2dSemantic", FileFormat::Jpeg),
            ]
        );
        assert_eq!(profile.vehicle.role_name, "ego");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use actor_factory::{EgoFactory, MockCall, MockCarlaClient, MockConfig};
    use contracts::{ActorRegistry, CaptureProfile, FrameSink};
    use ego_capture_cli::session::{CaptureSession, ExitReason, SessionConfig};
    use frame_sink::{FileSink, FileSinkConfig};
    use tempfile::tempdir;

    fn mock(config: MockConfig) -> MockCarlaClient {
        MockCarlaClient::with_config(MockConfig {
            tick_interval: Duration::ZERO,
            ..config
        })
    }

    fn session_config(profile: CaptureProfile, max_ticks: u64) -> SessionConfig {
        SessionConfig {
            host: "localhost".to_string(),
            port: 2000,
            timeout: Duration::from_secs(2),
            record: Some("ego_recording.log".to_string()),
            max_ticks: Some(max_ticks),
            profile,
        }
    }

    fn disk_sink(base: &Path, profile: &CaptureProfile) -> Arc<dyn FrameSink> {
        let config = FileSinkConfig {
            base_path: base.to_path_buf(),
        };
        Arc::new(FileSink::for_profile("disk", config, profile).unwrap())
    }

    fn frames_in(dir: &Path) -> Vec<u64> {
        let mut frames: Vec<u64> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| {
                let path = entry.unwrap().path();
                path.file_stem().unwrap().to_str().unwrap().parse().unwrap()
            })
            .collect();
        frames.sort_unstable();
        frames
    }

    /// End-to-end test: MockCarlaClient -> EgoFactory -> FileSink
    ///
    /// 验证完整的生命周期：
    /// 1. 连接并启动录制
    /// 2. 生成 ego 车辆与 4 个传感器并开启自动驾驶
    /// 3. 每个 tick 每个传感器写入一帧
    /// 4. 拆除全部 actor 并停止录制
    #[tokio::test]
    async fn test_e2e_mock_capture() {
        let dir = tempdir().unwrap();
        let profile = CaptureProfile::default();
        let client = mock(MockConfig::default());
        let observer = client.clone();

        let stats = CaptureSession::new(
            session_config(profile.clone(), 4),
            client,
            disk_sink(dir.path(), &profile),
        )
        .run(std::future::pending())
        .await
        .unwrap();

        assert_eq!(stats.exit, ExitReason::MaxTicks);
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.actors_destroyed, 5);
        assert!(stats.recorder_stopped);
        assert_eq!(stats.capture.total_frames(), 16);
        assert_eq!(stats.capture.total_failures(), 0);

        for subdir in ["RGB", "LogDepth", "LIDAR", "2dSemantic"] {
            assert_eq!(frames_in(&dir.path().join(subdir)), vec![1, 2, 3, 4], "{subdir}");
        }

        let calls = observer.calls();
        let spawned: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                MockCall::Spawn { blueprint, parent } => Some((blueprint.as_str(), *parent)),
                _ => None,
            })
            .collect();
        assert_eq!(spawned.len(), 5);
        assert_eq!(spawned[0], ("vehicle.tesla.model3", None));
        assert!(spawned[1..].iter().all(|(bp, parent)| bp.starts_with("sensor.") && parent.is_some()));
        assert!(calls.iter().any(|call| matches!(call, MockCall::SetAutopilot { enabled: true, .. })));

        assert_eq!(calls.first(), Some(&MockCall::Connect { host: "localhost".to_string(), port: 2000 }));
        assert_eq!(calls[1], MockCall::StartRecorder("ego_recording.log".to_string()));
        let stop = calls.iter().position(|c| *c == MockCall::StopRecorder).unwrap();
        let first_destroy = calls.iter().position(|c| matches!(c, MockCall::Destroy(_))).unwrap();
        assert!(stop < first_destroy);

        assert_eq!(observer.actor_count(), 0);
        assert_eq!(observer.listening_sensors(), 0);
        assert_eq!(observer.recorder_path(), None);
    }

    #[tokio::test]
    async fn test_e2e_profile_from_toml() {
        let dir = tempdir().unwrap();
        let toml = r#"
            [vehicle]
            blueprint = "vehicle.lincoln.mkz_2020"
            random_color = false

            [[sensors]]
            id = "front"
            kind = "rgb_camera"
            attributes = { image_size_x = "320", image_size_y = "240" }
            transform = { location = { x = 2.0, y = 0.0, z = 1.0 }, rotation = { pitch = 0.0, yaw = 0.0, roll = 0.0 } }
            output = { subdir = "Front" }
        "#;
        let profile = config_loader::ConfigLoader::load_from_str(
            toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let client = mock(MockConfig::default());
        let mut config = session_config(profile.clone(), 2);
        config.record = None;

        let stats = CaptureSession::new(config, client, disk_sink(dir.path(), &profile))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.actors_destroyed, 2);
        assert!(!stats.recorder_stopped);
        assert_eq!(frames_in(&dir.path().join("Front")), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_e2e_no_spawn_point_runs_without_actors() {
        let dir = tempdir().unwrap();
        let profile = CaptureProfile::default();
        let client = mock(MockConfig {
            spawn_points: Vec::new(),
            ..Default::default()
        });
        let observer = client.clone();

        let stats = CaptureSession::new(
            session_config(profile.clone(), 2),
            client,
            disk_sink(dir.path(), &profile),
        )
        .run(std::future::pending())
        .await
        .unwrap();

        assert_eq!(stats.actors_destroyed, 0);
        assert_eq!(stats.capture.total_frames(), 0);
        assert!(!observer
            .calls()
            .iter()
            .any(|call| matches!(call, MockCall::Spawn { .. } | MockCall::SetAutopilot { .. })));
    }

    #[tokio::test]
    async fn test_teardown_of_empty_registry_is_silent() {
        let client = mock(MockConfig::default());
        let factory = EgoFactory::new(client.clone());
        let mut registry = ActorRegistry::new();

        let report = factory.teardown(&mut registry).await;

        assert!(report.into_result().is_ok());
        assert!(client.calls().is_empty());
    }
}
