//! 采集指标模块
//!
//! 记录帧写入、仿真 tick 与 actor 生命周期指标，并在内存中聚合用于运行摘要。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use metrics::{counter, gauge, histogram};

/// 记录一次成功的帧写入
pub fn record_frame_written(sensor_id: &str, frame: u64, write_ms: f64) {
    counter!(
        "ego_capture_frames_written_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
    gauge!(
        "ego_capture_last_frame",
        "sensor_id" => sensor_id.to_string()
    )
    .set(frame as f64);
    histogram!(
        "ego_capture_frame_write_ms",
        "sensor_id" => sensor_id.to_string()
    )
    .record(write_ms);
}

/// 记录一次失败的帧写入
pub fn record_frame_write_failed(sensor_id: &str) {
    counter!(
        "ego_capture_frame_write_failures_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// 记录仿真 tick
pub fn record_tick(frame: u64) {
    counter!("ego_capture_ticks_total").increment(1);
    gauge!("ego_capture_world_frame").set(frame as f64);
}

/// 记录 actor spawn
pub fn record_actor_spawned(role: &str) {
    counter!("ego_capture_actors_spawned_total", "role" => role.to_string()).increment(1);
}

/// 记录 actor 销毁
pub fn record_actor_destroyed(role: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "ego_capture_actors_destroyed_total",
        "role" => role.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 单个传感器的写入统计
#[derive(Debug, Clone, Default)]
pub struct SensorCounts {
    pub frames_written: u64,
    pub write_failures: u64,
    pub first_frame: Option<u64>,
    pub last_frame: Option<u64>,
    pub write_ms: RunningStats,
}

/// 帧写入计数器
///
/// 传感器回调线程并发更新，会话结束时读取快照输出摘要。
#[derive(Debug, Default)]
pub struct CaptureCounters {
    sensors: Mutex<BTreeMap<String, SensorCounts>>,
}

impl CaptureCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新成功写入，并同步到 metrics
    pub fn frame_written(&self, sensor_id: &str, frame: u64, write_ms: f64) {
        record_frame_written(sensor_id, frame, write_ms);

        let mut sensors = self.sensors.lock().unwrap_or_else(|e| e.into_inner());
        let counts = sensors.entry(sensor_id.to_string()).or_default();
        counts.frames_written += 1;
        counts.first_frame = Some(counts.first_frame.map_or(frame, |f| f.min(frame)));
        counts.last_frame = Some(counts.last_frame.map_or(frame, |f| f.max(frame)));
        counts.write_ms.push(write_ms);
    }

    /// 更新失败写入，并同步到 metrics
    pub fn frame_failed(&self, sensor_id: &str) {
        record_frame_write_failed(sensor_id);

        let mut sensors = self.sensors.lock().unwrap_or_else(|e| e.into_inner());
        sensors.entry(sensor_id.to_string()).or_default().write_failures += 1;
    }

    /// 当前统计快照
    pub fn snapshot(&self) -> CaptureSummary {
        let sensors = self.sensors.lock().unwrap_or_else(|e| e.into_inner());
        CaptureSummary {
            sensors: sensors.clone(),
        }
    }
}

/// 采集摘要
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub sensors: BTreeMap<String, SensorCounts>,
}

impl CaptureSummary {
    /// 全部传感器写入的帧数
    pub fn total_frames(&self) -> u64 {
        self.sensors.values().map(|c| c.frames_written).sum()
    }

    /// 全部传感器的写入失败数
    pub fn total_failures(&self) -> u64 {
        self.sensors.values().map(|c| c.write_failures).sum()
    }
}

impl fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Frames written: {}", self.total_frames())?;
        writeln!(f, "Write failures: {}", self.total_failures())?;
        for (sensor_id, counts) in &self.sensors {
            let range = match (counts.first_frame, counts.last_frame) {
                (Some(first), Some(last)) => format!("{first:06}..={last:06}"),
                _ => "-".to_string(),
            };
            writeln!(
                f,
                "  {}: {} frames [{}], write ms {}",
                sensor_id,
                counts.frames_written,
                range,
                StatsSummary::from(&counts.write_ms)
            )?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
