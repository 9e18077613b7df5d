//! CARLA 传感器数据转换
//!
//! 将 CARLA 原生传感器数据转换为 `SensorPacket`。
//! 仅在 `real-carla` feature 启用时编译。

use bytes::Bytes;
use carla::sensor::data::{Image, LidarMeasurement};
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{ImageData, LidarPoint, PointCloudData, SensorKind, SensorPacket, SensorPayload};

/// 将 CARLA Image 转换为 SensorPayload（保持 BGRA8 原始字节）
fn image_to_payload(image: &Image) -> SensorPayload {
    SensorPayload::Image(ImageData {
        width: image.width() as u32,
        height: image.height() as u32,
        data: Bytes::copy_from_slice(image.as_raw_bytes()),
    })
}

/// 将 CARLA LidarMeasurement 转换为 SensorPayload
fn lidar_to_payload(lidar: &LidarMeasurement) -> SensorPayload {
    let points = lidar
        .as_slice()
        .iter()
        .map(|detection| LidarPoint {
            x: detection.point.x,
            y: detection.point.y,
            z: detection.point.z,
            intensity: detection.intensity,
        })
        .collect();
    SensorPayload::PointCloud(PointCloudData { points })
}

/// 将 CARLA 传感器数据转换为 SensorPacket
///
/// 如果数据类型与传感器类型不匹配，返回 None。
pub fn convert_sensor_data(
    sensor_id: &str,
    kind: SensorKind,
    data: &SensorData,
) -> Option<SensorPacket> {
    let timestamp = data.timestamp();
    let frame = data.frame() as u64;

    let payload = if kind.is_camera() {
        let image = Image::try_from(data.clone()).ok()?;
        image_to_payload(&image)
    } else {
        let lidar = LidarMeasurement::try_from(data.clone()).ok()?;
        lidar_to_payload(&lidar)
    };

    Some(SensorPacket {
        sensor_id: sensor_id.to_string(),
        kind,
        frame,
        timestamp,
        payload,
    })
}
