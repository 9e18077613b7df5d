//! # Frame Sink
//!
//! 传感器帧落盘模块。
//!
//! 负责：
//! - 图像颜色转换 (对数深度、CityScapes 语义调色板)
//! - JPEG/PNG 图像与 ASCII PLY 点云写出
//! - 按 `<output>/<subdir>/<frame:06>.<ext>` 命名
//! - 运行前清空输出目录

pub mod convert;
pub mod error;
pub mod file;
pub mod ply;
pub mod reset;

pub use contracts::{FrameSink, SensorPacket};
pub use convert::{to_rgb, CITYSCAPES_PALETTE};
pub use error::FrameSinkError;
pub use file::{FileSink, FileSinkConfig};
pub use reset::reset_output_dir;
